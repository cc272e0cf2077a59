pub const COLLECTION_PREFIX: &str = "collection_";

/// Maps a project id to the vector collection that holds its chunks.
///
/// Whitespace around the id never reaches the collection name.
pub fn collection_name(project_id: &str) -> String {
    format!("{COLLECTION_PREFIX}{}", project_id.trim())
}
