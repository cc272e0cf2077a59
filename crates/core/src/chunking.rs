use crate::error::IngestError;
use crate::models::{Chunk, DocumentFormat};
use tracing::debug;

/// Boundary levels from coarsest to finest: paragraph, line, sentence, word,
/// then single characters. Every separator in a level is a boundary of that
/// level.
pub const DEFAULT_SEPARATORS: [&[&str]; 5] = [
    &["\n\n"],
    &["\n"],
    &[". ", "? ", "! "],
    &[" "],
    &[""],
];

pub const DEFAULT_OVERLAP_CHARS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    pub max_chars: usize,
    pub overlap_chars: usize,
}

impl ChunkingConfig {
    pub fn new(max_chars: usize, overlap_chars: usize) -> Result<Self, IngestError> {
        if max_chars == 0 {
            return Err(IngestError::InvalidChunkConfig(
                "chunk size must be greater than zero".to_string(),
            ));
        }

        if overlap_chars >= max_chars {
            return Err(IngestError::InvalidChunkConfig(format!(
                "overlap {overlap_chars} must be smaller than chunk size {max_chars}"
            )));
        }

        Ok(Self {
            max_chars,
            overlap_chars,
        })
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn window_len(window: &[&str]) -> usize {
    window.iter().map(|piece| char_len(piece)).sum()
}

/// Breaks text at the coarsest boundary level present, descending into pieces
/// that are still too long, then greedily merges the pieces back up to
/// `max_chars`.
///
/// Every chunk but the last hands at least `overlap_chars` of its trailing
/// text to the next one. Whole trailing pieces are carried when they leave
/// room for the next piece; otherwise the carry is cut at character level and
/// a piece that still does not fit is hard-cut at `max_chars`.
#[derive(Debug, Clone)]
pub struct RecursiveSplitter {
    config: ChunkingConfig,
    levels: Vec<Vec<String>>,
}

impl RecursiveSplitter {
    pub fn new(config: ChunkingConfig) -> Self {
        let levels = DEFAULT_SEPARATORS
            .iter()
            .map(|level| level.iter().map(|separator| separator.to_string()).collect())
            .collect();
        Self::with_separators(config, levels)
    }

    /// An empty separator in a level means single characters.
    pub fn with_separators(config: ChunkingConfig, levels: Vec<Vec<String>>) -> Self {
        Self { config, levels }
    }

    pub fn split_text(&self, text: &str) -> Vec<String> {
        let mut pieces = Vec::new();
        self.collect_pieces(text, &self.levels, &mut pieces);
        self.merge(&pieces)
    }

    fn collect_pieces<'a>(&self, text: &'a str, levels: &[Vec<String>], out: &mut Vec<&'a str>) {
        let mut separators: Option<&[String]> = None;
        let mut finer: &[Vec<String>] = &[];

        for (index, level) in levels.iter().enumerate() {
            if level.iter().any(String::is_empty) {
                break;
            }
            if level.iter().any(|separator| text.contains(separator.as_str())) {
                separators = Some(level.as_slice());
                finer = &levels[index + 1..];
                break;
            }
        }

        let pieces = match separators {
            Some(separators) => split_keeping_separators(text, separators),
            None => split_chars(text),
        };

        for piece in pieces {
            if char_len(piece) < self.config.max_chars || finer.is_empty() {
                out.push(piece);
            } else {
                self.collect_pieces(piece, finer, out);
            }
        }
    }

    fn merge(&self, pieces: &[&str]) -> Vec<String> {
        let ChunkingConfig {
            max_chars,
            overlap_chars,
        } = self.config;

        let mut merged = Vec::new();
        let mut window: Vec<&str> = Vec::new();
        let mut total = 0usize;
        // `fresh`: the window holds text no chunk has emitted yet.
        // `cut`: a piece was hard-cut into the window.
        let mut fresh = false;
        let mut cut = false;

        for &piece in pieces {
            let mut rest = piece;

            while !rest.is_empty() {
                let len = char_len(rest);

                if total + len <= max_chars {
                    window.push(rest);
                    total += len;
                    fresh = true;
                    break;
                }

                if fresh {
                    if let Some(chunk) = join_window(&window) {
                        merged.push(chunk);
                    }
                    window = carry_over(&window, overlap_chars, max_chars.saturating_sub(len), cut);
                    total = window_len(&window);
                    fresh = false;
                    cut = false;
                    continue;
                }

                let room = max_chars.saturating_sub(total);
                if room == 0 {
                    window = shed_trailing_whitespace(window, max_chars);
                    total = window_len(&window);
                    continue;
                }

                let (head, tail) = split_at_char(rest, room);
                window.push(head);
                total += room;
                fresh = true;
                cut = true;
                rest = tail;
            }
        }

        if fresh {
            if let Some(chunk) = join_window(&window) {
                merged.push(chunk);
            }
        }

        merged
    }
}

/// Shortest tail of `window` whose trimmed text has at least `overlap_chars`
/// characters. Whole pieces are kept when they fit in `budget`.
fn carry_over<'a>(window: &[&'a str], overlap_chars: usize, budget: usize, cut: bool) -> Vec<&'a str> {
    if overlap_chars == 0 {
        return Vec::new();
    }

    if !cut {
        for start in (0..window.len()).rev() {
            let tail = &window[start..];
            let text = tail.concat();
            if char_len(text.trim()) >= overlap_chars {
                if char_len(&text) <= budget {
                    return tail.to_vec();
                }
                break;
            }
        }
    }

    let mut counted = 0usize;
    for (index, &piece) in window.iter().enumerate().rev() {
        for (offset, ch) in piece.char_indices().rev() {
            if counted == 0 && ch.is_whitespace() {
                continue;
            }
            counted += 1;
            if counted >= overlap_chars && !ch.is_whitespace() {
                let mut tail = vec![&piece[offset..]];
                tail.extend_from_slice(&window[index + 1..]);
                return tail;
            }
        }
    }

    window.to_vec()
}

/// Drops whitespace at the end of a carry that leaves no room, or the whole
/// carry when trimming is not enough.
fn shed_trailing_whitespace(mut window: Vec<&str>, max_chars: usize) -> Vec<&str> {
    while let Some(last) = window.pop() {
        let kept = last.trim_end();
        if !kept.is_empty() {
            window.push(kept);
            break;
        }
    }

    if window_len(&window) < max_chars {
        window
    } else {
        Vec::new()
    }
}

fn split_at_char(text: &str, chars: usize) -> (&str, &str) {
    let index = text
        .char_indices()
        .nth(chars)
        .map_or(text.len(), |(index, _)| index);
    text.split_at(index)
}

fn split_chars(text: &str) -> Vec<&str> {
    text.char_indices()
        .map(|(index, ch)| &text[index..index + ch.len_utf8()])
        .collect()
}

/// Separators stay attached to the end of the piece they terminate.
fn split_keeping_separators<'a>(text: &'a str, separators: &[String]) -> Vec<&'a str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut cursor = 0;

    while cursor < text.len() {
        let rest = &text[cursor..];
        match separators
            .iter()
            .find(|separator| rest.starts_with(separator.as_str()))
        {
            Some(separator) => {
                cursor += separator.len();
                pieces.push(&text[start..cursor]);
                start = cursor;
            }
            None => cursor += rest.chars().next().map_or(1, char::len_utf8),
        }
    }

    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}

fn join_window(window: &[&str]) -> Option<String> {
    non_empty_trimmed(&window.concat())
}

fn non_empty_trimmed(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Turns loaded records into retrieval units.
#[derive(Debug, Clone, Copy)]
pub struct ChunkProcessor {
    default_chunk_size: usize,
}

impl ChunkProcessor {
    pub fn new(default_chunk_size: usize) -> Self {
        Self { default_chunk_size }
    }

    pub fn process(
        &self,
        records: Vec<Chunk>,
        format: DocumentFormat,
        file_id: &str,
        chunk_size: Option<usize>,
        overlap_size: usize,
    ) -> Result<Vec<Chunk>, IngestError> {
        if records.is_empty() {
            return Err(IngestError::EmptyContent(file_id.to_string()));
        }

        if format.is_pre_chunked() {
            return Ok(records);
        }

        let config = ChunkingConfig::new(chunk_size.unwrap_or(self.default_chunk_size), overlap_size)
            .map_err(|source| IngestError::Splitting {
                file_id: file_id.to_string(),
                source: Box::new(source),
            })?;
        let splitter = RecursiveSplitter::new(config);

        let chunks = records
            .iter()
            .flat_map(|record| {
                splitter
                    .split_text(&record.text)
                    .into_iter()
                    .map(move |text| Chunk::new(text, record.metadata.clone()))
            })
            .collect::<Vec<_>>();

        debug!(
            file_id,
            records = records.len(),
            chunks = chunks.len(),
            max_chars = config.max_chars,
            overlap_chars = config.overlap_chars,
            "split records into chunks"
        );

        Ok(chunks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Metadata;
    use serde_json::json;

    fn splitter(max_chars: usize, overlap_chars: usize) -> RecursiveSplitter {
        RecursiveSplitter::new(ChunkingConfig::new(max_chars, overlap_chars).unwrap())
    }

    /// Length of the longest suffix of `left` that `right` starts with.
    fn shared_len(left: &str, right: &str) -> usize {
        let right: Vec<char> = right.chars().collect();
        (0..=right.len())
            .rev()
            .find(|&len| left.ends_with(&right[..len].iter().collect::<String>()))
            .unwrap_or(0)
    }

    fn assert_overlap(chunks: &[String], overlap_chars: usize) {
        for pair in chunks.windows(2) {
            assert!(
                shared_len(&pair[0], &pair[1]) >= overlap_chars,
                "{:?} -> {:?}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn paragraphs_are_preferred_boundaries() {
        let text = "para one line.\n\npara two is here\n\npara three";
        let chunks = splitter(20, 0).split_text(text);
        assert_eq!(chunks, ["para one line.", "para two is here", "para three"]);
    }

    #[test]
    fn sentences_split_before_words() {
        let text = "First sentence here. Second sentence here. Third one.";
        let chunks = splitter(25, 0).split_text(text);
        assert_eq!(
            chunks,
            ["First sentence here.", "Second sentence here.", "Third one."]
        );
    }

    #[test]
    fn questions_and_exclamations_end_sentences() {
        let text = "Is it raining? Bring a coat! It is cold. Stay warm";
        let chunks = splitter(16, 0).split_text(text);
        assert_eq!(
            chunks,
            ["Is it raining?", "Bring a coat!", "It is cold.", "Stay warm"]
        );
    }

    #[test]
    fn word_overlap_carries_whole_words() {
        let text = "abcdefgh ijklmnop qrstuvwx yzabcdef ghijklmn";
        let chunks = splitter(18, 5).split_text(text);
        assert_eq!(
            chunks,
            [
                "abcdefgh ijklmnop",
                "ijklmnop qrstuvwx",
                "qrstuvwx yzabcdef",
                "yzabcdef ghijklmn"
            ]
        );
        assert_overlap(&chunks, 5);
    }

    #[test]
    fn sentence_overlap_falls_back_to_characters() {
        let text = "Is it raining? Bring a coat! It is cold. Stay warm";
        let chunks = splitter(20, 8).split_text(text);

        assert!(chunks.iter().all(|chunk| chunk.chars().count() <= 20));
        assert_overlap(&chunks, 8);
        assert_eq!(chunks.first().unwrap(), "Is it raining?");
        assert!(chunks.last().unwrap().ends_with("Stay warm"));
    }

    #[test]
    fn character_fallback_respects_size_and_overlap() {
        let text = "abcdefghijklmnopqrstuvwxyz".repeat(2);
        let chunks = splitter(10, 3).split_text(&text);

        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|chunk| chunk.chars().count() <= 10));
        for pair in chunks.windows(2) {
            let tail: String = pair[0].chars().skip(pair[0].chars().count() - 3).collect();
            assert!(pair[1].starts_with(&tail), "{:?} -> {:?}", pair[0], pair[1]);
        }
        assert!(chunks.last().unwrap().ends_with("xyz"));
    }

    #[test]
    fn word_split_chunks_stay_bounded() {
        let text = "lorem ipsum dolor sit amet consectetur adipiscing elit sed do eiusmod";
        let chunks = splitter(16, 6).split_text(text);
        assert!(chunks.iter().all(|chunk| chunk.chars().count() <= 16));
        assert_eq!(chunks.first().unwrap(), "lorem ipsum");
        assert_eq!(chunks.last().unwrap(), "sed do eiusmod");
        assert_overlap(&chunks, 6);
    }

    #[test]
    fn multibyte_text_is_measured_in_characters() {
        let text = "ééééééééééééééé";
        let chunks = splitter(5, 1).split_text(text);
        assert!(chunks.iter().all(|chunk| chunk.chars().count() <= 5));
    }

    #[test]
    fn overlap_must_be_smaller_than_size() {
        assert!(ChunkingConfig::new(10, 10).is_err());
        assert!(ChunkingConfig::new(0, 0).is_err());
    }

    fn record(text: &str) -> Chunk {
        let mut metadata = Metadata::new();
        metadata.insert("row".into(), json!(0));
        Chunk::new(text, metadata)
    }

    #[test]
    fn qa_records_pass_through_untouched() {
        let records = vec![
            record("Question: a long question that exceeds the limit\nAnswer: yes"),
            record("Question: b\nAnswer: no"),
            record("Question: c\nAnswer: maybe"),
        ];
        let processor = ChunkProcessor::new(100);

        let chunks = processor
            .process(records.clone(), DocumentFormat::QaJson, "faq.json", Some(5), 2)
            .unwrap();

        assert_eq!(chunks, records);
    }

    #[test]
    fn split_chunks_inherit_record_metadata() {
        let processor = ChunkProcessor::new(100);
        let chunks = processor
            .process(
                vec![record("name: Ada\ncity: London\nrole: mathematician")],
                DocumentFormat::Csv,
                "rows.csv",
                Some(20),
                0,
            )
            .unwrap();

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2].text, "role: mathematician");
        assert!(chunks.iter().all(|chunk| chunk.metadata["row"] == json!(0)));
    }

    #[test]
    fn empty_input_is_rejected() {
        let error = ChunkProcessor::new(100)
            .process(Vec::new(), DocumentFormat::Csv, "rows.csv", None, 20)
            .unwrap_err();
        assert!(matches!(error, IngestError::EmptyContent(_)));
    }

    #[test]
    fn splitter_failures_carry_the_file_id() {
        let error = ChunkProcessor::new(100)
            .process(vec![record("text")], DocumentFormat::Csv, "rows.csv", Some(10), 40)
            .unwrap_err();
        assert!(matches!(error, IngestError::Splitting { ref file_id, .. } if file_id == "rows.csv"));
    }
}
