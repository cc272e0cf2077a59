use crate::models::{PromptContext, RetrievedDocument};
use std::collections::HashMap;

pub const RAG_SECTION: &str = "rag";

const SYSTEM_PROMPT: &str = "You are a helpful assistant that answers strictly based on the provided documents. \
If the answer cannot be found, say you don't know.";
const DOCUMENT_PROMPT: &str = "Document {{doc_num}}:\n{{chunk_text}}";
const FOOTER_PROMPT: &str =
    "Using the documents above, answer the user's question concisely and accurately.";

/// Named prompt templates grouped by section, rendered with literal
/// `{{name}}` substitution.
#[derive(Debug, Clone)]
pub struct TemplateParser {
    templates: HashMap<String, HashMap<String, String>>,
}

impl Default for TemplateParser {
    fn default() -> Self {
        Self::new()
            .with_template(RAG_SECTION, "system_prompt", SYSTEM_PROMPT)
            .with_template(RAG_SECTION, "document_prompt", DOCUMENT_PROMPT)
            .with_template(RAG_SECTION, "footer_prompt", FOOTER_PROMPT)
    }
}

impl TemplateParser {
    /// A parser with no templates; see [`TemplateParser::default`] for the
    /// built-in RAG set.
    pub fn new() -> Self {
        Self {
            templates: HashMap::new(),
        }
    }

    pub fn with_template(
        mut self,
        section: impl Into<String>,
        key: impl Into<String>,
        template: impl Into<String>,
    ) -> Self {
        self.templates
            .entry(section.into())
            .or_default()
            .insert(key.into(), template.into());
        self
    }

    /// Renders `section.key`. Unknown templates render as an empty string and
    /// placeholders without a matching variable are left as written.
    pub fn get(&self, section: &str, key: &str, variables: &[(&str, String)]) -> String {
        let Some(template) = self.templates.get(section).and_then(|keys| keys.get(key)) else {
            return String::new();
        };

        variables
            .iter()
            .fold(template.clone(), |rendered, (name, value)| {
                rendered.replace(&format!("{{{{{name}}}}}"), value)
            })
    }
}

pub struct PromptAssembler<'a> {
    templates: &'a TemplateParser,
}

impl<'a> PromptAssembler<'a> {
    pub fn new(templates: &'a TemplateParser) -> Self {
        Self { templates }
    }

    pub fn assemble(&self, documents: &[RetrievedDocument]) -> PromptContext {
        let system_prompt = self.templates.get(RAG_SECTION, "system_prompt", &[]);

        let document_sections = documents
            .iter()
            .enumerate()
            .map(|(index, document)| {
                self.templates.get(
                    RAG_SECTION,
                    "document_prompt",
                    &[
                        ("doc_num", (index + 1).to_string()),
                        ("chunk_text", document.text.clone()),
                    ],
                )
            })
            .collect::<Vec<_>>();

        let footer = self.templates.get(RAG_SECTION, "footer_prompt", &[]);
        let full_prompt = [document_sections.join("\n"), footer.clone()].join("\n\n");

        PromptContext {
            system_prompt,
            document_sections,
            footer,
            full_prompt,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_template_substitutes_variables() {
        let parser = TemplateParser::default();
        let rendered = parser.get(
            RAG_SECTION,
            "document_prompt",
            &[("doc_num", "1".to_string()), ("chunk_text", "hi".to_string())],
        );
        assert_eq!(rendered, "Document 1:\nhi");
    }

    #[test]
    fn missing_variables_stay_literal() {
        let parser = TemplateParser::default();
        let rendered = parser.get(RAG_SECTION, "document_prompt", &[("doc_num", "1".to_string())]);
        assert_eq!(rendered, "Document 1:\n{{chunk_text}}");
    }

    #[test]
    fn unknown_templates_render_empty() {
        let parser = TemplateParser::default();
        assert_eq!(parser.get("rag", "nope", &[]), "");
        assert_eq!(parser.get("other", "system_prompt", &[]), "");
    }

    #[test]
    fn prompt_numbers_documents_in_retrieval_order() {
        let parser = TemplateParser::default();
        let documents = vec![
            RetrievedDocument { score: 0.9, text: "Paris".into() },
            RetrievedDocument { score: 0.5, text: "Lyon".into() },
        ];

        let context = PromptAssembler::new(&parser).assemble(&documents);

        assert_eq!(context.document_sections, ["Document 1:\nParis", "Document 2:\nLyon"]);
        assert_eq!(
            context.full_prompt,
            format!("Document 1:\nParis\nDocument 2:\nLyon\n\n{FOOTER_PROMPT}")
        );
        assert!(context.system_prompt.contains("don't know"));
    }
}
