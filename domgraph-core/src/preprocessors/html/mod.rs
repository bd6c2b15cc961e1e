//! HTML Preprocessor
//!
//! Main preprocessor for web pages. Strips non-content subtrees, then runs
//! the markup through the tolerant tree parser.

pub mod tree_parser;

use crate::config::PreprocessorConfig;
use crate::document::DocumentTree;
use crate::error::Result;
use crate::preprocessors::traits::Preprocessor;
use regex::Regex;
use std::path::Path;
use tracing::{debug, warn};

/// HTML Preprocessor
///
/// Processes markup through two stages:
/// 1. Stripping: remove `<script>`-like subtrees whose raw text would
///    confuse an XML tokenizer
/// 2. Tree parsing: markup → DocumentTree
pub struct HtmlPreprocessor {
    config: PreprocessorConfig,
    strip_patterns: Vec<Regex>,
}

impl HtmlPreprocessor {
    pub fn new(config: &PreprocessorConfig) -> Self {
        let strip_patterns = config
            .strip_tags
            .iter()
            .filter_map(|tag| {
                let tag = regex::escape(&tag.to_ascii_lowercase());
                match Regex::new(&format!(r"(?is)<{tag}\b[^>]*>.*?</{tag}\s*>")) {
                    Ok(pattern) => Some(pattern),
                    Err(e) => {
                        warn!(tag = %tag, error = %e, "Skipping unusable strip tag");
                        None
                    }
                }
            })
            .collect();

        Self {
            config: config.clone(),
            strip_patterns,
        }
    }

    fn strip(&self, markup: &str) -> String {
        let mut stripped = markup.to_string();
        for pattern in &self.strip_patterns {
            stripped = pattern.replace_all(&stripped, "").into_owned();
        }
        stripped
    }
}

impl Default for HtmlPreprocessor {
    fn default() -> Self {
        Self::new(&PreprocessorConfig::default())
    }
}

impl Preprocessor for HtmlPreprocessor {
    fn parse_markup(&self, markup: &str) -> Result<DocumentTree> {
        let stripped = self.strip(markup);
        debug!(
            input_bytes = markup.len(),
            stripped_bytes = stripped.len(),
            "Parsing HTML markup"
        );
        Ok(tree_parser::parse_html(&stripped, &self.config))
    }

    fn name(&self) -> &str {
        "HtmlPreprocessor"
    }

    fn supports_file_type(&self, path: &Path) -> bool {
        if let Some(extension) = path.extension() {
            matches!(
                extension.to_str().unwrap_or("").to_lowercase().as_str(),
                "html" | "htm" | "xhtml"
            )
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DomNode;

    #[test]
    fn strips_scripts_before_tokenizing() {
        let preprocessor = HtmlPreprocessor::default();
        let tree = preprocessor
            .parse_markup(
                "<html><body><script>if (a < b) { go(); }</script><p>Kept</p></body></html>",
            )
            .unwrap();
        let body = tree.find_first("body").unwrap();
        assert_eq!(body.element_children().count(), 1);
        assert_eq!(body.find_first("p").unwrap().direct_text(), Some("Kept"));
        assert!(tree.find_first("script").is_none());
    }

    #[test]
    fn custom_strip_list_is_honoured() {
        let config = PreprocessorConfig {
            strip_tags: vec!["aside".into()],
            keep_comments: false,
        };
        let preprocessor = HtmlPreprocessor::new(&config);
        let tree = preprocessor
            .parse_markup("<div><!-- ad --><aside>Sponsored</aside><p>Body</p></div>")
            .unwrap();
        let div = tree.find_first("div").unwrap();
        assert!(div.children.iter().all(|c| !matches!(c, DomNode::Comment(_))));
        assert!(div.find_first("aside").is_none());
    }

    #[test]
    fn supports_html_extensions() {
        let preprocessor = HtmlPreprocessor::default();
        assert!(preprocessor.supports_file_type(Path::new("page.HTML")));
        assert!(preprocessor.supports_file_type(Path::new("page.htm")));
        assert!(!preprocessor.supports_file_type(Path::new("doc.pdf")));
    }
}
