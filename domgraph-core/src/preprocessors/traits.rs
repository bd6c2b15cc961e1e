// Preprocessor abstraction for markup parsing
//
// This module defines the boundary between markup parsing (HTML -> DocumentTree)
// and semantic processing (DocumentTree -> GraphStore). Everything after this
// point works with the document tree and is format-agnostic.

use crate::document::DocumentTree;
use crate::error::Result;
use std::path::Path;

/// Preprocessor trait - converts markup to a `DocumentTree`
///
/// Preprocessors handle:
/// - Markup syntax (HTML, XHTML, ...)
/// - Entity decoding
/// - Dropping content that never belongs in the graph (scripts, styles)
pub trait Preprocessor {
    /// Parse markup into an ordered document tree
    fn parse_markup(&self, markup: &str) -> Result<DocumentTree>;

    /// Get preprocessor name for debugging/logging
    fn name(&self) -> &str;

    /// Check if preprocessor supports the given file type
    fn supports_file_type(&self, path: &Path) -> bool;
}
