//! Markup Preprocessors
//!
//! This module provides the preprocessing layer for converting markup into
//! the `DocumentTree` that feeds the graph builder.
//!
//! ## Architecture
//!
//! ```text
//! Markup (HTML, XHTML)
//!     ↓
//! [Format-specific Preprocessor]
//!     ↓
//! DocumentTree
//!     ↓
//! [Graph Builder]
//!     ↓
//! GraphStore
//! ```
//!
//! ## Available Preprocessors
//!
//! - `HtmlPreprocessor` - HTML pages via a tolerant quick-xml event loop

pub mod html;
pub mod traits;

// Re-export main types
pub use html::HtmlPreprocessor;
pub use traits::Preprocessor;
