use thiserror::Error;

/// Error kinds surfaced by the graph core.
///
/// `EmptyInput` is a signal rather than a hard failure: there was nothing to
/// build from. Query and search never report "no results" as an error.
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("No document tree to build from")]
    EmptyInput,

    #[error("Reasoning strategy {strategy} failed: {message}")]
    Reasoning { strategy: String, message: String },

    #[error("Malformed query at offset {position}: {message}")]
    MalformedQuery { position: usize, message: String },

    #[error("Document nesting depth {depth} exceeds the configured maximum of {max_depth}")]
    TraversalDepth { depth: usize, max_depth: usize },

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unsupported input file: {0}")]
    UnsupportedFile(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GraphError {
    pub fn reasoning(strategy: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Reasoning {
            strategy: strategy.into(),
            message: message.into(),
        }
    }

    pub fn malformed_query(position: usize, message: impl Into<String>) -> Self {
        Self::MalformedQuery {
            position,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, GraphError>;
