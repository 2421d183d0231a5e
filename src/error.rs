use thiserror::Error;

/// Errors raised while reading, validating or writing a product table.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TableError {
    /// The file container or its content could not be parsed.
    #[error("{0}")]
    Format(String),

    #[error("File must contain 'Name', 'Id', and 'Description' columns (missing: {})", .missing.join(", "))]
    Schema { missing: Vec<String> },

    #[error("{0}")]
    Instruction(String),

    #[error("{path}: {message}")]
    Io { path: String, message: String },
}

impl TableError {
    pub fn io(path: &std::path::Path, err: impl std::fmt::Display) -> Self {
        TableError::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }
}

/// Failure of a single text-generation call. Never surfaced per row:
/// the rewriter turns it into a fallback value.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("response contained no completion text")]
    EmptyResponse,
}
