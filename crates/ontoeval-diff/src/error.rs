use thiserror::Error;

#[derive(Error, Debug)]
pub enum DiffError {
    #[error("Invalid diff input: expected a string or a list of strings, got {0}")]
    InvalidInput(String),

    #[error("Invalid diff line at index {index}: expected a string, got {found}")]
    InvalidLine { index: usize, found: String },

    #[error("Invalid metadiff line: {0}")]
    InvalidMetadiffLine(String),
}
