use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("failed to read CSV token dump: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to read JSON token dump: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid page selection: {0}")]
    InvalidPageSelection(String),

    #[error("invalid game profile: {0}")]
    InvalidProfile(String),

    #[error("invalid option: {0}")]
    InvalidOption(String),

    #[error("document has no pages to extract from")]
    EmptyDocument,

    #[error("no pages available after applying selection")]
    NoPagesSelected,
}
