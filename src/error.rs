use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("corpus root is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("cannot read directory {path}: {source}")]
    UnreadableDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot read document {path}: {source}")]
    UnreadableFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("record refers to unknown law at {0}")]
    UnknownLaw(String),

    #[error("record refers to unknown category {0:?}")]
    UnknownCategory(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

pub type Result<T> = std::result::Result<T, CompileError>;
