use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("unsupported channel address `{0}`; expected ws:// or wss://")]
    InvalidAddress(String),
    #[error("remote channel must be created inside a tokio runtime")]
    NoRuntime,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MazeError {
    #[error("maze layout is empty")]
    Empty,
    #[error("maze row {row} has width {width}, expected {expected}")]
    RaggedRow {
        row: usize,
        width: usize,
        expected: usize,
    },
    #[error("unknown tile `{tile}` at row {row}, column {col}")]
    UnknownTile { tile: char, row: usize, col: usize },
    #[error("tunnel exits must come as one `<` on the left edge and one `>` on the right edge")]
    UnpairedTunnel,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid value for {key}: `{value}`")]
    InvalidValue { key: &'static str, value: String },
    #[error("invalid color `{0}`; expected #rrggbb")]
    InvalidColor(String),
}
