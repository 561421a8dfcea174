use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CelebrationError {
    #[error("Invalid parameter {name}: {value}")]
    InvalidParameter { name: &'static str, value: i64 },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Text ladder must contain at least one entry")]
    EmptyTextLadder,

    #[error("Conversion threshold must be at least 1, got {0}")]
    InvalidThreshold(i64),

    #[error("Invalid evasion tuning: {0}")]
    InvalidTuning(&'static str),

    #[error("Unknown flavor: {0}")]
    UnknownFlavor(String),

    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
}
