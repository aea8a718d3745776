use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("unknown value flag: {0}")]
    UnknownFlag(String),
    #[error("invalid reference range [{low}, {high}]: low bound exceeds high bound")]
    InvalidRange { low: String, high: String },
    #[error("{0}")]
    Message(String),
}

pub type Result<T> = std::result::Result<T, ModelError>;
