use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Startup parameters that can never produce a valid measurement.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// Empty, short or otherwise malformed sample block.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Failure reported by the radio front-end.
    #[error("radio front-end error: {0}")]
    HardwareIo(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
