use thiserror::Error;

/// Fall detector error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FallDetectorError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Config file error: {0}")]
    ConfigFile(String),

    #[error("Invalid sample: {0}")]
    InvalidSample(String),

    #[error("Malformed input line: {0}")]
    Parse(String),
}

impl FallDetectorError {
    /// Per-sample faults are skipped; everything else stops startup
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            FallDetectorError::InvalidSample(_) | FallDetectorError::Parse(_)
        )
    }
}

/// Result type for detector operations
pub type DetectorResult<T> = Result<T, FallDetectorError>;
