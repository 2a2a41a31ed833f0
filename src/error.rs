use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("File not found or could not be read: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse job configuration JSON: {0}")]
    DeserializationError(#[from] serde_json::Error),

    #[error("Invalid job configuration: {0}")]
    ConfigError(String),

    #[error("{0}")]
    InvalidTopology(String),

    #[error("Host '{host}' is not part of the cluster {hosts:?}")]
    UnknownHost { host: String, hosts: Vec<String> },

    #[error("Coordination probe against '{target}' failed: {reason}")]
    CoordinationProbeFailure { target: String, reason: String },

    #[error("Launch of entry point '{entry_point}' failed: {reason}")]
    LaunchFailure { entry_point: String, exit_code: Option<i32>, reason: String },
}

impl Error {
    /// Exit code the launcher process should terminate with for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::LaunchFailure { exit_code: Some(code), .. } if *code != 0 => *code,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
