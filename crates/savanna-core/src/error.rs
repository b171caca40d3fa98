//! Error types for the simulation.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Plugin load error ({plugin}): {reason}")]
    PluginLoad { plugin: String, reason: String },

    #[error("Cannot access plugin directory {path}: {source}")]
    DirectoryAccess {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Unknown species symbol: '{0}'")]
    UnknownSpecies(char),
}

impl Error {
    /// Whether this error must stop the application from starting
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Configuration(_) | Error::DirectoryAccess { .. } | Error::Io(_)
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
