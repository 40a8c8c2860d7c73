use thiserror::Error;

#[derive(Debug, Error)]
pub enum CibylError {
    #[error("no configuration file found; looked in: {}", .0.join(", "))]
    ConfigNotFound(Vec<String>),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to download configuration from {url}: {message}")]
    ConfigDownload { url: String, message: String },

    #[error("environment '{name}' not found in configuration; known: {}", .known.join(", "))]
    InvalidEnvironment { name: String, known: Vec<String> },

    #[error("system '{name}' not found in configuration; known: {}", .known.join(", "))]
    InvalidSystem { name: String, known: Vec<String> },

    #[error("no system matches the user input; configured systems: {}", .0.join(", "))]
    NoValidSystem(Vec<String>),

    #[error("no enabled system matches the user input; enable one in the configuration or pass --systems")]
    NoEnabledSystem,

    #[error("no source matches the user input; configured sources: {}", .0.join(", "))]
    NoValidSources(Vec<String>),

    #[error("no enabled source of system '{system}' can answer this query")]
    NoSupportedSource { system: String },

    #[error("no selected system can answer a {query} query; tried: {}", .systems.join(", "))]
    UnsupportedQuery { query: String, systems: Vec<String> },

    #[error("source '{source_name}' of system '{system}' failed: {message}")]
    SourceFailed {
        system: String,
        source_name: String,
        message: String,
    },

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Failures raised while talking to a single source.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("jenkins request failed: {0}")]
    Jenkins(String),

    #[error("zuul request failed: {0}")]
    Zuul(String),

    #[error("jenkins job builder: {0}")]
    JobBuilder(String),

    #[error("source '{source_name}' does not support {operation}")]
    Unsupported {
        source_name: String,
        operation: String,
    },
}

pub type Result<T> = std::result::Result<T, CibylError>;
