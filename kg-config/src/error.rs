use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse TOML config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    /// Raised when an admin operation targets a config row that is
    /// `change_protected`/`delete_protected` without an explicit unprotect
    /// first (§4.3, error kind `config_protected`).
    #[error("configuration is protected; call unprotect() first: {0}")]
    Protected(String),
}
