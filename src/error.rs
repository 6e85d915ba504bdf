#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum AppError {
    #[error("Missing config with key \"{key}\"")]
    MissingConfig { key: String },

    #[error("Invalid config value for \"{key}\": {value:?}")]
    InvalidConfig { key: String, value: String },

    #[error("Configuration error: {msg}")]
    ConfigurationError { msg: String },
}
