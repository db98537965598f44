use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("The catalog must list at least one product")]
    EmptyCatalog,

    #[error("Configuration validation error: {0}")]
    ValidationError(String),
}
