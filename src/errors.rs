use thiserror::Error;

/// Result alias used across the container and bridge layers.
pub type Result<T, E = BridgeError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum BridgeError {
    /// Bad input at the point of use: an index outside the sequence, an empty
    /// record in strict mode, or an implementation that produced the wrong type.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// The operation is valid but not yet (or no longer) allowed,
    /// e.g. a factory invoked before the provider was built.
    #[error("Illegal state: {0}")]
    IllegalState(String),
    /// A disposed bridge/provider or a dropped registry was used.
    #[error("Use after release: {0}")]
    UseAfterRelease(String),
    #[error("Service '{0}' is not registered")]
    ServiceNotRegistered(String),
    /// The value registered under `service` cannot be downcast to `expected`.
    #[error("Type cast failed: service '{service}' does not hold a value of type '{expected}'")]
    TypeCastFailed { service: String, expected: String },
    #[error("Circular dependency detected in chain: {}", chain.join(" -> "))]
    CircularDependency { chain: Vec<String> },
}

impl BridgeError {
    pub fn out_of_range(index: usize, len: usize) -> Self {
        BridgeError::InvalidArgument(format!(
            "index {} is out of range for a collection of length {}",
            index, len
        ))
    }

    /// Whether the error was caused by calling things in the wrong order
    /// rather than by bad input.
    pub fn is_lifecycle_error(&self) -> bool {
        matches!(
            self,
            BridgeError::IllegalState(_) | BridgeError::UseAfterRelease(_)
        )
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read file '{0}': {1}")]
    FileRead(String, #[source] std::io::Error),
    #[error("Failed to parse TOML from file '{0}': {1}")]
    TomlParse(String, #[source] toml::de::Error),
    #[error("Invalid value '{value}' for '{field}'")]
    InvalidValue { field: String, value: String },
    #[error("Could not determine the user configuration directory")]
    NoConfigDir,
}
