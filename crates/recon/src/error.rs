use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),
    /// Config validation error (empty installation name, empty keyword set).
    #[error("config validation error: {0}")]
    ConfigValidation(String),
    /// The certificate carries no tag, so nothing can be looked up.
    #[error("certificate has no TAG; reconciliation needs one")]
    MissingTag,
}

/// Failure reported by a registry backend.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// A mutator addressed a row that does not exist.
    #[error("no instrument with {key} '{value}'")]
    NotFound { key: &'static str, value: String },
    /// Storage-level failure (SQL error, locked database, ...).
    #[error("registry error: {0}")]
    Backend(String),
}
