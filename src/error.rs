use thiserror::Error;

/// Failure classes surfaced by the trust subsystem.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid construction input. Never raised at steady state.
    #[error("invalid configuration: {0}")]
    Configuration(String),
    /// No active call frame lies under a configured zone root.
    #[error("caller could not be resolved from the active call frames")]
    UnknownCaller,
    /// The resolved caller holds no credential.
    #[error("no credential registered for caller `{0}`")]
    NotRegistered(String),
    /// The caller is known but the operation is not allowed.
    #[error("permission denied: {0}")]
    PermissionDenied(String),
}

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;
