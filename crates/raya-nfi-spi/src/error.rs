//! Error types for the host-facing SPI

/// Result type for SPI operations
pub type SpiResult<T> = Result<T, SpiError>;

/// Errors raised by the host environment
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpiError {
    /// A different factory already owns this backend id on the environment
    #[error("Conflicting backend factory registration for '{backend_id}' on env {env}")]
    ConflictingFactory {
        /// Backend id that was already taken
        backend_id: String,
        /// Raw id of the environment
        env: u64,
    },
}
