//! Error types for the nfi-native language

use crate::context::ContextId;
use raya_nfi_spi::SpiError;

/// Result type for nfi-native operations
pub type NfiResult<T> = Result<T, NfiError>;

/// Misuse of the lifecycle API. These indicate a bug in the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Fault {
    /// Operation on a context that was already disposed
    #[error("context {0:?} has been disposed")]
    Disposed(ContextId),

    /// Operation that needs an initialized context
    #[error("context {0:?} is not initialized")]
    NotInitialized(ContextId),

    /// Backend descriptor lookup while no context of the engine is initialized
    #[error("no nfi context of this engine has been initialized")]
    NoInitializedContext,

    /// Second `initialize` on the same context
    #[error("context {0:?} is already initialized")]
    AlreadyInitialized(ContextId),

    /// A different backend factory already owns the id on this env
    #[error("conflicting backend factory registration for '{backend_id}' on env {env}")]
    ConflictingRegistration {
        /// Backend id that was already taken
        backend_id: String,
        /// Raw env id
        env: u64,
    },
}

/// nfi-native errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NfiError {
    /// Direct use of the internal language
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// Context setup failed
    #[error("Initialization failed: {0}")]
    InitializationFailure(String),

    /// Rebinding a pre-initialized context failed
    #[error("Patch failed: {0}")]
    PatchFailure(String),

    /// Caller bug; not recoverable
    #[error("Programming fault: {0}")]
    ProgrammingFault(Fault),
}

impl NfiError {
    /// Whether this error is a caller bug rather than an environmental failure
    pub fn is_programming_fault(&self) -> bool {
        matches!(self, NfiError::ProgrammingFault(_))
    }
}

impl From<Fault> for NfiError {
    fn from(fault: Fault) -> Self {
        NfiError::ProgrammingFault(fault)
    }
}

impl From<SpiError> for NfiError {
    fn from(err: SpiError) -> Self {
        match err {
            SpiError::ConflictingFactory { backend_id, env } => {
                NfiError::ProgrammingFault(Fault::ConflictingRegistration { backend_id, env })
            }
        }
    }
}
