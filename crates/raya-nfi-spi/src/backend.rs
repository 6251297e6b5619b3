//! Backend traits
//!
//! A backend performs the actual native call marshalling and dispatch.
//! Guest languages never construct one directly: they look up the
//! `NfiBackendFactory` registered on their `Env` and ask it for the
//! engine's backend.

use std::fmt;
use std::sync::Arc;

/// Low-level native capabilities handed to a backend when it is created.
///
/// Symbol resolution, call execution and similar operations live behind
/// this trait. The NFI language layer only stores the toolset; it never
/// calls into it.
pub trait NfiBackendTools: Send + Sync + fmt::Debug {}

/// An instantiated native backend
pub trait NfiBackend: Send + Sync {
    /// Identifier the backend was registered under
    fn backend_id(&self) -> &str;

    /// Toolset this backend was constructed with
    fn tools(&self) -> &Arc<dyn NfiBackendTools>;
}

/// Service registered on each context's `Env` to hand out the engine's backend
pub trait NfiBackendFactory: Send + Sync {
    /// Identifier of the backends this factory produces
    fn backend_id(&self) -> &str;

    /// Return the engine's backend, constructing it on first use.
    ///
    /// Implementations must return the identical instance on every call.
    fn create_backend(&self, tools: Arc<dyn NfiBackendTools>) -> Arc<dyn NfiBackend>;
}
