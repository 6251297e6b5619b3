//! Raya NFI native language
//!
//! The internal, hidden `nfi-native` language that hands native backends to
//! the other guest languages of an engine. This crate provides:
//! - Context lifecycle (create, initialize, patch, dispose)
//! - The per-engine backend singleton
//! - Native type descriptor caches
//! - The single-context speculation assumption and a guard that consumes it
//!
//! All engine-wide state lives in an explicit `NfiEngine` so that several
//! engines in one process stay isolated.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod assumption;
pub mod backend;
pub mod context;
pub mod engine;
pub mod error;
pub mod language;
pub mod options;
pub mod speculation;
pub mod type_cache;

// Re-export SPI types (canonical definitions live in raya-nfi-spi)
pub use raya_nfi_spi::{
    CallTarget, ContextPolicy, Env, EnvBuilder, EnvId, GuestLanguage, LanguageDescriptor,
    NativeSimpleType, NfiBackend, NfiBackendFactory, NfiBackendTools, ParsingRequest, SpiError,
};

pub use assumption::{Assumption, InvalidationListener};
pub use backend::{BackendCache, BackendHandle, NfiBackendImpl, NATIVE_BACKEND_ID};
pub use context::{ContextId, ContextLifecycle, NfiContext};
pub use engine::NfiEngine;
pub use error::{Fault, NfiError, NfiResult};
pub use language::{InternalCallTarget, NativeBackendFactory, NfiLanguage, NFI_LANGUAGE};
pub use options::NfiOptions;
pub use speculation::BackendGuard;
pub use type_cache::{CachedTypeInfo, TypeInfoCache, TypeInfoKind};
