//! Raya NFI SPI
//!
//! The contract between the Raya host engine, the internal `nfi-native`
//! language and the guest languages that consume native backends:
//! - Native type tags (`NativeSimpleType`)
//! - Backend, backend factory and toolset traits
//! - The host environment (`Env`) with its option map and service registry
//! - The guest-language registration surface (`LanguageDescriptor`, `GuestLanguage`)
//!
//! This crate holds no engine state. Implementations live in `raya-nfi`.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod backend;
pub mod env;
pub mod error;
pub mod language;
pub mod types;

pub use backend::{NfiBackend, NfiBackendFactory, NfiBackendTools};
pub use env::{Env, EnvBuilder, EnvId};
pub use error::{SpiError, SpiResult};
pub use language::{CallTarget, ContextPolicy, GuestLanguage, LanguageDescriptor, ParsingRequest};
pub use types::NativeSimpleType;
