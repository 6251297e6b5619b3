//! Guest-language registration surface
//!
//! The host engine instantiates one `GuestLanguage` per engine and drives
//! every context of that language through it.

use crate::env::Env;
use std::thread::ThreadId;

/// How compiled code may be shared between engines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextPolicy {
    /// One language instance per context
    Exclusive,
    /// Contexts may reuse a language instance
    Reuse,
    /// Contexts and engines may share a language instance and its compiled code
    Shared,
}

/// Static registration data for a language
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageDescriptor {
    /// Unique language id
    pub id: &'static str,
    /// Display name
    pub name: &'static str,
    /// Implementation version
    pub version: &'static str,
    /// Content type accepted by `parse`
    pub content_type: &'static str,
    /// Hidden from users when set
    pub internal: bool,
    /// Context sharing policy
    pub context_policy: ContextPolicy,
    /// Names of services published on each context's env
    pub services: &'static [&'static str],
}

/// Source handed to `GuestLanguage::parse`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsingRequest {
    /// Content type of the source
    pub content_type: String,
    /// Source text
    pub source: String,
    /// Argument names the resulting target expects
    pub argument_names: Vec<String>,
}

impl ParsingRequest {
    /// Create a request without argument names
    pub fn new(content_type: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            content_type: content_type.into(),
            source: source.into(),
            argument_names: Vec::new(),
        }
    }
}

/// Executable result of parsing
pub trait CallTarget: Send + Sync {
    /// Error raised by `call`
    type Error: std::error::Error + Send + Sync + 'static;

    /// Execute with string-encoded arguments
    fn call(&self, args: &[String]) -> Result<String, Self::Error>;
}

/// Language implementation as seen by the host engine
pub trait GuestLanguage: Send + Sync {
    /// Per-context state
    type Context;
    /// Error raised by lifecycle and parse operations
    type Error: std::error::Error + Send + Sync + 'static;
    /// Target produced by `parse`
    type Target: CallTarget;

    /// Registration data
    fn descriptor(&self) -> &LanguageDescriptor;

    /// Allocate a context bound to `env`
    fn create_context(&self, env: Env) -> Result<Self::Context, Self::Error>;

    /// Run fallible setup for a freshly created context
    fn initialize_context(&self, context: &Self::Context) -> Result<(), Self::Error>;

    /// Rebind a pre-initialized context to a live environment
    fn patch_context(&self, context: &Self::Context, new_env: Env) -> Result<(), Self::Error>;

    /// Release a context
    fn dispose_context(&self, context: &Self::Context) -> Result<(), Self::Error>;

    /// Called by the host when it knows more than one context will exist
    fn initialize_multiple_contexts(&self) {}

    /// Whether `thread` may enter a context of this language
    fn is_thread_access_allowed(&self, _thread: ThreadId, single_threaded: bool) -> bool {
        single_threaded
    }

    /// Parse a source into an executable target
    fn parse(&self, request: &ParsingRequest) -> Result<Self::Target, Self::Error>;
}
