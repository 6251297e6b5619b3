//! The `nfi-native` language registration
//!
//! The host engine creates one `NfiLanguage` per engine. Its only job
//! towards other guest languages is to publish a `NativeBackendFactory` on
//! every context's env; the language itself cannot run guest code.

use crate::backend::{BackendHandle, NATIVE_BACKEND_ID};
use crate::context::NfiContext;
use crate::engine::NfiEngine;
use crate::error::{NfiError, NfiResult};
use once_cell::sync::OnceCell;
use raya_nfi_spi::{
    CallTarget, ContextPolicy, Env, GuestLanguage, LanguageDescriptor, NfiBackend,
    NfiBackendFactory, NfiBackendTools, ParsingRequest,
};
use std::sync::Arc;
use std::thread::ThreadId;

/// Registration data of the internal native language
pub static NFI_LANGUAGE: LanguageDescriptor = LanguageDescriptor {
    id: "internal/nfi-native",
    name: "nfi-native",
    version: "0.1",
    content_type: "application/x-raya-nfi",
    internal: true,
    context_policy: ContextPolicy::Shared,
    services: &["NfiBackendFactory"],
};

const ILLEGAL_ACCESS: &str = "illegal access to internal language";

/// Backend factory published on each context's env.
///
/// Holds the engine explicitly so every env of that engine hands out the
/// same backend.
pub struct NativeBackendFactory {
    engine: Arc<NfiEngine>,
}

impl NativeBackendFactory {
    fn new(engine: Arc<NfiEngine>) -> Self {
        Self { engine }
    }

    /// Engine this factory serves
    pub fn engine(&self) -> &Arc<NfiEngine> {
        &self.engine
    }

    /// Typed variant of `create_backend`
    pub fn create_native_backend(&self, tools: Arc<dyn NfiBackendTools>) -> BackendHandle {
        self.engine.backends().get_or_create(tools)
    }
}

impl NfiBackendFactory for NativeBackendFactory {
    fn backend_id(&self) -> &str {
        NATIVE_BACKEND_ID
    }

    fn create_backend(&self, tools: Arc<dyn NfiBackendTools>) -> Arc<dyn NfiBackend> {
        self.create_native_backend(tools)
    }
}

/// Target returned by `parse`; executing it always fails
#[derive(Debug, Clone, Copy, Default)]
pub struct InternalCallTarget;

impl CallTarget for InternalCallTarget {
    type Error = NfiError;

    fn call(&self, _args: &[String]) -> Result<String, NfiError> {
        tracing::warn!(language = NFI_LANGUAGE.id, "rejected direct execution");
        Err(NfiError::Unsupported(ILLEGAL_ACCESS.to_string()))
    }
}

/// The internal nfi-native language of one engine
pub struct NfiLanguage {
    engine: Arc<NfiEngine>,
    factory: OnceCell<Arc<NativeBackendFactory>>,
}

impl NfiLanguage {
    /// Create the language with fresh engine state
    pub fn new() -> Self {
        Self::with_engine(Arc::new(NfiEngine::new()))
    }

    /// Create the language on top of existing engine state
    pub fn with_engine(engine: Arc<NfiEngine>) -> Self {
        Self {
            engine,
            factory: OnceCell::new(),
        }
    }

    /// Engine-wide state
    pub fn engine(&self) -> &Arc<NfiEngine> {
        &self.engine
    }

    /// Shortcut to the engine's single-context assumption
    pub fn single_context_assumption(&self) -> &crate::assumption::Assumption {
        self.engine.single_context_assumption()
    }

    /// The backend factory, once the first context has been created
    pub fn backend_factory(&self) -> Option<Arc<NativeBackendFactory>> {
        self.factory.get().cloned()
    }

    fn factory(&self) -> Arc<NativeBackendFactory> {
        self.factory
            .get_or_init(|| {
                tracing::debug!(
                    backend = NATIVE_BACKEND_ID,
                    services = ?NFI_LANGUAGE.services,
                    "creating native backend factory"
                );
                Arc::new(NativeBackendFactory::new(self.engine.clone()))
            })
            .clone()
    }
}

impl Default for NfiLanguage {
    fn default() -> Self {
        Self::new()
    }
}

impl GuestLanguage for NfiLanguage {
    type Context = Arc<NfiContext>;
    type Error = NfiError;
    type Target = InternalCallTarget;

    fn descriptor(&self) -> &LanguageDescriptor {
        &NFI_LANGUAGE
    }

    fn create_context(&self, env: Env) -> NfiResult<Arc<NfiContext>> {
        let factory: Arc<dyn NfiBackendFactory> = self.factory();
        env.register_backend_factory(factory)?;

        let count = self.engine.context_created();
        let context = Arc::new(NfiContext::new(self.engine.clone(), env));
        tracing::debug!(
            context = context.id().as_u64(),
            contexts = count,
            single_context = self.engine.single_context_assumption().is_valid(),
            "created nfi context"
        );
        Ok(context)
    }

    fn initialize_context(&self, context: &Arc<NfiContext>) -> NfiResult<()> {
        context.initialize()
    }

    fn patch_context(&self, context: &Arc<NfiContext>, new_env: Env) -> NfiResult<()> {
        context.patch(new_env)
    }

    fn dispose_context(&self, context: &Arc<NfiContext>) -> NfiResult<()> {
        context.dispose()
    }

    fn initialize_multiple_contexts(&self) {
        self.engine.single_context_assumption().invalidate();
    }

    // Every service of this language is reentrant at the engine level
    fn is_thread_access_allowed(&self, _thread: ThreadId, _single_threaded: bool) -> bool {
        true
    }

    fn parse(&self, request: &ParsingRequest) -> NfiResult<InternalCallTarget> {
        tracing::debug!(
            content_type = %request.content_type,
            arguments = ?request.argument_names,
            "parse request for internal language"
        );
        Ok(InternalCallTarget)
    }
}

impl std::fmt::Debug for NfiLanguage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NfiLanguage")
            .field("id", &NFI_LANGUAGE.id)
            .field("engine", &self.engine)
            .finish()
    }
}
