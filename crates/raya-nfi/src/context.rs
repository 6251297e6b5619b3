//! nfi-native context lifecycle
//!
//! Each `NfiContext` moves through
//! `Uninitialized → Initialized → Disposed`. A context built during
//! ahead-of-time pre-initialization is later *patched*: rebound to the live
//! `Env` and initialized again. Engine-level caches are keyed by engine, not
//! by env, so patching leaves them untouched.

use crate::backend::BackendHandle;
use crate::engine::NfiEngine;
use crate::error::{Fault, NfiError, NfiResult};
use crate::options::NfiOptions;
use crate::type_cache::CachedTypeInfo;
use parking_lot::Mutex;
use raya_nfi_spi::{Env, NativeSimpleType};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Unique identifier for an NfiContext
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(u64);

impl ContextId {
    /// Create a new unique context ID
    pub fn new() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        ContextId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ContextId {
    fn default() -> Self {
        Self::new()
    }
}

/// Lifecycle state of a context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextLifecycle {
    /// Created, setup not yet run (or a patch failed)
    Uninitialized,
    /// Ready for use
    Initialized,
    /// Released; every further operation is a fault
    Disposed,
}

struct ContextState {
    lifecycle: ContextLifecycle,
    env: Env,
    defaults: Option<NfiOptions>,
    initializations: u32,
    patches: u32,
}

/// Per-context state of the nfi-native language
pub struct NfiContext {
    id: ContextId,
    engine: Arc<NfiEngine>,
    state: Mutex<ContextState>,
}

impl NfiContext {
    pub(crate) fn new(engine: Arc<NfiEngine>, env: Env) -> Self {
        Self {
            id: ContextId::new(),
            engine,
            state: Mutex::new(ContextState {
                lifecycle: ContextLifecycle::Uninitialized,
                env,
                defaults: None,
                initializations: 0,
                patches: 0,
            }),
        }
    }

    /// Get the context ID
    pub fn id(&self) -> ContextId {
        self.id
    }

    /// Current lifecycle state
    pub fn lifecycle(&self) -> ContextLifecycle {
        self.state.lock().lifecycle
    }

    /// Environment the context is currently bound to
    pub fn env(&self) -> Env {
        self.state.lock().env.clone()
    }

    /// Engine this context belongs to
    pub fn engine(&self) -> &Arc<NfiEngine> {
        &self.engine
    }

    /// Native defaults resolved by the last successful initialization
    pub fn defaults(&self) -> Option<NfiOptions> {
        self.state.lock().defaults.clone()
    }

    /// How many times initialization has run, including failed attempts
    pub fn initialization_count(&self) -> u32 {
        self.state.lock().initializations
    }

    /// How many times the context has been patched
    pub fn patch_count(&self) -> u32 {
        self.state.lock().patches
    }

    /// Resolve native defaults from the bound env.
    ///
    /// Failure is returned to the caller and not retried; the context stays
    /// `Uninitialized`.
    pub fn initialize(&self) -> NfiResult<()> {
        let mut state = self.state.lock();
        match state.lifecycle {
            ContextLifecycle::Uninitialized => {}
            ContextLifecycle::Initialized => {
                return Err(self.fault(Fault::AlreadyInitialized(self.id)))
            }
            ContextLifecycle::Disposed => return Err(self.fault(Fault::Disposed(self.id))),
        }
        self.initialize_locked(&mut state)
    }

    /// Rebind to `new_env` and initialize again.
    ///
    /// On failure the context is left `Uninitialized`; the caller should
    /// dispose it and create a fresh one.
    pub fn patch(&self, new_env: Env) -> NfiResult<()> {
        let mut state = self.state.lock();
        match state.lifecycle {
            ContextLifecycle::Initialized => {}
            ContextLifecycle::Uninitialized => {
                return Err(self.fault(Fault::NotInitialized(self.id)))
            }
            ContextLifecycle::Disposed => return Err(self.fault(Fault::Disposed(self.id))),
        }

        tracing::debug!(
            context = self.id.as_u64(),
            from_env = state.env.id().as_u64(),
            to_env = new_env.id().as_u64(),
            "patching nfi context"
        );
        state.env = new_env;
        state.defaults = None;
        state.lifecycle = ContextLifecycle::Uninitialized;
        state.patches += 1;

        self.initialize_locked(&mut state).map_err(|err| match err {
            NfiError::InitializationFailure(msg) => {
                tracing::warn!(context = self.id.as_u64(), %msg, "patch failed");
                NfiError::PatchFailure(msg)
            }
            other => other,
        })
    }

    /// Release per-context resources and mark the context disposed
    pub fn dispose(&self) -> NfiResult<()> {
        let mut state = self.state.lock();
        if state.lifecycle == ContextLifecycle::Disposed {
            return Err(self.fault(Fault::Disposed(self.id)));
        }
        state.defaults = None;
        state.lifecycle = ContextLifecycle::Disposed;
        tracing::debug!(context = self.id.as_u64(), "disposed nfi context");
        Ok(())
    }

    /// Scalar descriptor for `tag`; requires an initialized context
    pub fn lookup_simple_type(&self, tag: NativeSimpleType) -> NfiResult<Arc<CachedTypeInfo>> {
        self.ensure_initialized()?;
        Ok(self.engine.types().lookup_simple(tag))
    }

    /// Array descriptor for `tag`; requires an initialized context
    pub fn lookup_array_type(&self, tag: NativeSimpleType) -> NfiResult<Arc<CachedTypeInfo>> {
        self.ensure_initialized()?;
        Ok(self.engine.types().lookup_array(tag))
    }

    /// Environment pseudo-type descriptor; requires an initialized context
    pub fn env_type(&self) -> NfiResult<Arc<CachedTypeInfo>> {
        self.ensure_initialized()?;
        Ok(self.engine.types().env_type())
    }

    /// The engine's backend, if some guest language has created it
    pub fn backend(&self) -> NfiResult<Option<BackendHandle>> {
        self.ensure_initialized()?;
        Ok(self.engine.backend())
    }

    fn initialize_locked(&self, state: &mut ContextState) -> NfiResult<()> {
        state.initializations += 1;
        match NfiOptions::from_env(&state.env) {
            Ok(options) => {
                tracing::debug!(
                    context = self.id.as_u64(),
                    env = state.env.id().as_u64(),
                    default_library = %options.default_library,
                    preinitialization = state.env.is_preinitialization(),
                    "initialized nfi context"
                );
                state.defaults = Some(options);
                state.lifecycle = ContextLifecycle::Initialized;
                self.engine.context_initialized();
                Ok(())
            }
            Err(err) => {
                tracing::warn!(context = self.id.as_u64(), error = %err, "context initialization failed");
                Err(err)
            }
        }
    }

    fn ensure_initialized(&self) -> NfiResult<()> {
        match self.state.lock().lifecycle {
            ContextLifecycle::Initialized => Ok(()),
            ContextLifecycle::Uninitialized => Err(self.fault(Fault::NotInitialized(self.id))),
            ContextLifecycle::Disposed => Err(self.fault(Fault::Disposed(self.id))),
        }
    }

    fn fault(&self, fault: Fault) -> NfiError {
        tracing::error!(context = self.id.as_u64(), %fault, "nfi context misuse");
        NfiError::ProgrammingFault(fault)
    }
}

impl fmt::Debug for NfiContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("NfiContext")
            .field("id", &self.id)
            .field("lifecycle", &state.lifecycle)
            .field("env", &state.env.id())
            .field("initializations", &state.initializations)
            .field("patches", &state.patches)
            .finish()
    }
}
