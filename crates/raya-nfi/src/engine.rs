//! Engine-scoped state of the nfi-native language
//!
//! One `NfiEngine` exists per host engine. It owns everything that outlives
//! individual contexts: the backend singleton, the type descriptor tables
//! and the single-context assumption.

use crate::assumption::Assumption;
use crate::backend::{BackendCache, BackendHandle};
use crate::type_cache::TypeInfoCache;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Name of the single-context assumption
pub const SINGLE_CONTEXT_ASSUMPTION: &str = "nfi-native backend single context";

/// Engine-wide nfi-native state
pub struct NfiEngine {
    single_context: Assumption,
    types: Arc<TypeInfoCache>,
    backends: BackendCache,
    contexts_created: AtomicUsize,
    context_ready: Arc<AtomicBool>,
}

impl NfiEngine {
    /// Create fresh engine state
    pub fn new() -> Self {
        let types = Arc::new(TypeInfoCache::new());
        let context_ready = Arc::new(AtomicBool::new(false));
        Self {
            single_context: Assumption::new(SINGLE_CONTEXT_ASSUMPTION),
            backends: BackendCache::new(types.clone(), context_ready.clone()),
            types,
            contexts_created: AtomicUsize::new(0),
            context_ready,
        }
    }

    /// Holds while at most one context has ever been created
    pub fn single_context_assumption(&self) -> &Assumption {
        &self.single_context
    }

    /// Type descriptor tables
    pub fn types(&self) -> &Arc<TypeInfoCache> {
        &self.types
    }

    /// Backend singleton slot
    pub fn backends(&self) -> &BackendCache {
        &self.backends
    }

    /// The backend, if it has been constructed
    pub fn backend(&self) -> Option<BackendHandle> {
        self.backends.get()
    }

    /// Number of contexts ever created for this engine
    pub fn contexts_created(&self) -> usize {
        self.contexts_created.load(Ordering::Acquire)
    }

    /// Whether any context of this engine has completed initialization.
    /// Stays set after that context is disposed.
    pub fn has_initialized_context(&self) -> bool {
        self.context_ready.load(Ordering::Acquire)
    }

    pub(crate) fn context_initialized(&self) {
        self.context_ready.store(true, Ordering::Release);
    }

    /// Record a context creation; the second one invalidates the
    /// single-context assumption. Returns the new count.
    pub(crate) fn context_created(&self) -> usize {
        let count = self.contexts_created.fetch_add(1, Ordering::AcqRel) + 1;
        if count > 1 {
            self.single_context.invalidate();
        }
        count
    }
}

impl Default for NfiEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for NfiEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NfiEngine")
            .field("single_context", &self.single_context.is_valid())
            .field("contexts_created", &self.contexts_created())
            .field("context_ready", &self.has_initialized_context())
            .field("types", &self.types)
            .field("backends", &self.backends)
            .finish()
    }
}
