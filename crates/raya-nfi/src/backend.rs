//! Per-engine native backend singleton
//!
//! There is exactly one `NfiBackendImpl` per engine. Call sites rely on this
//! to treat "same backend instance" as "same native ABI and toolset", so the
//! handle must never be replaced once published.

use crate::error::{Fault, NfiError, NfiResult};
use crate::type_cache::{CachedTypeInfo, TypeInfoCache};
use once_cell::sync::OnceCell;
use raya_nfi_spi::{NativeSimpleType, NfiBackend, NfiBackendTools};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Id under which the native backend factory is registered
pub const NATIVE_BACKEND_ID: &str = "native";

/// Identity-stable handle to the engine's backend
pub type BackendHandle = Arc<NfiBackendImpl>;

/// The native backend of one engine
pub struct NfiBackendImpl {
    tools: Arc<dyn NfiBackendTools>,
    types: Arc<TypeInfoCache>,
    /// Set once some context of the engine has been initialized
    ready: Arc<AtomicBool>,
}

impl NfiBackendImpl {
    fn new(
        tools: Arc<dyn NfiBackendTools>,
        types: Arc<TypeInfoCache>,
        ready: Arc<AtomicBool>,
    ) -> Self {
        Self {
            tools,
            types,
            ready,
        }
    }

    /// Cached scalar descriptor for `tag`
    pub fn lookup_simple_type(&self, tag: NativeSimpleType) -> NfiResult<Arc<CachedTypeInfo>> {
        self.ensure_ready()?;
        Ok(self.types.lookup_simple(tag))
    }

    /// Cached array descriptor for `tag`
    pub fn lookup_array_type(&self, tag: NativeSimpleType) -> NfiResult<Arc<CachedTypeInfo>> {
        self.ensure_ready()?;
        Ok(self.types.lookup_array(tag))
    }

    /// Cached environment pseudo-type descriptor
    pub fn env_type(&self) -> NfiResult<Arc<CachedTypeInfo>> {
        self.ensure_ready()?;
        Ok(self.types.env_type())
    }

    // The factory is published at context creation, so a guest can hold the
    // backend before any context has run its setup.
    fn ensure_ready(&self) -> NfiResult<()> {
        if self.ready.load(Ordering::Acquire) {
            return Ok(());
        }
        let fault = Fault::NoInitializedContext;
        tracing::error!(backend = NATIVE_BACKEND_ID, %fault, "descriptor lookup before initialization");
        Err(NfiError::ProgrammingFault(fault))
    }
}

impl NfiBackend for NfiBackendImpl {
    fn backend_id(&self) -> &str {
        NATIVE_BACKEND_ID
    }

    fn tools(&self) -> &Arc<dyn NfiBackendTools> {
        &self.tools
    }
}

impl fmt::Debug for NfiBackendImpl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NfiBackendImpl")
            .field("id", &NATIVE_BACKEND_ID)
            .field("tools", &self.tools)
            .finish()
    }
}

/// Write-once slot holding the engine's backend
pub struct BackendCache {
    slot: OnceCell<BackendHandle>,
    types: Arc<TypeInfoCache>,
    ready: Arc<AtomicBool>,
}

impl BackendCache {
    /// Create an empty cache whose backend will share `types`.
    ///
    /// Descriptor lookups through the backend fail until `ready` is set.
    pub fn new(types: Arc<TypeInfoCache>, ready: Arc<AtomicBool>) -> Self {
        Self {
            slot: OnceCell::new(),
            types,
            ready,
        }
    }

    /// Return the backend, constructing it from `tools` on the first call.
    ///
    /// The first toolset wins. A different toolset passed later is ignored
    /// and the existing backend is returned unchanged.
    pub fn get_or_create(&self, tools: Arc<dyn NfiBackendTools>) -> BackendHandle {
        let mut constructed = false;
        let backend = self.slot.get_or_init(|| {
            constructed = true;
            tracing::debug!(backend = NATIVE_BACKEND_ID, ?tools, "constructing native backend");
            Arc::new(NfiBackendImpl::new(
                tools.clone(),
                self.types.clone(),
                self.ready.clone(),
            ))
        });
        if !constructed && !Arc::ptr_eq(backend.tools(), &tools) {
            tracing::debug!(
                backend = NATIVE_BACKEND_ID,
                "backend already exists, ignoring new toolset"
            );
        }
        backend.clone()
    }

    /// The backend, if it has been constructed
    pub fn get(&self) -> Option<BackendHandle> {
        self.slot.get().cloned()
    }

    /// Whether the backend has been constructed
    pub fn is_initialized(&self) -> bool {
        self.slot.get().is_some()
    }
}

impl fmt::Debug for BackendCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendCache")
            .field("initialized", &self.is_initialized())
            .finish()
    }
}
