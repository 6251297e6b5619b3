//! Host environment handed to a language when one of its contexts is created
//!
//! An `Env` carries the options the embedder configured for the context,
//! whether the context is being built during ahead-of-time
//! pre-initialization, and the services languages publish to each other.

use crate::backend::NfiBackendFactory;
use crate::error::{SpiError, SpiResult};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Unique identifier for an Env
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EnvId(u64);

impl EnvId {
    fn next() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        EnvId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

struct EnvInner {
    id: EnvId,
    options: FxHashMap<String, String>,
    preinitialization: bool,
    factories: RwLock<FxHashMap<String, Arc<dyn NfiBackendFactory>>>,
}

/// Shared handle to a host environment. Cloning is cheap and keeps identity.
#[derive(Clone)]
pub struct Env {
    inner: Arc<EnvInner>,
}

impl Env {
    /// Create an environment with no options
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Start building an environment
    pub fn builder() -> EnvBuilder {
        EnvBuilder {
            options: FxHashMap::default(),
            preinitialization: false,
        }
    }

    /// Get the environment ID
    pub fn id(&self) -> EnvId {
        self.inner.id
    }

    /// Look up a single option value
    pub fn option(&self, key: &str) -> Option<&str> {
        self.inner.options.get(key).map(String::as_str)
    }

    /// Iterate over every option
    pub fn options(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner
            .options
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Whether this environment belongs to an ahead-of-time pre-initialization run
    pub fn is_preinitialization(&self) -> bool {
        self.inner.preinitialization
    }

    /// Publish a backend factory under its backend id.
    ///
    /// Registering the same factory instance again is a no-op. Registering a
    /// different factory under an id that is already taken is rejected.
    pub fn register_backend_factory(&self, factory: Arc<dyn NfiBackendFactory>) -> SpiResult<()> {
        let mut factories = self.inner.factories.write();
        let backend_id = factory.backend_id().to_string();
        if let Some(existing) = factories.get(&backend_id) {
            if Arc::ptr_eq(existing, &factory) {
                return Ok(());
            }
            return Err(SpiError::ConflictingFactory {
                backend_id,
                env: self.inner.id.as_u64(),
            });
        }
        factories.insert(backend_id, factory);
        Ok(())
    }

    /// Find the factory registered for a backend id
    pub fn lookup_backend_factory(&self, backend_id: &str) -> Option<Arc<dyn NfiBackendFactory>> {
        self.inner.factories.read().get(backend_id).cloned()
    }

    /// Number of registered backend factories
    pub fn backend_factory_count(&self) -> usize {
        self.inner.factories.read().len()
    }

    /// Whether two handles refer to the same environment
    pub fn same_env(&self, other: &Env) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for Env {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Env")
            .field("id", &self.inner.id)
            .field("options", &self.inner.options.len())
            .field("preinitialization", &self.inner.preinitialization)
            .field("factories", &self.backend_factory_count())
            .finish()
    }
}

/// Builder for Env
pub struct EnvBuilder {
    options: FxHashMap<String, String>,
    preinitialization: bool,
}

impl EnvBuilder {
    /// Set an option
    pub fn option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Mark the environment as an ahead-of-time pre-initialization environment
    pub fn preinitialization(mut self, preinitialization: bool) -> Self {
        self.preinitialization = preinitialization;
        self
    }

    /// Build the environment
    pub fn build(self) -> Env {
        Env {
            inner: Arc::new(EnvInner {
                id: EnvId::next(),
                options: self.options,
                preinitialization: self.preinitialization,
                factories: RwLock::new(FxHashMap::default()),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{NfiBackend, NfiBackendTools};

    struct StubFactory(&'static str);

    impl NfiBackendFactory for StubFactory {
        fn backend_id(&self) -> &str {
            self.0
        }

        fn create_backend(&self, _tools: Arc<dyn NfiBackendTools>) -> Arc<dyn NfiBackend> {
            unreachable!("not used by env tests")
        }
    }

    #[test]
    fn test_env_id_uniqueness() {
        let a = Env::new();
        let b = Env::new();
        assert_ne!(a.id(), b.id());
        assert!(a.same_env(&a.clone()));
        assert!(!a.same_env(&b));
    }

    #[test]
    fn test_env_options() {
        let env = Env::builder()
            .option("nfi.default_library", "libc.so.6")
            .preinitialization(true)
            .build();
        assert_eq!(env.option("nfi.default_library"), Some("libc.so.6"));
        assert_eq!(env.option("missing"), None);
        assert!(env.is_preinitialization());
        assert_eq!(env.options().count(), 1);
    }

    #[test]
    fn test_register_same_factory_twice() {
        let env = Env::new();
        let factory: Arc<dyn NfiBackendFactory> = Arc::new(StubFactory("native"));
        env.register_backend_factory(factory.clone()).unwrap();
        env.register_backend_factory(factory.clone()).unwrap();
        assert_eq!(env.backend_factory_count(), 1);

        let found = env.lookup_backend_factory("native").unwrap();
        assert!(Arc::ptr_eq(&found, &factory));
    }

    #[test]
    fn test_register_conflicting_factory() {
        let env = Env::new();
        env.register_backend_factory(Arc::new(StubFactory("native")))
            .unwrap();
        let err = env
            .register_backend_factory(Arc::new(StubFactory("native")))
            .unwrap_err();
        assert_eq!(
            err,
            SpiError::ConflictingFactory {
                backend_id: "native".to_string(),
                env: env.id().as_u64(),
            }
        );
        assert!(env.lookup_backend_factory("llvm").is_none());
    }
}
