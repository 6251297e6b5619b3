//! Invalidatable speculation flags
//!
//! An `Assumption` starts valid and can be invalidated exactly once. Code
//! that specialized itself on the assumption registers as a dependent and
//! is told about the invalidation as soon as it happens, instead of having
//! to re-read the flag before every use.

use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

/// Receives the invalidation broadcast of an assumption
pub trait InvalidationListener: Send + Sync {
    /// Called once, on the thread that invalidated `assumption`
    fn on_invalidate(&self, assumption: &str);
}

/// One-way `Valid → Invalidated` flag with dependent notification
pub struct Assumption {
    name: &'static str,
    valid: AtomicBool,
    /// Held weakly so discarded compiled code can be freed
    dependents: Mutex<Vec<Weak<dyn InvalidationListener>>>,
}

impl Assumption {
    /// Create a valid assumption
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            valid: AtomicBool::new(true),
            dependents: Mutex::new(Vec::new()),
        }
    }

    /// Name used in logs and broadcasts
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Check whether the assumption still holds
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.valid.load(Ordering::Acquire)
    }

    /// Register code that depends on this assumption.
    ///
    /// Returns `true` if the assumption was valid at registration time. If it
    /// was already invalidated the dependent is notified before returning.
    pub fn register<L: InvalidationListener + 'static>(&self, dependent: &Arc<L>) -> bool {
        let mut dependents = self.dependents.lock();
        if self.is_valid() {
            dependents.retain(|d| d.strong_count() > 0);
            let weak = Arc::downgrade(dependent);
            dependents.push(weak as Weak<dyn InvalidationListener>);
            return true;
        }
        drop(dependents);
        dependent.on_invalidate(self.name);
        false
    }

    /// Invalidate and notify every live dependent.
    ///
    /// Returns `true` only for the call that performed the transition.
    pub fn invalidate(&self) -> bool {
        if self
            .valid
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        // The flag flips before the lock is taken; `register` re-checks it
        // under the lock, so no dependent can slip in after the drain.
        let dependents = std::mem::take(&mut *self.dependents.lock());
        tracing::info!(
            assumption = self.name,
            dependents = dependents.len(),
            "assumption invalidated"
        );
        for dependent in dependents.iter().filter_map(Weak::upgrade) {
            dependent.on_invalidate(self.name);
        }
        true
    }

    /// Number of registered dependents that are still alive
    pub fn dependent_count(&self) -> usize {
        self.dependents
            .lock()
            .iter()
            .filter(|d| d.strong_count() > 0)
            .count()
    }
}

impl fmt::Debug for Assumption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Assumption")
            .field("name", &self.name)
            .field("valid", &self.is_valid())
            .finish()
    }
}
