//! Backend identity guard for compiled call sites
//!
//! While the engine has a single context, a call site may assume that the
//! backend it saw at compile time is the only one it will ever see and
//! compare by pointer. Once a second context exists the guard is notified
//! and falls back to comparing backend id and toolset.

use crate::assumption::{Assumption, InvalidationListener};
use crate::backend::BackendHandle;
use raya_nfi_spi::NfiBackend;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Cached backend check of one call site
pub struct BackendGuard {
    expected: BackendHandle,
    specialized: AtomicBool,
    deopts: AtomicUsize,
}

impl BackendGuard {
    /// Build a guard for `expected`, specialized on `assumption` if it holds
    pub fn new(assumption: &Assumption, expected: BackendHandle) -> Arc<Self> {
        let guard = Arc::new(Self {
            expected,
            specialized: AtomicBool::new(true),
            deopts: AtomicUsize::new(0),
        });
        assumption.register(&guard);
        guard
    }

    /// Whether the guard still compares by identity
    pub fn is_specialized(&self) -> bool {
        self.specialized.load(Ordering::Acquire)
    }

    /// Times the guard dropped its identity specialization
    pub fn deopt_count(&self) -> usize {
        self.deopts.load(Ordering::Relaxed)
    }

    /// Backend the call site was compiled against
    pub fn expected(&self) -> &BackendHandle {
        &self.expected
    }

    /// Check whether `candidate` is usable by this call site
    pub fn matches(&self, candidate: &Arc<dyn NfiBackend>) -> bool {
        if self.is_specialized() {
            return std::ptr::addr_eq(Arc::as_ptr(candidate), Arc::as_ptr(&self.expected));
        }
        candidate.backend_id() == self.expected.backend_id()
            && Arc::ptr_eq(candidate.tools(), self.expected.tools())
    }
}

impl InvalidationListener for BackendGuard {
    fn on_invalidate(&self, assumption: &str) {
        if self.specialized.swap(false, Ordering::AcqRel) {
            self.deopts.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(assumption, "backend guard deoptimized");
        }
    }
}

impl std::fmt::Debug for BackendGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendGuard")
            .field("specialized", &self.is_specialized())
            .field("deopts", &self.deopt_count())
            .finish()
    }
}
