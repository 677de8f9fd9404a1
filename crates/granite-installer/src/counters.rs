//! Installer-wide progress counters.
//!
//! One instance per resource kind (assets, libraries), owned by
//! `InstallerState`. Never a process singleton.

use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Default)]
pub struct Counters {
    total: AtomicUsize,
    installed: AtomicUsize,
    failed: AtomicUsize,
    retried: AtomicUsize,
}

impl Counters {
    pub fn add_total(&self, n: usize) -> usize {
        self.total.fetch_add(n, Ordering::SeqCst) + n
    }

    pub fn mark_installed(&self) {
        self.installed.fetch_add(1, Ordering::SeqCst);
    }

    pub fn mark_failed(&self) {
        self.failed.fetch_add(1, Ordering::SeqCst);
    }

    /// Increments the retry count and returns the new value, so callers can
    /// use it to build a unique id for the resubmitted task without a
    /// separate read racing another caller's increment.
    pub fn mark_retried(&self) -> usize {
        self.retried.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn total(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }

    pub fn installed(&self) -> usize {
        self.installed.load(Ordering::SeqCst)
    }

    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }

    pub fn retried(&self) -> usize {
        self.retried.load(Ordering::SeqCst)
    }

    /// Sum of installed and failed: the quantity the progress sampler and
    /// batch throttle both watch.
    pub fn completed(&self) -> usize {
        self.installed() + self.failed()
    }
}
