//! Global atomic counters for guard observability.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (e.g. at the end of a guard pass).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lock-free atomic counters.
pub struct Metrics {
    files_validated: AtomicU64,
    files_invalid: AtomicU64,
    repairs_attempted: AtomicU64,
    repairs_succeeded: AtomicU64,
    placeholders_synthesized: AtomicU64,
    channel_failures: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            files_validated: AtomicU64::new(0),
            files_invalid: AtomicU64::new(0),
            repairs_attempted: AtomicU64::new(0),
            repairs_succeeded: AtomicU64::new(0),
            placeholders_synthesized: AtomicU64::new(0),
            channel_failures: AtomicU64::new(0),
        }
    }

    /// Increment the count of files validated.
    pub fn inc_files_validated(&self) {
        self.files_validated.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "files_validated", "counter incremented");
    }

    /// Increment the count of files found invalid.
    pub fn inc_files_invalid(&self) {
        self.files_invalid.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "files_invalid", "counter incremented");
    }

    /// Increment the count of repair calls that read a file.
    pub fn inc_repairs_attempted(&self) {
        self.repairs_attempted.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "repairs_attempted", "counter incremented");
    }

    /// Increment the count of repairs written back.
    pub fn inc_repairs_succeeded(&self) {
        self.repairs_succeeded.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "repairs_succeeded", "counter incremented");
    }

    /// Increment the count of emergency placeholders written.
    pub fn inc_placeholders(&self) {
        self.placeholders_synthesized.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "placeholders_synthesized", "counter incremented");
    }

    /// Increment the count of failed channel deliveries.
    pub fn inc_channel_failures(&self) {
        self.channel_failures.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "channel_failures", "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    ///
    /// Call this once per guard pass rather than on every increment.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            files_validated = self.files_validated(),
            files_invalid = self.files_invalid(),
            repairs_attempted = self.repairs_attempted(),
            repairs_succeeded = self.repairs_succeeded(),
            placeholders_synthesized = self.placeholders_synthesized(),
            channel_failures = self.channel_failures(),
        );
    }

    /// Read the current files-validated count.
    pub fn files_validated(&self) -> u64 {
        self.files_validated.load(Ordering::Relaxed)
    }

    /// Read the current files-invalid count.
    pub fn files_invalid(&self) -> u64 {
        self.files_invalid.load(Ordering::Relaxed)
    }

    /// Read the current repairs-attempted count.
    pub fn repairs_attempted(&self) -> u64 {
        self.repairs_attempted.load(Ordering::Relaxed)
    }

    /// Read the current repairs-succeeded count.
    pub fn repairs_succeeded(&self) -> u64 {
        self.repairs_succeeded.load(Ordering::Relaxed)
    }

    /// Read the current placeholder count.
    pub fn placeholders_synthesized(&self) -> u64 {
        self.placeholders_synthesized.load(Ordering::Relaxed)
    }

    /// Read the current channel-failure count.
    pub fn channel_failures(&self) -> u64 {
        self.channel_failures.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.files_validated.store(0, Ordering::Relaxed);
        self.files_invalid.store(0, Ordering::Relaxed);
        self.repairs_attempted.store(0, Ordering::Relaxed);
        self.repairs_succeeded.store(0, Ordering::Relaxed);
        self.placeholders_synthesized.store(0, Ordering::Relaxed);
        self.channel_failures.store(0, Ordering::Relaxed);
    }
}
