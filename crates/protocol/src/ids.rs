use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic id source owned by a single compilation.
///
/// Each compilation creates its own generator, so concurrent compilations
/// never share a counter and re-running a compilation reproduces the same ids.
/// The counter is atomic, so a generator may also be shared by reference
/// across threads when callers want globally unique ids.
#[derive(Debug, Default)]
pub struct IdGenerator {
    counter: AtomicU64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start counting after `offset` (useful when ids must not collide with a
    /// previously compiled plan in the same session).
    pub fn starting_at(offset: u64) -> Self {
        Self {
            counter: AtomicU64::new(offset),
        }
    }

    /// Next id in the form `{prefix}-{n}`.
    pub fn next(&self, prefix: &str) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{prefix}-{n}")
    }

    pub fn issued(&self) -> u64 {
        self.counter.load(Ordering::Relaxed)
    }
}
