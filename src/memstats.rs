//! Heap allocation counters backing the B/op and allocs/op columns.
//!
//! Numbers come from `stats_alloc::INSTRUMENTED_SYSTEM`, which only moves when
//! it is installed as the `#[global_allocator]` (the `hashbench` binary does).

use stats_alloc::{Region, Stats, INSTRUMENTED_SYSTEM};
use std::alloc::System;

/// Allocation totals over some window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AllocCounters {
    /// Fresh allocations plus reallocations.
    pub allocations: u64,
    pub bytes: u64,
}

impl AllocCounters {
    pub fn add(&mut self, other: AllocCounters) {
        self.allocations += other.allocations;
        self.bytes += other.bytes;
    }
}

impl From<Stats> for AllocCounters {
    fn from(stats: Stats) -> Self {
        AllocCounters {
            allocations: (stats.allocations + stats.reallocations) as u64,
            bytes: stats.bytes_allocated as u64,
        }
    }
}

/// Whether the instrumented allocator is the global allocator of this process.
pub fn is_installed() -> bool {
    INSTRUMENTED_SYSTEM.stats().allocations > 0
}

/// Totals since process start, or `None` when the instrumented allocator is not in use.
pub fn counters() -> Option<AllocCounters> {
    if !is_installed() {
        return None;
    }
    Some(INSTRUMENTED_SYSTEM.stats().into())
}

/// Starts a measurement window; `change()` on it yields what was allocated since.
pub fn region() -> Region<'static, System> {
    Region::new(&INSTRUMENTED_SYSTEM)
}
