//! Data handed from providers to the sampler.
//!
//! All sizes are in kilobytes, all counters are cumulative event counts.

use std::iter::Sum;
use std::ops::Add;

/// Global memory statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryStats {
    pub free: u64,
    pub swap_free: u64,
    /// Page cache excluding swap cache.
    pub cached: u64,
    /// Mlocked memory.
    pub locked: u64,
}

/// Vm event counters of one CPU (or an aggregate of several).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VmEventCounters {
    pub swap_in: u64,
    pub swap_out: u64,
    /// Faults taken because of memory pressure.
    pub pressure_faults: u64,
}

impl Add for VmEventCounters {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            swap_in: self.swap_in.wrapping_add(other.swap_in),
            swap_out: self.swap_out.wrapping_add(other.swap_out),
            pressure_faults: self.pressure_faults.wrapping_add(other.pressure_faults),
        }
    }
}

impl Sum for VmEventCounters {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

/// Per-thread fault and swap counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ThreadCounters {
    pub swap_in: u64,
    pub swap_out: u64,
    pub pressure_faults: u64,
    pub minor_faults: u64,
    pub major_faults: u64,
}

impl Add for ThreadCounters {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            swap_in: self.swap_in.wrapping_add(other.swap_in),
            swap_out: self.swap_out.wrapping_add(other.swap_out),
            pressure_faults: self.pressure_faults.wrapping_add(other.pressure_faults),
            minor_faults: self.minor_faults.wrapping_add(other.minor_faults),
            major_faults: self.major_faults.wrapping_add(other.major_faults),
        }
    }
}

impl Sum for ThreadCounters {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

/// Address-space usage of a process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessMemory {
    pub rss: u64,
    pub swapped: u64,
}

/// One live process as seen by a [`ProcessSnapshotProvider`].
///
/// The fields of one entry are read together and are consistent with each
/// other; the set of entries may change between snapshots.
///
/// [`ProcessSnapshotProvider`]: super::traits::ProcessSnapshotProvider
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessEntry {
    pub pid: u32,
    pub ppid: u32,
    /// Kernel thread with no user address space.
    pub kernel_thread: bool,
    /// Real uid, `None` if the credential could not be read.
    pub uid: Option<u32>,
    pub oom_adj: i32,
    /// `None` if the address space could not be inspected.
    pub memory: Option<ProcessMemory>,
    pub threads: Vec<ThreadCounters>,
}
