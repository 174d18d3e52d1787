//! In-memory providers with fixed values.

use crate::collector::model::{MemoryStats, ProcessEntry, VmEventCounters};
use crate::collector::procfs::CollectError;
use crate::collector::traits::{
    CompressedSwapProvider, GpuUsageProvider, MemoryStatsProvider, ProcessSnapshotProvider,
    VmEventProvider,
};

/// Returns the same data on every query. Implements every provider trait.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    pub memory: MemoryStats,
    pub gpu_kb: u64,
    pub compressed_swap_kb: u64,
    pub per_cpu: Vec<VmEventCounters>,
    pub processes: Vec<ProcessEntry>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_memory(mut self, memory: MemoryStats) -> Self {
        self.memory = memory;
        self
    }

    pub fn with_gpu(mut self, kb: u64) -> Self {
        self.gpu_kb = kb;
        self
    }

    pub fn with_compressed_swap(mut self, kb: u64) -> Self {
        self.compressed_swap_kb = kb;
        self
    }

    pub fn with_cpu(mut self, counters: VmEventCounters) -> Self {
        self.per_cpu.push(counters);
        self
    }

    pub fn with_process(mut self, entry: ProcessEntry) -> Self {
        self.processes.push(entry);
        self
    }
}

impl MemoryStatsProvider for StaticSource {
    fn memory_stats(&self) -> Result<MemoryStats, CollectError> {
        Ok(self.memory)
    }
}

impl GpuUsageProvider for StaticSource {
    fn gpu_usage_kb(&self) -> u64 {
        self.gpu_kb
    }
}

impl CompressedSwapProvider for StaticSource {
    fn compressed_swap_kb(&self) -> u64 {
        self.compressed_swap_kb
    }
}

impl VmEventProvider for StaticSource {
    fn per_cpu_events(&self) -> Result<Vec<VmEventCounters>, CollectError> {
        Ok(self.per_cpu.clone())
    }
}

impl ProcessSnapshotProvider for StaticSource {
    fn processes(&self) -> Result<Vec<ProcessEntry>, CollectError> {
        Ok(self.processes.clone())
    }
}

/// Fails every fallible query, reports zero for the infallible ones.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingSource;

impl MemoryStatsProvider for FailingSource {
    fn memory_stats(&self) -> Result<MemoryStats, CollectError> {
        Err(CollectError::Parse("meminfo unavailable".into()))
    }
}

impl GpuUsageProvider for FailingSource {
    fn gpu_usage_kb(&self) -> u64 {
        0
    }
}

impl CompressedSwapProvider for FailingSource {
    fn compressed_swap_kb(&self) -> u64 {
        0
    }
}

impl VmEventProvider for FailingSource {
    fn per_cpu_events(&self) -> Result<Vec<VmEventCounters>, CollectError> {
        Err(CollectError::Parse("vmstat unavailable".into()))
    }
}

impl ProcessSnapshotProvider for FailingSource {
    fn processes(&self) -> Result<Vec<ProcessEntry>, CollectError> {
        Err(CollectError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "no process table",
        )))
    }
}
