//! System collector for global memory and vm event data from `/proc/` and `/sys/`.

use std::path::Path;

use crate::collector::model::{MemoryStats, VmEventCounters};
use crate::collector::procfs::parser::{parse_meminfo, parse_vmstat, parse_zram_mm_stat};
use crate::collector::procfs::process::CollectError;
use crate::collector::traits::{
    CompressedSwapProvider, FileSystem, MemoryStatsProvider, VmEventProvider,
};

/// Collects system-wide metrics from `/proc/`.
pub struct SystemCollector<F: FileSystem> {
    fs: F,
    proc_path: String,
}

impl<F: FileSystem> SystemCollector<F> {
    /// Creates a new system collector.
    ///
    /// # Arguments
    /// * `fs` - Filesystem implementation (real or mock)
    /// * `proc_path` - Base path to proc filesystem (usually "/proc")
    pub fn new(fs: F, proc_path: impl Into<String>) -> Self {
        Self {
            fs,
            proc_path: proc_path.into(),
        }
    }
}

impl<F: FileSystem> MemoryStatsProvider for SystemCollector<F> {
    /// Reads `/proc/meminfo`.
    fn memory_stats(&self) -> Result<MemoryStats, CollectError> {
        let path = format!("{}/meminfo", self.proc_path);
        let content = self.fs.read_to_string(Path::new(&path))?;
        let info = parse_meminfo(&content).map_err(|e| CollectError::Parse(e.message))?;

        Ok(MemoryStats {
            free: info.mem_free,
            swap_free: info.swap_free,
            cached: info.cached,
            locked: info.mlocked,
        })
    }
}

impl<F: FileSystem> VmEventProvider for SystemCollector<F> {
    /// Reads `/proc/vmstat`, which the kernel already sums over all CPUs.
    ///
    /// Memory-pressure faults come from the vendor `pgfmfault` counter when
    /// present and fall back to `pgmajfault`.
    fn per_cpu_events(&self) -> Result<Vec<VmEventCounters>, CollectError> {
        let path = format!("{}/vmstat", self.proc_path);
        let content = self.fs.read_to_string(Path::new(&path))?;
        let info = parse_vmstat(&content).map_err(|e| CollectError::Parse(e.message))?;

        Ok(vec![VmEventCounters {
            swap_in: info.pswpin,
            swap_out: info.pswpout,
            pressure_faults: info.pgfmfault.unwrap_or(info.pgmajfault),
        }])
    }
}

/// Compressed-swap usage of a zram device.
pub struct ZramUsage<F: FileSystem> {
    fs: F,
    mm_stat_path: String,
}

impl<F: FileSystem> ZramUsage<F> {
    /// # Arguments
    /// * `fs` - Filesystem implementation (real or mock)
    /// * `sys_path` - Base path to sysfs (usually "/sys")
    /// * `device` - zram device name, e.g. "zram0"
    pub fn new(fs: F, sys_path: &str, device: &str) -> Self {
        Self {
            fs,
            mm_stat_path: format!("{}/block/{}/mm_stat", sys_path, device),
        }
    }
}

impl<F: FileSystem> CompressedSwapProvider for ZramUsage<F> {
    fn compressed_swap_kb(&self) -> u64 {
        // An uninitialised or absent device reports nothing.
        self.fs
            .read_to_string(Path::new(&self.mm_stat_path))
            .ok()
            .and_then(|content| parse_zram_mm_stat(&content).ok())
            .map(|bytes| bytes >> 10)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::MockFs;

    #[test]
    fn test_collect_memory_stats() {
        let fs = MockFs::typical_system();
        let collector = SystemCollector::new(fs, "/proc");

        let stats = collector.memory_stats().unwrap();
        assert_eq!(stats.free, 812000);
        assert_eq!(stats.swap_free, 900000);
        assert_eq!(stats.cached, 1048000);
        assert_eq!(stats.locked, 2048);
    }

    #[test]
    fn test_memory_stats_missing_file() {
        let collector = SystemCollector::new(MockFs::new(), "/proc");
        assert!(matches!(
            collector.memory_stats(),
            Err(CollectError::Io(_))
        ));
    }

    #[test]
    fn test_vm_events_fall_back_to_major_faults() {
        let fs = MockFs::typical_system();
        let collector = SystemCollector::new(fs, "/proc");

        let events = collector.per_cpu_events().unwrap();
        assert_eq!(
            events,
            vec![VmEventCounters {
                swap_in: 100,
                swap_out: 200,
                pressure_faults: 1234,
            }]
        );
    }

    #[test]
    fn test_vm_events_prefer_vendor_counter() {
        let mut fs = MockFs::new();
        fs.add_file("/proc/vmstat", "pswpin 1\npswpout 2\npgmajfault 3\npgfmfault 4\n");
        let collector = SystemCollector::new(fs, "/proc");

        let events = collector.per_cpu_events().unwrap();
        assert_eq!(events[0].pressure_faults, 4);
    }

    #[test]
    fn test_zram_usage() {
        let fs = MockFs::typical_system();
        let zram = ZramUsage::new(fs, "/sys", "zram0");
        assert_eq!(zram.compressed_swap_kb(), 1000);

        let absent = ZramUsage::new(MockFs::new(), "/sys", "zram0");
        assert_eq!(absent.compressed_swap_kb(), 0);
    }
}
