//! Abstractions over the data sources the sampler reads.
//!
//! The `FileSystem` trait lets the procfs providers work against the real
//! `/proc` and `/sys` on Linux or against `MockFs` in tests. The provider
//! traits are what the sampler actually depends on; any source of memory,
//! vm event or process data can stand behind them.

use std::io;
use std::path::{Path, PathBuf};

use crate::collector::model::{MemoryStats, ProcessEntry, VmEventCounters};
use crate::collector::procfs::CollectError;

/// Abstraction for filesystem operations.
pub trait FileSystem: Send + Sync {
    /// Reads the entire contents of a file as a string.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Checks if a path exists.
    fn exists(&self, path: &Path) -> bool;

    /// Lists entries in a directory.
    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>>;
}

/// Real filesystem implementation that delegates to `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFs;

impl RealFs {
    /// Creates a new `RealFs` instance.
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for RealFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let entries = std::fs::read_dir(path)?;
        let mut paths = Vec::new();
        for entry in entries {
            paths.push(entry?.path());
        }
        Ok(paths)
    }
}

/// Source of global memory statistics.
pub trait MemoryStatsProvider: Send {
    fn memory_stats(&self) -> Result<MemoryStats, CollectError>;
}

/// Source of GPU memory usage, in kilobytes. Zero when unsupported.
pub trait GpuUsageProvider: Send {
    fn gpu_usage_kb(&self) -> u64;
}

/// Source of compressed-swap pool usage, in kilobytes. Zero when unsupported.
pub trait CompressedSwapProvider: Send {
    fn compressed_swap_kb(&self) -> u64;
}

/// Source of vm event counters.
pub trait VmEventProvider: Send {
    /// Counters per online CPU. Sources that only expose a system-wide total
    /// return a single entry.
    fn per_cpu_events(&self) -> Result<Vec<VmEventCounters>, CollectError>;
}

/// Source of per-process snapshots.
pub trait ProcessSnapshotProvider: Send {
    /// Returns every live process. Each entry is internally consistent.
    fn processes(&self) -> Result<Vec<ProcessEntry>, CollectError>;
}

/// GPU provider for platforms without a usage report.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoGpuUsage;

impl GpuUsageProvider for NoGpuUsage {
    fn gpu_usage_kb(&self) -> u64 {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_real_fs_read_to_string() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meminfo");
        fs::write(&path, "MemFree: 42 kB\n").unwrap();

        let real = RealFs::new();
        assert_eq!(real.read_to_string(&path).unwrap(), "MemFree: 42 kB\n");
    }

    #[test]
    fn test_real_fs_exists() {
        let dir = tempfile::tempdir().unwrap();
        let real = RealFs::new();
        assert!(real.exists(dir.path()));
        assert!(!real.exists(&dir.path().join("missing")));
    }

    #[test]
    fn test_real_fs_read_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("1")).unwrap();
        fs::create_dir(dir.path().join("42")).unwrap();
        fs::write(dir.path().join("vmstat"), "").unwrap();

        let mut names: Vec<String> = RealFs::new()
            .read_dir(dir.path())
            .unwrap()
            .iter()
            .filter_map(|p| p.file_name()?.to_str().map(String::from))
            .collect();
        names.sort();
        assert_eq!(names, vec!["1", "42", "vmstat"]);
    }

    #[test]
    fn test_no_gpu_usage() {
        assert_eq!(NoGpuUsage.gpu_usage_kb(), 0);
    }
}
