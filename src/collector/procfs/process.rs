//! Process collector for gathering per-process memory data from `/proc/[pid]/`.

use std::path::Path;

use tracing::warn;

use crate::collector::model::{ProcessEntry, ProcessMemory, ThreadCounters};
use crate::collector::procfs::parser::{
    oom_score_adj_to_adj, parse_oom_value, parse_proc_stat, parse_proc_status,
};
use crate::collector::traits::{FileSystem, ProcessSnapshotProvider};

/// Error type for collection failures.
#[derive(Debug)]
pub enum CollectError {
    /// Process disappeared during collection.
    ProcessGone(u32),
    /// I/O error reading files.
    Io(std::io::Error),
    /// Parse error in file contents.
    Parse(String),
}

impl std::fmt::Display for CollectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CollectError::ProcessGone(pid) => write!(f, "process {} disappeared", pid),
            CollectError::Io(e) => write!(f, "I/O error: {}", e),
            CollectError::Parse(msg) => write!(f, "parse error: {}", msg),
        }
    }
}

impl std::error::Error for CollectError {}

impl From<std::io::Error> for CollectError {
    fn from(e: std::io::Error) -> Self {
        CollectError::Io(e)
    }
}

/// Collects process information from `/proc/[pid]/` files.
pub struct ProcessCollector<F: FileSystem> {
    fs: F,
    proc_path: String,
}

impl<F: FileSystem> ProcessCollector<F> {
    /// Creates a new process collector.
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

    /// Collects information about a single process.
    pub fn collect_process(&self, pid: u32) -> Result<ProcessEntry, CollectError> {
        let proc_dir = format!("{}/{}", self.proc_path, pid);

        // Read /proc/[pid]/stat
        let stat_path = format!("{}/stat", proc_dir);
        let stat_content = self
            .fs
            .read_to_string(Path::new(&stat_path))
            .map_err(|_| CollectError::ProcessGone(pid))?;
        let stat =
            parse_proc_stat(&stat_content).map_err(|e| CollectError::Parse(e.message.clone()))?;

        if stat.is_kernel_thread() {
            return Ok(ProcessEntry {
                pid: stat.pid,
                ppid: stat.ppid,
                kernel_thread: true,
                ..ProcessEntry::default()
            });
        }

        // Read /proc/[pid]/status
        let status_path = format!("{}/status", proc_dir);
        let status_content = self
            .fs
            .read_to_string(Path::new(&status_path))
            .map_err(|_| CollectError::ProcessGone(pid))?;
        let status = parse_proc_status(&status_content)
            .map_err(|e| CollectError::Parse(e.message.clone()))?;

        // Without an oom-adjust the process cannot be placed in the window.
        let oom_adj = self
            .read_oom_adj(&proc_dir)
            .ok_or(CollectError::ProcessGone(pid))?;

        let memory = status.vm_rss.map(|rss| ProcessMemory {
            rss,
            swapped: status.vm_swap.unwrap_or(0),
        });

        Ok(ProcessEntry {
            pid: stat.pid,
            ppid: stat.ppid,
            kernel_thread: false,
            uid: status.uid,
            oom_adj,
            memory,
            threads: self.collect_threads(&proc_dir, &stat_content),
        })
    }

    /// Reads the legacy `oom_adj`, falling back to a converted `oom_score_adj`.
    fn read_oom_adj(&self, proc_dir: &str) -> Option<i32> {
        let read = |name: &str| {
            self.fs
                .read_to_string(Path::new(&format!("{}/{}", proc_dir, name)))
                .ok()
                .and_then(|content| parse_oom_value(&content).ok())
        };
        read("oom_adj")
            .or_else(|| read("oom_score_adj").map(oom_score_adj_to_adj))
    }

    /// Reads fault counters of every thread from `/proc/[pid]/task/[tid]/stat`.
    ///
    /// Upstream kernels do not export per-thread swap counters, so only the
    /// fault fields are filled. Falls back to the process-level stat when the
    /// task directory cannot be listed.
    fn collect_threads(&self, proc_dir: &str, process_stat: &str) -> Vec<ThreadCounters> {
        let from_stat = |content: &str| {
            parse_proc_stat(content).ok().map(|stat| ThreadCounters {
                minor_faults: stat.minflt,
                major_faults: stat.majflt,
                ..ThreadCounters::default()
            })
        };

        let task_dir = format!("{}/task", proc_dir);
        match self.fs.read_dir(Path::new(&task_dir)) {
            Ok(tasks) => tasks
                .iter()
                .filter_map(|task| self.fs.read_to_string(&task.join("stat")).ok())
                .filter_map(|content| from_stat(&content))
                .collect(),
            Err(_) => from_stat(process_stat).into_iter().collect(),
        }
    }

    /// Collects information about all processes, ordered by pid.
    ///
    /// Processes that disappear during collection are silently skipped.
    pub fn collect_all_processes(&self) -> Result<Vec<ProcessEntry>, CollectError> {
        let proc_path = Path::new(&self.proc_path);
        let entries = self.fs.read_dir(proc_path)?;

        let mut pids: Vec<u32> = entries
            .iter()
            .filter_map(|entry| entry.file_name()?.to_str()?.parse().ok())
            .collect();
        pids.sort_unstable();

        let mut processes = Vec::with_capacity(pids.len());
        for pid in pids {
            match self.collect_process(pid) {
                Ok(info) => processes.push(info),
                Err(CollectError::ProcessGone(_)) => continue,
                Err(e) => warn!("failed to collect process {}: {}", pid, e),
            }
        }

        Ok(processes)
    }
}

impl<F: FileSystem> ProcessSnapshotProvider for ProcessCollector<F> {
    fn processes(&self) -> Result<Vec<ProcessEntry>, CollectError> {
        self.collect_all_processes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::MockFs;

    #[test]
    fn test_collect_single_process() {
        let fs = MockFs::typical_system();
        let collector = ProcessCollector::new(fs, "/proc");

        let info = collector.collect_process(1000).unwrap();

        assert_eq!(info.pid, 1000);
        assert_eq!(info.ppid, 600);
        assert_eq!(info.uid, Some(1000));
        assert_eq!(info.oom_adj, -16);
        assert!(!info.kernel_thread);
        assert_eq!(
            info.memory,
            Some(ProcessMemory {
                rss: 204800,
                swapped: 10240,
            })
        );
    }

    #[test]
    fn test_threads_are_listed() {
        let fs = MockFs::typical_system();
        let collector = ProcessCollector::new(fs, "/proc");

        let info = collector.collect_process(1000).unwrap();
        let total: ThreadCounters = info.threads.iter().copied().sum();
        assert_eq!(info.threads.len(), 2);
        assert_eq!(total.minor_faults, 3000);
        assert_eq!(total.major_faults, 30);
        assert_eq!(total.swap_in, 0);
    }

    #[test]
    fn test_thread_fallback_without_task_dir() {
        let fs = MockFs::typical_system();
        let collector = ProcessCollector::new(fs, "/proc");

        // 2001 has no task directory in the scenario.
        let info = collector.collect_process(2001).unwrap();
        assert_eq!(info.threads.len(), 1);
        assert_eq!(info.threads[0].minor_faults, 700);
    }

    #[test]
    fn test_oom_score_adj_fallback() {
        let fs = MockFs::typical_system();
        let collector = ProcessCollector::new(fs, "/proc");

        // 2001 only exposes oom_score_adj = 529.
        let info = collector.collect_process(2001).unwrap();
        assert_eq!(info.oom_adj, 8);
    }

    #[test]
    fn test_process_without_oom_files_skipped() {
        let mut fs = MockFs::typical_system();
        fs.add_process(
            3000,
            "3000 (loader) S 600 3000 0 0 -1 4194624 10 0 1 0",
            "Name:\tloader\nUid:\t10070\t10070\t10070\t10070\nVmRSS:\t     100 kB\n",
        );

        let collector = ProcessCollector::new(fs, "/proc");
        assert!(matches!(
            collector.collect_process(3000),
            Err(CollectError::ProcessGone(3000))
        ));

        let processes = collector.collect_all_processes().unwrap();
        assert!(processes.iter().all(|p| p.pid != 3000));
        assert_eq!(processes.len(), 5);
    }

    #[test]
    fn test_kernel_thread_detected() {
        let fs = MockFs::typical_system();
        let collector = ProcessCollector::new(fs, "/proc");

        let info = collector.collect_process(2).unwrap();
        assert!(info.kernel_thread);
        assert_eq!(info.memory, None);
        assert!(info.threads.is_empty());
    }

    #[test]
    fn test_collect_all_processes_sorted() {
        let fs = MockFs::typical_system();
        let collector = ProcessCollector::new(fs, "/proc");

        let processes = collector.processes().unwrap();
        let pids: Vec<u32> = processes.iter().map(|p| p.pid).collect();
        assert_eq!(pids, vec![1, 2, 600, 1000, 2001]);
    }

    #[test]
    fn test_collect_process_gone() {
        let mut fs = MockFs::new();
        fs.add_dir("/proc/9999"); // Directory exists but no files

        let collector = ProcessCollector::new(fs, "/proc");
        let result = collector.collect_process(9999);

        assert!(matches!(result, Err(CollectError::ProcessGone(9999))));
    }

    #[test]
    fn test_gone_process_skipped_in_snapshot() {
        let mut fs = MockFs::typical_system();
        fs.add_dir("/proc/9999");

        let collector = ProcessCollector::new(fs, "/proc");
        let processes = collector.collect_all_processes().unwrap();
        assert!(processes.iter().all(|p| p.pid != 9999));
        assert_eq!(processes.len(), 5);
    }
}
