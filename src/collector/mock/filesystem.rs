//! In-memory mock filesystem for testing collectors without real `/proc`.
//!
//! This module provides `MockFs` which simulates a filesystem in memory,
//! allowing tests to run on macOS and in CI environments without Linux.

use crate::collector::traits::FileSystem;
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};

/// In-memory filesystem for testing.
///
/// Stores files and directories in memory, allowing tests to simulate
/// `/proc` and `/sys` states without needing actual Linux access.
#[derive(Debug, Clone, Default)]
pub struct MockFs {
    /// Map from path to file contents.
    files: HashMap<PathBuf, String>,
    /// Set of directories (for read_dir support).
    directories: HashSet<PathBuf>,
}

impl MockFs {
    /// Creates a new empty mock filesystem.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file with the given content.
    ///
    /// Parent directories are automatically created.
    pub fn add_file(&mut self, path: impl AsRef<Path>, content: impl Into<String>) {
        let path = path.as_ref().to_path_buf();
        self.add_parents(&path);
        self.files.insert(path, content.into());
    }

    /// Adds an empty directory.
    pub fn add_dir(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref().to_path_buf();
        self.add_parents(&path);
        self.directories.insert(path);
    }

    fn add_parents(&mut self, path: &Path) {
        let mut parent = path.parent();
        while let Some(p) = parent {
            if !p.as_os_str().is_empty() {
                self.directories.insert(p.to_path_buf());
            }
            parent = p.parent();
        }
    }

    /// Adds a process with its `/proc/[pid]/stat` and `/proc/[pid]/status`.
    ///
    /// OOM values and threads are added separately with
    /// [`add_oom_adj`](Self::add_oom_adj), [`add_oom_score_adj`](Self::add_oom_score_adj)
    /// and [`add_thread`](Self::add_thread).
    pub fn add_process(&mut self, pid: u32, stat: &str, status: &str) {
        let base = PathBuf::from(format!("/proc/{}", pid));
        self.add_dir(&base);
        self.add_file(base.join("stat"), stat);
        self.add_file(base.join("status"), status);
    }

    /// Adds `/proc/[pid]/oom_adj`.
    pub fn add_oom_adj(&mut self, pid: u32, adj: i32) {
        self.add_file(format!("/proc/{}/oom_adj", pid), format!("{}\n", adj));
    }

    /// Adds `/proc/[pid]/oom_score_adj`.
    pub fn add_oom_score_adj(&mut self, pid: u32, score_adj: i32) {
        self.add_file(
            format!("/proc/{}/oom_score_adj", pid),
            format!("{}\n", score_adj),
        );
    }

    /// Adds `/proc/[pid]/task/[tid]/stat`.
    pub fn add_thread(&mut self, pid: u32, tid: u32, stat: &str) {
        self.add_file(format!("/proc/{}/task/{}/stat", pid, tid), stat);
    }
}

impl FileSystem for MockFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.files.get(path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("file not found: {:?}", path),
            )
        })
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path) || self.directories.contains(path)
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        if !self.directories.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("directory not found: {:?}", path),
            ));
        }

        let mut entries = HashSet::new();

        // Direct children only
        for file_path in self.files.keys() {
            if file_path.parent().is_some_and(|parent| parent == path) {
                entries.insert(file_path.clone());
            }
        }

        for dir_path in &self.directories {
            if dir_path.parent().is_some_and(|parent| parent == path) && dir_path != path {
                entries.insert(dir_path.clone());
            }
        }

        Ok(entries.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_fs_add_file() {
        let mut fs = MockFs::new();
        fs.add_file("/proc/meminfo", "MemFree: 16384 kB\n");

        assert!(fs.exists(Path::new("/proc/meminfo")));
        assert!(fs.exists(Path::new("/proc")));

        let content = fs.read_to_string(Path::new("/proc/meminfo")).unwrap();
        assert_eq!(content, "MemFree: 16384 kB\n");
    }

    #[test]
    fn test_mock_fs_read_dir() {
        let mut fs = MockFs::new();
        fs.add_file("/proc/1/stat", "stat content");
        fs.add_file("/proc/1/status", "status content");
        fs.add_file("/proc/2/stat", "stat content 2");

        let proc_entries = fs.read_dir(Path::new("/proc")).unwrap();
        assert_eq!(proc_entries.len(), 2); // /proc/1 and /proc/2

        let proc1_entries = fs.read_dir(Path::new("/proc/1")).unwrap();
        assert_eq!(proc1_entries.len(), 2); // stat and status
    }

    #[test]
    fn test_mock_fs_add_process_with_threads() {
        let mut fs = MockFs::new();
        fs.add_process(
            1234,
            "1234 (app) S 600 1234 0 0 -1 4194624 100 0 2 0 10 5 0 0 20 0 2 0 12345",
            "Name:\tapp\nPid:\t1234\nPPid:\t600\nUid:\t10010\t10010\t10010\t10010\n",
        );
        fs.add_oom_adj(1234, 9);
        fs.add_thread(1234, 1234, "1234 (app) S 600 1234 0 0 -1 4194624 60 0 1 0");
        fs.add_thread(1234, 1240, "1240 (worker) S 600 1234 0 0 -1 4194624 40 0 1 0");

        assert!(fs.exists(Path::new("/proc/1234/stat")));
        assert!(fs.exists(Path::new("/proc/1234/status")));
        assert_eq!(
            fs.read_to_string(Path::new("/proc/1234/oom_adj")).unwrap(),
            "9\n"
        );
        assert_eq!(fs.read_dir(Path::new("/proc/1234/task")).unwrap().len(), 2);
    }

    #[test]
    fn test_mock_fs_not_found() {
        let fs = MockFs::new();
        let result = fs.read_to_string(Path::new("/nonexistent"));
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::NotFound);
    }
}
