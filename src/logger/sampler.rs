//! Collects one record's worth of data and hands it to a [`RecordWriter`].

use std::time::Instant;

use tracing::{trace, warn};

use crate::collector::model::{MemoryStats, ProcessEntry, ThreadCounters, VmEventCounters};
use crate::collector::procfs::{ProcessCollector, SystemCollector, ZramUsage};
use crate::collector::traits::{
    CompressedSwapProvider, FileSystem, GpuUsageProvider, MemoryStatsProvider, NoGpuUsage,
    ProcessSnapshotProvider, VmEventProvider,
};
use crate::filter::{
    FilterConfig, MemoryFields, OOM_ADJ_MOST_PROTECTED, ProcessFields, VmEventFields,
};
use crate::format::encode_signed;
use crate::logger::{RecordWriter, TriggerCause};
use crate::storage::{SENTINEL, Word};

/// Uid of the superuser.
pub const ROOT_UID: u32 = 0;
/// Uid the system server runs as.
pub const SYSTEM_UID: u32 = 1000;
/// Pid of init.
pub const INIT_PID: u32 = 1;

/// Largest value a data word may carry.
const MAX_DATA_WORD: Word = SENTINEL - 1;

/// Wall-clock time of a sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timestamp {
    pub seconds: u64,
    /// 0..=999
    pub millis: u32,
}

/// Source of sample timestamps.
pub trait Clock: Send {
    fn now(&self) -> Timestamp;
}

/// Current UTC time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let now = chrono::Utc::now();
        Timestamp {
            seconds: now.timestamp().max(0) as u64,
            millis: now.timestamp_subsec_millis().min(999),
        }
    }
}

/// The data sources a [`Sampler`] reads.
pub struct Providers {
    pub memory: Box<dyn MemoryStatsProvider>,
    pub gpu: Box<dyn GpuUsageProvider>,
    pub compressed_swap: Box<dyn CompressedSwapProvider>,
    pub vm_events: Box<dyn VmEventProvider>,
    pub processes: Box<dyn ProcessSnapshotProvider>,
}

impl Providers {
    /// Providers reading `/proc` and `/sys` through `fs`.
    ///
    /// Compressed swap is taken from `zram0`; GPU usage is not available.
    pub fn procfs<F>(fs: F, proc_path: &str, sys_path: &str) -> Self
    where
        F: FileSystem + Clone + 'static,
    {
        Self {
            memory: Box::new(SystemCollector::new(fs.clone(), proc_path)),
            gpu: Box::new(NoGpuUsage),
            compressed_swap: Box::new(ZramUsage::new(fs.clone(), sys_path, "zram0")),
            vm_events: Box::new(SystemCollector::new(fs.clone(), proc_path)),
            processes: Box::new(ProcessCollector::new(fs, proc_path)),
        }
    }

    /// Uses one value that implements every provider trait.
    pub fn from_source<S>(source: S) -> Self
    where
        S: MemoryStatsProvider
            + GpuUsageProvider
            + CompressedSwapProvider
            + VmEventProvider
            + ProcessSnapshotProvider
            + Clone
            + 'static,
    {
        Self {
            memory: Box::new(source.clone()),
            gpu: Box::new(source.clone()),
            compressed_swap: Box::new(source.clone()),
            vm_events: Box::new(source.clone()),
            processes: Box::new(source),
        }
    }
}

/// Turns provider data into record words.
pub struct Sampler {
    providers: Providers,
    clock: Box<dyn Clock>,
}

impl Sampler {
    pub fn new(providers: Providers) -> Self {
        Self::with_clock(providers, Box::new(SystemClock))
    }

    pub fn with_clock(providers: Providers, clock: Box<dyn Clock>) -> Self {
        Self { providers, clock }
    }

    /// Samples everything `out`'s filter selects and emits it as one record.
    ///
    /// Stops early if the writer refuses a word.
    pub fn sample(&mut self, cause: TriggerCause, out: &mut RecordWriter<'_>) {
        let started = Instant::now();
        let filter = out.filter().clone();
        let now = self.clock.now();

        if !out.emit_all([
            SENTINEL,
            cause.tag(),
            now.seconds.min(MAX_DATA_WORD),
            Word::from(now.millis),
        ]) {
            return;
        }

        if !filter.memory.is_empty() && !out.emit_all(self.memory_words(filter.memory)) {
            return;
        }

        if !filter.vm_events.is_empty() && !out.emit_all(self.vm_event_words(filter.vm_events)) {
            return;
        }

        let mut groups = 0;
        if !filter.process.is_empty() {
            for entry in self.snapshot() {
                if !is_candidate(&filter, &entry) {
                    trace!(pid = entry.pid, "process skipped");
                    continue;
                }
                if !out.emit_all(process_words(filter.process, &entry)) {
                    return;
                }
                groups += 1;
            }
        }

        trace!(
            %cause,
            words = out.written(),
            processes = groups,
            elapsed_us = started.elapsed().as_micros() as u64,
            "sample taken"
        );
    }

    /// Enabled memory fields in canonical order.
    fn memory_words(&self, mask: MemoryFields) -> Vec<Word> {
        let stats = self.providers.memory.memory_stats().unwrap_or_else(|e| {
            warn!("memory statistics unavailable: {}", e);
            MemoryStats::default()
        });
        let gpu = if mask.contains(MemoryFields::GPU) {
            self.providers.gpu.gpu_usage_kb()
        } else {
            0
        };
        let compressed = if mask.contains(MemoryFields::COMPRESSED_SWAP) {
            self.providers.compressed_swap.compressed_swap_kb()
        } else {
            0
        };

        select(
            mask,
            [
                (MemoryFields::FREE, stats.free),
                (MemoryFields::SWAP_FREE, stats.swap_free),
                (MemoryFields::CACHED, stats.cached),
                (MemoryFields::GPU, gpu),
                (MemoryFields::LOCKED, stats.locked),
                (MemoryFields::COMPRESSED_SWAP, compressed),
            ],
        )
    }

    /// Enabled vm event fields in canonical order, summed over CPUs.
    fn vm_event_words(&self, mask: VmEventFields) -> Vec<Word> {
        let totals: VmEventCounters = match self.providers.vm_events.per_cpu_events() {
            Ok(per_cpu) => per_cpu.into_iter().sum(),
            Err(e) => {
                warn!("vm event counters unavailable: {}", e);
                VmEventCounters::default()
            }
        };

        select(
            mask,
            [
                (VmEventFields::SWAP_IN, totals.swap_in),
                (VmEventFields::SWAP_OUT, totals.swap_out),
                (VmEventFields::PRESSURE_FAULT, totals.pressure_faults),
            ],
        )
    }

    fn snapshot(&self) -> Vec<ProcessEntry> {
        self.providers.processes.processes().unwrap_or_else(|e| {
            warn!("process snapshot unavailable: {}", e);
            Vec::new()
        })
    }
}

/// Keeps the values whose flag is in `mask`, preserving table order.
///
/// Values are clamped below the sentinel.
fn select<T, const N: usize>(mask: T, table: [(T, u64); N]) -> Vec<Word>
where
    T: bitflags::Flags + Copy,
{
    table
        .into_iter()
        .filter(|(flag, _)| mask.contains(*flag))
        .map(|(_, value)| value.min(MAX_DATA_WORD))
        .collect()
}

/// Decides whether a process gets a group in the record.
pub fn is_candidate(filter: &FilterConfig, entry: &ProcessEntry) -> bool {
    if entry.kernel_thread {
        return false;
    }
    if !filter.adj_in_range(entry.oom_adj) || !filter.pid_matches(entry.pid) {
        return false;
    }
    let Some(uid) = entry.uid else {
        return false;
    };
    if uid == ROOT_UID || entry.ppid == INIT_PID {
        return false;
    }
    // Only the system server among the most protected processes.
    if entry.oom_adj == OOM_ADJ_MOST_PROTECTED && uid != SYSTEM_UID {
        return false;
    }
    entry.memory.is_some()
}

/// Pid, oom-adjust, then enabled size and count fields.
fn process_words(mask: ProcessFields, entry: &ProcessEntry) -> Vec<Word> {
    let memory = entry.memory.unwrap_or_default();
    let threads: ThreadCounters = entry.threads.iter().copied().sum();

    let mut words = vec![Word::from(entry.pid), encode_signed(entry.oom_adj)];
    words.extend(select(
        mask,
        [
            (ProcessFields::RSS, memory.rss),
            (ProcessFields::SWAPPED, memory.swapped),
            (ProcessFields::SWAP_IN, threads.swap_in),
            (ProcessFields::SWAP_OUT, threads.swap_out),
            (ProcessFields::PRESSURE_FAULT, threads.pressure_faults),
            (ProcessFields::MINOR_FAULT, threads.minor_faults),
            (ProcessFields::MAJOR_FAULT, threads.major_faults),
        ],
    ));
    words
}
