//! The logger context: buffer, filter, format program and reader cursor.
//!
//! One [`MemLogger`] owns everything a logging session needs. Samples are
//! pushed by whoever calls [`MemLogger::trigger`] (usually the [`Ticker`]
//! thread) and drained as text by [`MemLogger::read`].
//!
//! # Locking
//!
//! ```text
//!   Ticker / trigger()                       read()
//!         │                                    │
//!   ┌─────▼──────────┐                         │
//!   │ Mutex<Sampler> │  one producer at a time │
//!   └─────┬──────────┘                         │
//!         │ per word                           │ per rendered field
//!   ┌─────▼────────────────────────────────────▼─────┐
//!   │ Mutex<LogState>                                │
//!   │  ring · filter · program · cursor · generation │
//!   └─────┬──────────────────────────────────────────┘
//!         │ notify once per record / on interrupt
//!   ┌─────▼─────┐
//!   │  Condvar  │
//!   └───────────┘
//! ```
//!
//! Providers are queried with no lock on the state. Reconfiguration swaps
//! the program and clears the ring under one acquisition of the state lock
//! and bumps the generation, so a sampler that is half way through a record
//! stops instead of appending old-format words to the new stream.

pub mod control;
mod reader;
pub mod sampler;
pub mod timer;


pub use control::ControlCommand;
pub use reader::ReadChunk;
pub use sampler::{Clock, Providers, Sampler, SystemClock, Timestamp};
pub use timer::Ticker;

use std::fmt;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, info};

use crate::filter::{FilterConfig, MemoryFields, ProcessFields, VmEventFields};
use crate::format::{FormatProgram, RenderCursor};
use crate::storage::{RingBuffer, Word};

/// What caused a sample. Stored as the record's trigger tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerCause {
    /// Periodic timer.
    Timer,
    /// The low memory killer is about to pick a victim.
    LowMemoryKiller,
    /// Explicit request from an operator or test.
    Manual,
}

impl TriggerCause {
    pub fn tag(self) -> Word {
        match self {
            TriggerCause::Timer => 0,
            TriggerCause::LowMemoryKiller => 1,
            TriggerCause::Manual => 2,
        }
    }

    pub fn from_tag(tag: Word) -> Option<Self> {
        match tag {
            0 => Some(TriggerCause::Timer),
            1 => Some(TriggerCause::LowMemoryKiller),
            2 => Some(TriggerCause::Manual),
            _ => None,
        }
    }
}

impl fmt::Display for TriggerCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TriggerCause::Timer => "timer",
            TriggerCause::LowMemoryKiller => "lmk",
            TriggerCause::Manual => "manual",
        };
        f.write_str(name)
    }
}

/// State guarded by the logger's main lock.
#[derive(Debug)]
pub(crate) struct LogState {
    pub(crate) ring: RingBuffer,
    pub(crate) filter: FilterConfig,
    pub(crate) program: FormatProgram,
    pub(crate) cursor: RenderCursor,
    /// Bumped on every reconfiguration.
    pub(crate) generation: u64,
    /// Set by `interrupt()`, consumed by the next wait that blocks.
    pub(crate) interrupt_pending: bool,
    /// Words dropped by the reader while looking for a record start.
    pub(crate) discarded: u64,
}

impl LogState {
    fn new(shift: u32, filter: FilterConfig) -> Self {
        Self {
            ring: RingBuffer::new(shift),
            program: FormatProgram::build(&filter),
            filter,
            cursor: RenderCursor::new(),
            generation: 0,
            interrupt_pending: false,
            discarded: 0,
        }
    }

    /// Installs `filter`, rebuilds the program and clears ring and cursor.
    fn reconfigure(&mut self, filter: FilterConfig) {
        if self.ring.overwritten() > 0 || self.discarded > 0 {
            debug!(
                overwritten = self.ring.overwritten(),
                discarded = self.discarded,
                "dropping buffer"
            );
        }
        self.program = FormatProgram::build(&filter);
        self.filter = filter;
        self.ring.reset();
        self.cursor.restart();
        self.discarded = 0;
        self.generation = self.generation.wrapping_add(1);
        info!(fields = self.program.len(), filter = %self.filter, "format rebuilt");
    }

    /// Pushes one word. An eviction takes away the words the reader was
    /// about to render, so the cursor goes back to looking for a sentinel.
    fn push(&mut self, word: Word) -> usize {
        let evicted = self.ring.push(word);
        if evicted > 0 {
            self.cursor.restart();
        }
        evicted
    }
}

/// Writes one record into the ring, taking the state lock per word.
///
/// Captures the filter and generation at creation. Once the generation
/// moves on, every further `emit` is refused.
pub struct RecordWriter<'a> {
    state: &'a Mutex<LogState>,
    filter: FilterConfig,
    generation: u64,
    written: usize,
    evicted: usize,
    abandoned: bool,
}

impl<'a> RecordWriter<'a> {
    fn begin(state: &'a Mutex<LogState>) -> Self {
        let guard = state.lock();
        Self {
            filter: guard.filter.clone(),
            generation: guard.generation,
            state,
            written: 0,
            evicted: 0,
            abandoned: false,
        }
    }

    /// Filter the record is being sampled with.
    pub fn filter(&self) -> &FilterConfig {
        &self.filter
    }

    /// Appends one word. Returns `false` if the record was abandoned.
    pub fn emit(&mut self, word: Word) -> bool {
        if self.abandoned {
            return false;
        }
        let mut state = self.state.lock();
        if state.generation != self.generation {
            self.abandoned = true;
            return false;
        }
        self.evicted += state.push(word);
        self.written += 1;
        true
    }

    /// Appends words in order, stopping at the first refusal.
    pub fn emit_all(&mut self, words: impl IntoIterator<Item = Word>) -> bool {
        words.into_iter().all(|word| self.emit(word))
    }

    pub fn written(&self) -> usize {
        self.written
    }

    pub fn is_abandoned(&self) -> bool {
        self.abandoned
    }
}

/// A memory-pressure logger instance.
pub struct MemLogger {
    state: Mutex<LogState>,
    data_ready: Condvar,
    sampler: Mutex<Sampler>,
}

impl MemLogger {
    /// Default ring size: 16384 words.
    pub const DEFAULT_SHIFT: u32 = 14;

    /// Creates a logger with a ring of `1 << shift` words.
    pub fn new(shift: u32, filter: FilterConfig, sampler: Sampler) -> Self {
        let state = LogState::new(shift, filter);
        info!(
            capacity = state.ring.capacity(),
            fields = state.program.len(),
            filter = %state.filter,
            "logger created"
        );
        Self {
            state: Mutex::new(state),
            data_ready: Condvar::new(),
            sampler: Mutex::new(sampler),
        }
    }

    /// Takes one sample and appends it as a record.
    pub fn trigger(&self, cause: TriggerCause) {
        let mut sampler = self.sampler.lock();
        let mut writer = RecordWriter::begin(&self.state);

        sampler.sample(cause, &mut writer);

        if writer.abandoned {
            debug!(%cause, words = writer.written, "record abandoned by reconfiguration");
            return;
        }
        if writer.evicted > 0 {
            debug!(evicted = writer.evicted, "ring full, oldest words overwritten");
        }
        self.data_ready.notify_all();
    }

    /// Starts a new text stream: the next rendered word is a record start.
    pub fn open(&self) {
        self.state.lock().cursor.restart();
    }

    /// Wakes a blocked [`read`](Self::read), which then fails with
    /// [`ReadError::Interrupted`](crate::error::ReadError::Interrupted).
    ///
    /// If no reader is waiting the interrupt is kept until a read finds
    /// the ring empty. Buffered data is still delivered first.
    pub fn interrupt(&self) {
        self.state.lock().interrupt_pending = true;
        self.data_ready.notify_all();
    }

    /// Number of unread words.
    pub fn unread(&self) -> usize {
        self.state.lock().ring.unread()
    }

    pub fn capacity(&self) -> usize {
        self.state.lock().ring.capacity()
    }

    pub fn filter(&self) -> FilterConfig {
        self.state.lock().filter.clone()
    }

    /// Length of the current format program.
    pub fn program_len(&self) -> usize {
        self.state.lock().program.len()
    }

    /// Column names for the current filter.
    pub fn header_line(&self) -> String {
        self.state.lock().program.header_line()
    }

    /// Cursor position of the reader; zero at a record boundary.
    pub fn cursor_position(&self) -> usize {
        self.state.lock().cursor.position()
    }

    pub fn set_memory_fields(&self, fields: MemoryFields) {
        self.update(|filter| filter.memory = fields);
    }

    pub fn set_vm_event_fields(&self, fields: VmEventFields) {
        self.update(|filter| filter.vm_events = fields);
    }

    pub fn set_process_fields(&self, fields: ProcessFields) {
        self.update(|filter| filter.process = fields);
    }

    /// Sets the lowest oom-adjust of sampled processes.
    ///
    /// Each bound is taken on its own. A window with `min_adj > max_adj` is
    /// empty and samples no processes.
    pub fn set_min_adj(&self, min: i32) {
        self.update(|filter| filter.min_adj = min);
    }

    /// Sets the highest oom-adjust of sampled processes.
    pub fn set_max_adj(&self, max: i32) {
        self.update(|filter| filter.max_adj = max);
    }

    /// Sets both bounds of the oom-adjust window with one reconfiguration.
    pub fn set_oom_adj_range(&self, min: i32, max: i32) {
        self.update(|filter| {
            filter.min_adj = min;
            filter.max_adj = max;
        });
    }

    /// Restricts sampling to one pid, or lifts the restriction with `None`.
    pub fn set_pid_filter(&self, pid: Option<u32>) {
        self.update(|filter| filter.pid = pid);
    }

    fn update(&self, change: impl FnOnce(&mut FilterConfig)) {
        let mut state = self.state.lock();
        let mut filter = state.filter.clone();
        change(&mut filter);
        if filter != state.filter {
            state.reconfigure(filter);
        }
    }
}

impl fmt::Debug for MemLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("MemLogger")
            .field("capacity", &state.ring.capacity())
            .field("unread", &state.ring.unread())
            .field("filter", &state.filter)
            .field("generation", &state.generation)
            .finish()
    }
}
