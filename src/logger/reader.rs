//! Blocking text reader over the ring.

use parking_lot::MutexGuard;
use tracing::trace;

use crate::error::ReadError;
use crate::format::MAX_FIELD_WIDTH;
use crate::logger::{LogState, MemLogger};
use crate::storage::SENTINEL;

/// Result of [`MemLogger::read_with_header`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadChunk {
    /// Bytes written to the buffer.
    pub len: usize,
    /// Column names of the format the bytes were rendered with. Only set
    /// when that format differs from the one the caller saw last.
    pub header: Option<String>,
}

impl LogState {
    /// Renders the next word into `out`.
    ///
    /// A sentinel restarts the record wherever the cursor is. Words that
    /// arrive while the cursor waits for a record start belong to a record
    /// whose beginning was overwritten and are dropped. Returns `false` once
    /// the ring is empty.
    pub(crate) fn render_next(&mut self, out: &mut String) -> bool {
        while let Some(word) = self.ring.pop() {
            if word == SENTINEL {
                self.cursor.restart();
            } else if self.cursor.at_record_start() {
                self.discarded += 1;
                continue;
            }

            if let Some(spec) = self.program.field(self.cursor.position()) {
                spec.render(word, out);
            }
            self.cursor.advance(&self.program);
            return true;
        }
        false
    }
}

impl MemLogger {
    /// Reads formatted records into `buf`, blocking until data is available.
    ///
    /// Stops when fewer than [`MAX_FIELD_WIDTH`] bytes of room remain, so a
    /// field is never split. The cursor persists, so the next call continues
    /// the same record. Returns the number of bytes written, which may be
    /// zero if the data was dropped by a reconfiguration after the wait.
    pub fn read(&self, buf: &mut [u8]) -> Result<usize, ReadError> {
        self.read_inner(buf, |_| {})
    }

    /// Like [`read`](Self::read), and also reports the column header when
    /// the format changed.
    ///
    /// `seen` holds the format generation the caller last got a header for,
    /// `None` before the first call. The header and the bytes always belong
    /// to the same format: a call never renders across a reconfiguration.
    pub fn read_with_header(
        &self,
        buf: &mut [u8],
        seen: &mut Option<u64>,
    ) -> Result<ReadChunk, ReadError> {
        let mut header = None;
        let len = self.read_inner(buf, |state| {
            if *seen != Some(state.generation) {
                *seen = Some(state.generation);
                header = Some(state.program.header_line());
            }
        })?;
        Ok(ReadChunk { len, header })
    }

    fn read_inner(
        &self,
        buf: &mut [u8],
        on_data: impl FnOnce(&LogState),
    ) -> Result<usize, ReadError> {
        if buf.is_empty() {
            return Err(ReadError::InvalidArgument("empty buffer".into()));
        }
        if buf.len() < MAX_FIELD_WIDTH {
            return Err(ReadError::InvalidArgument(format!(
                "buffer of {} bytes cannot hold a field of up to {} bytes",
                buf.len(),
                MAX_FIELD_WIDTH
            )));
        }

        let generation = {
            let state = self.wait_for_data()?;
            on_data(&state);
            state.generation
        };

        let mut written = 0;
        let mut field = String::with_capacity(MAX_FIELD_WIDTH);
        while written + MAX_FIELD_WIDTH <= buf.len() {
            field.clear();
            {
                let mut state = self.state.lock();
                if state.generation != generation || !state.render_next(&mut field) {
                    break;
                }
            }
            let bytes = field.as_bytes();
            buf[written..written + bytes.len()].copy_from_slice(bytes);
            written += bytes.len();
        }

        trace!(bytes = written, "read");
        Ok(written)
    }

    /// Blocks until the ring has unread words.
    ///
    /// Buffered data is returned without waiting. A pending interrupt fails
    /// the first wait that would block.
    fn wait_for_data(&self) -> Result<MutexGuard<'_, LogState>, ReadError> {
        let mut state = self.state.lock();
        loop {
            if !state.ring.is_empty() {
                return Ok(state);
            }
            if state.interrupt_pending {
                state.interrupt_pending = false;
                return Err(ReadError::Interrupted);
            }
            self.data_ready.wait(&mut state);
        }
    }
}
