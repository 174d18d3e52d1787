//! Format program: the mapping from record words back to text.
//!
//! A record is a flat run of words whose meaning depends on the filter that
//! was active when it was sampled. The [`FormatProgram`] is derived from the
//! same filter and lists, position by position, what each word is and how to
//! render it:
//!
//! ```text
//!  0        1        2         3        4..           ..              repeat_offset ..
//! ┌────────┬────────┬─────────┬────────┬─────────────┬──────────────┬─────┬─────┬───────┬────────┐
//! │ record │ trigger│ seconds │ millis │ memory ...  │ vm events ...│ pid │ adj │ sizes │ counts │
//! └────────┴────────┴─────────┴────────┴─────────────┴──────────────┴─────┴─────┴───────┴────────┘
//!                                                                    ▲                          │
//!                                                                    └──────── next process ────┘
//! ```
//!
//! The process group repeats for every sampled process, so after the last
//! position the [`RenderCursor`] wraps back to the repeat offset instead of
//! zero. A new record is recognised by its sentinel word.

pub mod field;

pub use field::{
    FieldKind, FieldSpec, MAX_FIELD_WIDTH, RenderPattern, decode_signed, encode_signed,
};

use crate::filter::{FilterConfig, MemoryFields, ProcessFields, VmEventFields};

/// Number of positions before the first memory field.
pub const HEADER_LEN: usize = 4;

/// Number of fixed positions at the start of a process group (pid, adj).
pub const PROCESS_PREFIX_LEN: usize = 2;

/// Iterates the single-bit values set in `bits`, lowest first.
pub(crate) fn single_bits(bits: u32) -> impl Iterator<Item = u32> {
    (0..u32::BITS)
        .map(|shift| 1u32 << shift)
        .filter(move |bit| bits & bit != 0)
}

/// Ordered field list for the current filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatProgram {
    fields: Vec<FieldSpec>,
    repeat_offset: Option<usize>,
}

impl FormatProgram {
    /// Derives the program for `filter`.
    ///
    /// Deterministic: equal filters produce equal programs.
    pub fn build(filter: &FilterConfig) -> Self {
        let mut fields = Vec::with_capacity(Self::expected_len(filter));

        fields.extend(
            [
                FieldKind::RecordStart,
                FieldKind::Trigger,
                FieldKind::Seconds,
                FieldKind::Millis,
            ]
            .map(FieldSpec::new),
        );

        fields.extend(single_bits(filter.memory.bits()).map(|bit| {
            FieldSpec::new(FieldKind::Memory(MemoryFields::from_bits_retain(bit)))
        }));
        fields.extend(single_bits(filter.vm_events.bits()).map(|bit| {
            FieldSpec::new(FieldKind::VmEvent(VmEventFields::from_bits_retain(bit)))
        }));

        let mut repeat_offset = None;
        if !filter.process.is_empty() {
            repeat_offset = Some(fields.len());
            fields.push(FieldSpec::new(FieldKind::Pid));
            fields.push(FieldSpec::new(FieldKind::OomAdj));

            // Sizes first, then counts, each in bit order.
            let sizes = filter.process & ProcessFields::SIZE;
            let counts = filter.process & ProcessFields::COUNT;
            for group in [sizes, counts] {
                fields.extend(single_bits(group.bits()).map(|bit| {
                    FieldSpec::new(FieldKind::Process(ProcessFields::from_bits_retain(bit)))
                }));
            }
        }

        debug_assert_eq!(fields.len(), Self::expected_len(filter));

        Self {
            fields,
            repeat_offset,
        }
    }

    /// Program length implied by the filter masks.
    pub fn expected_len(filter: &FilterConfig) -> usize {
        let process = if filter.process.is_empty() {
            0
        } else {
            PROCESS_PREFIX_LEN + filter.process.bits().count_ones() as usize
        };
        HEADER_LEN
            + filter.memory.bits().count_ones() as usize
            + filter.vm_events.bits().count_ones() as usize
            + process
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Always `false`; the header is unconditional.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, position: usize) -> Option<&FieldSpec> {
        self.fields.get(position)
    }

    /// Index of the pid field, if process fields are enabled.
    pub fn repeat_offset(&self) -> Option<usize> {
        self.repeat_offset
    }

    /// Human-readable line naming the active columns.
    pub fn header_line(&self) -> String {
        self.fields.iter().map(|spec| spec.kind.label()).collect()
    }
}

/// Position in the [`FormatProgram`] of the next word to render.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderCursor {
    position: usize,
}

impl RenderCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self) -> usize {
        self.position
    }

    /// `true` when the next word is expected to be a sentinel.
    pub fn at_record_start(&self) -> bool {
        self.position == 0
    }

    /// Moves back to the start of a record.
    pub fn restart(&mut self) {
        self.position = 0;
    }

    /// Moves past the current field, wrapping to the repeat offset (or zero)
    /// after the last one.
    pub fn advance(&mut self, program: &FormatProgram) {
        self.position += 1;
        if self.position >= program.len() {
            self.position = program.repeat_offset().unwrap_or(0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(memory: u32, vm: u32, process: u32) -> FilterConfig {
        FilterConfig {
            memory: MemoryFields::from_bits_truncate(memory),
            vm_events: VmEventFields::from_bits_truncate(vm),
            process: ProcessFields::from_bits_truncate(process),
            ..FilterConfig::default()
        }
    }

    #[test]
    fn test_default_program_layout() {
        let program = FormatProgram::build(&FilterConfig::default());
        // 4 header + 6 memory + 3 vm + 2 + 7 process
        assert_eq!(program.len(), 22);
        assert_eq!(program.repeat_offset(), Some(13));
        assert_eq!(program.fields()[0].kind, FieldKind::RecordStart);
        assert_eq!(program.fields()[13].kind, FieldKind::Pid);
        assert_eq!(program.fields()[14].kind, FieldKind::OomAdj);
    }

    #[test]
    fn test_length_formula_for_all_mask_combinations() {
        for memory in 0..64 {
            for vm in 0..8 {
                for process in [0, 1, 2, 3, 0x10, 0x41, 0x7f] {
                    let f = filter(memory, vm, process);
                    let program = FormatProgram::build(&f);
                    let expected = 4
                        + memory.count_ones() as usize
                        + vm.count_ones() as usize
                        + if process != 0 {
                            2 + process.count_ones() as usize
                        } else {
                            0
                        };
                    assert_eq!(program.len(), expected);
                    assert_eq!(FormatProgram::expected_len(&f), expected);
                    assert_eq!(program.repeat_offset().is_some(), process != 0);
                }
            }
        }
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        let f = filter(0b101101, 0b110, 0b1010011);
        assert_eq!(FormatProgram::build(&f), FormatProgram::build(&f));
    }

    #[test]
    fn test_canonical_order() {
        let program = FormatProgram::build(&filter(
            (MemoryFields::LOCKED | MemoryFields::FREE).bits(),
            VmEventFields::PRESSURE_FAULT.bits(),
            (ProcessFields::MAJOR_FAULT | ProcessFields::SWAPPED | ProcessFields::SWAP_IN).bits(),
        ));
        let kinds: Vec<FieldKind> = program.fields().iter().map(|f| f.kind).collect();
        assert_eq!(
            kinds[4..],
            [
                FieldKind::Memory(MemoryFields::FREE),
                FieldKind::Memory(MemoryFields::LOCKED),
                FieldKind::VmEvent(VmEventFields::PRESSURE_FAULT),
                FieldKind::Pid,
                FieldKind::OomAdj,
                FieldKind::Process(ProcessFields::SWAPPED),
                FieldKind::Process(ProcessFields::SWAP_IN),
                FieldKind::Process(ProcessFields::MAJOR_FAULT),
            ]
        );
    }

    #[test]
    fn test_zero_masks_leave_header_only() {
        let program = FormatProgram::build(&filter(0, 0, 0));
        assert_eq!(program.len(), HEADER_LEN);
        assert_eq!(program.repeat_offset(), None);
        assert_eq!(program.header_line(), "<type>     [time]");
    }

    #[test]
    fn test_header_line_follows_masks() {
        let program = FormatProgram::build(&FilterConfig::default());
        assert_eq!(
            program.header_line(),
            "<type>     [time]  memfr  swpfr  cache    gpu  mlock   zram   swpin  swpout   fmflt \
             [pid] adj    rss   rswp  pswpin pswpout  pfmflt  minflt  majflt"
        );

        let program = FormatProgram::build(&filter(MemoryFields::CACHED.bits(), 0, 0));
        assert_eq!(program.header_line(), "<type>     [time]  cache");
    }

    #[test]
    fn test_cursor_wraps_to_zero_without_processes() {
        let program = FormatProgram::build(&filter(1, 0, 0));
        let mut cursor = RenderCursor::new();
        for expected in [1, 2, 3, 4, 0, 1] {
            cursor.advance(&program);
            assert_eq!(cursor.position(), expected);
        }
        assert!(!cursor.at_record_start());
        cursor.restart();
        assert!(cursor.at_record_start());
    }

    #[test]
    fn test_cursor_wraps_to_repeat_offset() {
        // header(4) + 1 memory + pid, adj, rss
        let program = FormatProgram::build(&filter(1, 0, ProcessFields::RSS.bits()));
        assert_eq!(program.len(), 8);
        let mut cursor = RenderCursor::new();
        let mut seen = Vec::new();
        for _ in 0..11 {
            cursor.advance(&program);
            seen.push(cursor.position());
        }
        assert_eq!(seen, vec![1, 2, 3, 4, 5, 6, 7, 5, 6, 7, 5]);
    }
}
