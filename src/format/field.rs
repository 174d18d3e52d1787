//! Field descriptors: what a word means and how it is rendered.

use std::fmt::Write;

use crate::filter::{MemoryFields, ProcessFields, VmEventFields};
use crate::storage::Word;

/// Upper bound on the bytes produced by rendering any single field.
///
/// The widest field is a pid-style `" [" + 20 digits + "]"` = 23 bytes.
pub const MAX_FIELD_WIDTH: usize = 24;

/// Stores a signed value in the low 32 bits of a word.
///
/// Keeps negative values away from the sentinel.
pub fn encode_signed(value: i32) -> Word {
    value as u32 as Word
}

/// Inverse of [`encode_signed`].
pub fn decode_signed(word: Word) -> i32 {
    word as u32 as i32
}

const MEMORY_LABELS: [(MemoryFields, &str); 6] = [
    (MemoryFields::FREE, "  memfr"),
    (MemoryFields::SWAP_FREE, "  swpfr"),
    (MemoryFields::CACHED, "  cache"),
    (MemoryFields::GPU, "    gpu"),
    (MemoryFields::LOCKED, "  mlock"),
    (MemoryFields::COMPRESSED_SWAP, "   zram"),
];

const VM_EVENT_LABELS: [(VmEventFields, &str); 3] = [
    (VmEventFields::SWAP_IN, "   swpin"),
    (VmEventFields::SWAP_OUT, "  swpout"),
    (VmEventFields::PRESSURE_FAULT, "   fmflt"),
];

const PROCESS_LABELS: [(ProcessFields, &str); 7] = [
    (ProcessFields::RSS, "    rss"),
    (ProcessFields::SWAPPED, "   rswp"),
    (ProcessFields::SWAP_IN, "  pswpin"),
    (ProcessFields::SWAP_OUT, " pswpout"),
    (ProcessFields::PRESSURE_FAULT, "  pfmflt"),
    (ProcessFields::MINOR_FAULT, "  minflt"),
    (ProcessFields::MAJOR_FAULT, "  majflt"),
];

fn lookup<T: PartialEq>(table: &[(T, &'static str)], bit: T) -> &'static str {
    table
        .iter()
        .find(|(flag, _)| *flag == bit)
        .map(|(_, label)| *label)
        .unwrap_or("?")
}

/// Identity of a record field.
///
/// Category variants carry exactly one flag bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Position of the sentinel; renders the record separator.
    RecordStart,
    Trigger,
    Seconds,
    Millis,
    Memory(MemoryFields),
    VmEvent(VmEventFields),
    Pid,
    OomAdj,
    Process(ProcessFields),
}

impl FieldKind {
    /// Column label used in the header line.
    ///
    /// Each label is as wide as the rendered field so columns line up.
    pub fn label(&self) -> &'static str {
        match *self {
            FieldKind::RecordStart | FieldKind::Millis => "",
            FieldKind::Trigger => "<type>",
            FieldKind::Seconds => "     [time]",
            FieldKind::Memory(bit) => lookup(&MEMORY_LABELS, bit),
            FieldKind::VmEvent(bit) => lookup(&VM_EVENT_LABELS, bit),
            FieldKind::Pid => " [pid]",
            FieldKind::OomAdj => " adj",
            FieldKind::Process(bit) => lookup(&PROCESS_LABELS, bit),
        }
    }

    /// Pattern a field of this kind is rendered with.
    pub fn pattern(&self) -> RenderPattern {
        match *self {
            FieldKind::RecordStart => RenderPattern::Separator,
            FieldKind::Trigger => RenderPattern::Tag,
            FieldKind::Seconds => RenderPattern::Seconds,
            FieldKind::Millis => RenderPattern::Millis,
            FieldKind::Memory(_) => RenderPattern::Size,
            FieldKind::VmEvent(_) => RenderPattern::Count,
            FieldKind::Pid => RenderPattern::Pid,
            FieldKind::OomAdj => RenderPattern::Adj,
            FieldKind::Process(bit) if ProcessFields::SIZE.contains(bit) => RenderPattern::Size,
            FieldKind::Process(_) => RenderPattern::Count,
        }
    }
}

/// Text layout of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderPattern {
    /// `\n`, the word itself is not printed.
    Separator,
    /// `<tag>`
    Tag,
    /// `[sssss`
    Seconds,
    /// `.mmm]`
    Millis,
    /// ` ssssss` kilobytes
    Size,
    /// ` ccccccc` events
    Count,
    /// ` [pid]`
    Pid,
    /// ` aaa` signed
    Adj,
}

impl RenderPattern {
    /// Appends the rendering of `word` to `out`.
    pub fn render(self, word: Word, out: &mut String) {
        // Writing into a String cannot fail.
        let _ = match self {
            RenderPattern::Separator => {
                out.push('\n');
                Ok(())
            }
            RenderPattern::Tag => write!(out, "<{}>", word),
            RenderPattern::Seconds => write!(out, "[{:>5}", word),
            RenderPattern::Millis => write!(out, ".{:03}]", word),
            RenderPattern::Size => write!(out, " {:>6}", word),
            RenderPattern::Count => write!(out, " {:>7}", word),
            RenderPattern::Pid => write!(out, " [{}]", word),
            RenderPattern::Adj => write!(out, " {:>3}", decode_signed(word)),
        };
    }
}

/// One entry of a [`FormatProgram`](super::FormatProgram).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldSpec {
    pub kind: FieldKind,
    pub pattern: RenderPattern,
}

impl FieldSpec {
    pub fn new(kind: FieldKind) -> Self {
        Self {
            kind,
            pattern: kind.pattern(),
        }
    }

    /// Appends the rendering of `word` to `out`.
    pub fn render(&self, word: Word, out: &mut String) {
        self.pattern.render(word, out);
    }
}
