//! Field filters selecting what each sample records.
//!
//! Each category has its own mask. A bit enables one field; canonical order
//! within a category is bit order (lowest bit first). A zero mask removes the
//! category from the record entirely.

use std::fmt;

use bitflags::bitflags;

use crate::error::ConfigError;

bitflags! {
    /// Global memory fields, in kilobytes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MemoryFields: u32 {
        const FREE = 1 << 0;
        const SWAP_FREE = 1 << 1;
        const CACHED = 1 << 2;
        const GPU = 1 << 3;
        const LOCKED = 1 << 4;
        const COMPRESSED_SWAP = 1 << 5;
    }
}

bitflags! {
    /// System-wide vm event counters.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct VmEventFields: u32 {
        const SWAP_IN = 1 << 0;
        const SWAP_OUT = 1 << 1;
        /// Faults taken because of memory pressure.
        const PRESSURE_FAULT = 1 << 2;
    }
}

bitflags! {
    /// Per-process fields. Pid and oom-adjust are always present when any
    /// of these is set.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ProcessFields: u32 {
        const RSS = 1 << 0;
        const SWAPPED = 1 << 1;
        const SWAP_IN = 1 << 2;
        const SWAP_OUT = 1 << 3;
        const PRESSURE_FAULT = 1 << 4;
        const MINOR_FAULT = 1 << 5;
        const MAJOR_FAULT = 1 << 6;

        /// Fields rendered as sizes.
        const SIZE = Self::RSS.bits() | Self::SWAPPED.bits();
        /// Fields rendered as event counts.
        const COUNT = Self::SWAP_IN.bits()
            | Self::SWAP_OUT.bits()
            | Self::PRESSURE_FAULT.bits()
            | Self::MINOR_FAULT.bits()
            | Self::MAJOR_FAULT.bits();
    }
}

/// Most protected oom-adjust value handed out by the platform.
pub const OOM_ADJ_MOST_PROTECTED: i32 = -16;

/// Complete sampling filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterConfig {
    pub memory: MemoryFields,
    pub vm_events: VmEventFields,
    pub process: ProcessFields,
    /// Lowest oom-adjust sampled (inclusive).
    pub min_adj: i32,
    /// Highest oom-adjust sampled (inclusive).
    pub max_adj: i32,
    /// Sample only this pid.
    pub pid: Option<u32>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            memory: MemoryFields::all(),
            vm_events: VmEventFields::all(),
            process: ProcessFields::all(),
            min_adj: OOM_ADJ_MOST_PROTECTED,
            max_adj: 16,
            pid: None,
        }
    }
}

impl FilterConfig {
    /// Returns `true` if `adj` lies in `[min_adj, max_adj]`.
    pub fn adj_in_range(&self, adj: i32) -> bool {
        (self.min_adj..=self.max_adj).contains(&adj)
    }

    /// Returns `true` if the pid filter lets `pid` through.
    pub fn pid_matches(&self, pid: u32) -> bool {
        self.pid.is_none_or(|wanted| wanted == pid)
    }
}

impl fmt::Display for FilterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "memory={:#x} vm_events={:#x} process={:#x} adj=[{}, {}] pid=",
            self.memory.bits(),
            self.vm_events.bits(),
            self.process.bits(),
            self.min_adj,
            self.max_adj,
        )?;
        match self.pid {
            Some(pid) => write!(f, "{}", pid),
            None => write!(f, "none"),
        }
    }
}

/// Parses an unsigned mask written in decimal or `0x` hex.
pub fn parse_mask(name: &str, value: &str) -> Result<u32, ConfigError> {
    let value = value.trim();
    let parsed = match value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => value.parse::<u32>(),
    };
    parsed.map_err(|_| ConfigError::InvalidValue {
        name: name.to_string(),
        value: value.to_string(),
    })
}

/// Converts raw bits into `MemoryFields`, rejecting unknown bits.
pub fn memory_fields_from_bits(bits: u32) -> Result<MemoryFields, ConfigError> {
    MemoryFields::from_bits(bits).ok_or(ConfigError::UnknownBits {
        name: "memory_fields",
        bits,
    })
}

/// Converts raw bits into `VmEventFields`, rejecting unknown bits.
pub fn vm_event_fields_from_bits(bits: u32) -> Result<VmEventFields, ConfigError> {
    VmEventFields::from_bits(bits).ok_or(ConfigError::UnknownBits {
        name: "vm_event_fields",
        bits,
    })
}

/// Converts raw bits into `ProcessFields`, rejecting unknown bits.
pub fn process_fields_from_bits(bits: u32) -> Result<ProcessFields, ConfigError> {
    ProcessFields::from_bits(bits).ok_or(ConfigError::UnknownBits {
        name: "process_fields",
        bits,
    })
}
