//! Parsers for `/proc` and `/sys` files.
//!
//! These are pure functions that parse the content of various files into
//! structured data. They are designed to be easily testable with string inputs.

use std::collections::HashMap;

/// Error type for parsing failures.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Parse error: {}", self.message)
    }
}

impl std::error::Error for ParseError {}

/// `PF_KTHREAD` bit of the per-task flags word.
pub const PF_KTHREAD: u32 = 0x0020_0000;

/// Parsed data from `/proc/[pid]/stat` (or `/proc/[pid]/task/[tid]/stat`).
#[derive(Debug, Clone, Default)]
pub struct ProcStat {
    pub pid: u32,
    pub comm: String,
    pub state: char,
    pub ppid: u32,
    pub flags: u32,
    pub minflt: u64,
    pub majflt: u64,
}

impl ProcStat {
    pub fn is_kernel_thread(&self) -> bool {
        self.flags & PF_KTHREAD != 0
    }
}

/// Parses `/proc/[pid]/stat` content.
///
/// The format is tricky because the comm field can contain spaces and parentheses.
/// Format: pid (comm) state ppid pgrp session tty_nr tpgid flags minflt cminflt majflt ...
pub fn parse_proc_stat(content: &str) -> Result<ProcStat, ParseError> {
    let content = content.trim();

    // Find the comm field boundaries (enclosed in parentheses)
    let open_paren = content
        .find('(')
        .ok_or_else(|| ParseError::new("missing '(' in stat"))?;
    let close_paren = content
        .rfind(')')
        .ok_or_else(|| ParseError::new("missing ')' in stat"))?;

    if close_paren <= open_paren {
        return Err(ParseError::new("invalid parentheses in stat"));
    }

    let pid: u32 = content[..open_paren]
        .trim()
        .parse()
        .map_err(|_| ParseError::new("invalid pid"))?;

    let comm = content[open_paren + 1..close_paren].to_string();

    let fields: Vec<&str> = content[close_paren + 1..].split_whitespace().collect();

    if fields.len() < 10 {
        return Err(ParseError::new(format!(
            "not enough fields in stat: expected 10+, got {}",
            fields.len()
        )));
    }

    let parse_field = |idx: usize, name: &str| -> Result<u64, ParseError> {
        fields
            .get(idx)
            .ok_or_else(|| ParseError::new(format!("missing field {}", name)))?
            .parse()
            .map_err(|_| ParseError::new(format!("invalid {}", name)))
    };

    Ok(ProcStat {
        pid,
        comm,
        state: fields[0].chars().next().unwrap_or('?'),
        ppid: parse_field(1, "ppid")? as u32,
        flags: parse_field(6, "flags")? as u32,
        minflt: parse_field(7, "minflt")?,
        majflt: parse_field(9, "majflt")?,
    })
}

/// Parsed data from `/proc/[pid]/status`.
#[derive(Debug, Clone, Default)]
pub struct ProcStatus {
    pub name: String,
    pub pid: u32,
    pub ppid: u32,
    /// Real uid; `None` if the `Uid:` line is missing or malformed.
    pub uid: Option<u32>,
    pub euid: Option<u32>,
    /// `None` for processes without an address space.
    pub vm_rss: Option<u64>,
    pub vm_swap: Option<u64>,
}

/// Parses `/proc/[pid]/status` content.
///
/// Format is key:\tvalue pairs, one per line.
pub fn parse_proc_status(content: &str) -> Result<ProcStatus, ParseError> {
    let mut fields: HashMap<&str, &str> = HashMap::new();

    for line in content.lines() {
        if let Some((key, value)) = line.split_once(':') {
            fields.insert(key.trim(), value.trim());
        }
    }

    let name = fields
        .get("Name")
        .ok_or_else(|| ParseError::new("missing Name in status"))?
        .to_string();

    // Uid has format: real effective saved fs
    let uid_part = |idx: usize| -> Option<u32> {
        fields
            .get("Uid")
            .and_then(|line| line.split_whitespace().nth(idx))
            .and_then(|s| s.parse().ok())
    };

    // Memory fields are in kB format: "12345 kB"
    let parse_kb = |key: &str| -> Option<u64> {
        fields
            .get(key)
            .and_then(|s| s.split_whitespace().next())
            .and_then(|s| s.parse().ok())
    };

    Ok(ProcStatus {
        name,
        pid: fields.get("Pid").and_then(|s| s.parse().ok()).unwrap_or(0),
        ppid: fields.get("PPid").and_then(|s| s.parse().ok()).unwrap_or(0),
        uid: uid_part(0),
        euid: uid_part(1),
        vm_rss: parse_kb("VmRSS"),
        vm_swap: parse_kb("VmSwap"),
    })
}

/// Converts an `oom_score_adj` value (-1000..1000) to the legacy `oom_adj`
/// scale (-17..15), the same way the kernel does.
pub fn oom_score_adj_to_adj(score_adj: i32) -> i32 {
    const OOM_DISABLE: i32 = -17;
    const OOM_SCORE_ADJ_MAX: i32 = 1000;
    if score_adj == OOM_SCORE_ADJ_MAX {
        return 15;
    }
    score_adj * -OOM_DISABLE / OOM_SCORE_ADJ_MAX
}

/// Parses `/proc/[pid]/oom_adj` or `/proc/[pid]/oom_score_adj` content.
pub fn parse_oom_value(content: &str) -> Result<i32, ParseError> {
    content
        .trim()
        .parse()
        .map_err(|_| ParseError::new(format!("invalid oom value '{}'", content.trim())))
}

/// Parsed data from `/proc/meminfo`.
#[derive(Debug, Clone, Default)]
pub struct MemInfo {
    pub mem_total: u64,
    pub mem_free: u64,
    pub cached: u64,
    pub swap_cached: u64,
    pub swap_total: u64,
    pub swap_free: u64,
    pub mlocked: u64,
}

/// Parses `/proc/meminfo` content.
pub fn parse_meminfo(content: &str) -> Result<MemInfo, ParseError> {
    let mut info = MemInfo::default();
    let mut seen_free = false;

    for line in content.lines() {
        let Some((key, rest)) = line.split_once(':') else {
            continue;
        };
        let value: u64 = rest
            .split_whitespace()
            .next()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);

        match key.trim() {
            "MemTotal" => info.mem_total = value,
            "MemFree" => {
                info.mem_free = value;
                seen_free = true;
            }
            "Cached" => info.cached = value,
            "SwapCached" => info.swap_cached = value,
            "SwapTotal" => info.swap_total = value,
            "SwapFree" => info.swap_free = value,
            "Mlocked" => info.mlocked = value,
            _ => {}
        }
    }

    if !seen_free {
        return Err(ParseError::new("MemFree missing from meminfo"));
    }

    Ok(info)
}

/// Parsed data from `/proc/vmstat`.
#[derive(Debug, Clone, Default)]
pub struct VmstatInfo {
    pub pswpin: u64,
    pub pswpout: u64,
    pub pgmajfault: u64,
    /// Vendor counter of faults caused by memory pressure, if exported.
    pub pgfmfault: Option<u64>,
}

/// Parses `/proc/vmstat` content.
///
/// Format: key value (one per line)
pub fn parse_vmstat(content: &str) -> Result<VmstatInfo, ParseError> {
    let mut info = VmstatInfo::default();

    for line in content.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 2 {
            continue;
        }

        let value: u64 = parts[1].parse().unwrap_or(0);
        match parts[0] {
            "pswpin" => info.pswpin = value,
            "pswpout" => info.pswpout = value,
            "pgmajfault" => info.pgmajfault = value,
            "pgfmfault" => info.pgfmfault = Some(value),
            _ => {}
        }
    }

    Ok(info)
}

/// Parses `/sys/block/zramN/mm_stat` and returns the compressed data size in
/// bytes (second column).
pub fn parse_zram_mm_stat(content: &str) -> Result<u64, ParseError> {
    content
        .split_whitespace()
        .nth(1)
        .ok_or_else(|| ParseError::new("mm_stat has fewer than 2 columns"))?
        .parse()
        .map_err(|_| ParseError::new("invalid compr_data_size in mm_stat"))
}
