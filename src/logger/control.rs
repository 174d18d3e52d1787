//! Text control commands.
//!
//! One `name=value` setting per line. Blank lines and lines starting with
//! `#` are ignored.
//!
//! | name              | value                                   |
//! |-------------------|-----------------------------------------|
//! | `memory_fields`   | mask, decimal or `0x` hex               |
//! | `vm_event_fields` | mask                                    |
//! | `process_fields`  | mask                                    |
//! | `min_adj`         | signed integer                          |
//! | `max_adj`         | signed integer                          |
//! | `pid`             | pid, or `none` / `-1` to sample all     |
//! | `interval_ms`     | sampling interval in milliseconds       |
//! | `trigger`         | cause: `0`/`timer`, `1`/`lmk`, `2`/`manual` |

use std::time::Duration;

use tracing::warn;

use crate::error::ConfigError;
use crate::filter::{
    MemoryFields, ProcessFields, VmEventFields, memory_fields_from_bits, parse_mask,
    process_fields_from_bits, vm_event_fields_from_bits,
};
use crate::logger::{MemLogger, Ticker, TriggerCause};

/// A parsed control command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    MemoryFields(MemoryFields),
    VmEventFields(VmEventFields),
    ProcessFields(ProcessFields),
    MinAdj(i32),
    MaxAdj(i32),
    Pid(Option<u32>),
    Interval(Duration),
    Trigger(TriggerCause),
}

impl ControlCommand {
    /// Parses one line. `Ok(None)` for blank lines and comments.
    pub fn parse(line: &str) -> Result<Option<Self>, ConfigError> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }

        let Some((name, value)) = line.split_once('=') else {
            return Err(ConfigError::UnknownSetting(line.to_string()));
        };
        let (name, value) = (name.trim(), value.trim());
        let invalid = || ConfigError::InvalidValue {
            name: name.to_string(),
            value: value.to_string(),
        };

        let command = match name {
            "memory_fields" => {
                ControlCommand::MemoryFields(memory_fields_from_bits(parse_mask(name, value)?)?)
            }
            "vm_event_fields" => ControlCommand::VmEventFields(vm_event_fields_from_bits(
                parse_mask(name, value)?,
            )?),
            "process_fields" => {
                ControlCommand::ProcessFields(process_fields_from_bits(parse_mask(name, value)?)?)
            }
            "min_adj" => ControlCommand::MinAdj(value.parse().map_err(|_| invalid())?),
            "max_adj" => ControlCommand::MaxAdj(value.parse().map_err(|_| invalid())?),
            "pid" => ControlCommand::Pid(parse_pid(value).ok_or_else(invalid)?),
            "interval_ms" => {
                let ms: u64 = value.parse().map_err(|_| invalid())?;
                if ms == 0 {
                    return Err(invalid());
                }
                ControlCommand::Interval(Duration::from_millis(ms))
            }
            "trigger" => ControlCommand::Trigger(parse_cause(value).ok_or_else(invalid)?),
            _ => return Err(ConfigError::UnknownSetting(name.to_string())),
        };
        Ok(Some(command))
    }

    /// Applies the command. Interval changes need the running `ticker`.
    pub fn apply(&self, logger: &MemLogger, ticker: Option<&Ticker>) {
        match *self {
            ControlCommand::MemoryFields(fields) => logger.set_memory_fields(fields),
            ControlCommand::VmEventFields(fields) => logger.set_vm_event_fields(fields),
            ControlCommand::ProcessFields(fields) => logger.set_process_fields(fields),
            ControlCommand::MinAdj(min) => logger.set_min_adj(min),
            ControlCommand::MaxAdj(max) => logger.set_max_adj(max),
            ControlCommand::Pid(pid) => logger.set_pid_filter(pid),
            ControlCommand::Interval(interval) => match ticker {
                Some(ticker) => ticker.set_interval(interval),
                None => warn!("no timer running, interval ignored"),
            },
            ControlCommand::Trigger(cause) => logger.trigger(cause),
        }
    }
}

/// `none` and `-1` mean no pid filter.
pub fn parse_pid(value: &str) -> Option<Option<u32>> {
    match value.trim() {
        "none" | "-1" => Some(None),
        other => other.parse().ok().map(Some),
    }
}

fn parse_cause(value: &str) -> Option<TriggerCause> {
    match value {
        "timer" => Some(TriggerCause::Timer),
        "lmk" => Some(TriggerCause::LowMemoryKiller),
        "manual" => Some(TriggerCause::Manual),
        other => other.parse().ok().and_then(TriggerCause::from_tag),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::StaticSource;
    use crate::filter::FilterConfig;
    use crate::logger::{Providers, Sampler};

    fn logger() -> MemLogger {
        let sampler = Sampler::new(Providers::from_source(StaticSource::new()));
        MemLogger::new(6, FilterConfig::default(), sampler)
    }

    #[test]
    fn test_parse_masks() {
        assert_eq!(
            ControlCommand::parse("memory_fields=0x1").unwrap(),
            Some(ControlCommand::MemoryFields(MemoryFields::FREE))
        );
        assert_eq!(
            ControlCommand::parse("  vm_event_fields = 0 ").unwrap(),
            Some(ControlCommand::VmEventFields(VmEventFields::empty()))
        );
        assert_eq!(
            ControlCommand::parse("process_fields=3").unwrap(),
            Some(ControlCommand::ProcessFields(ProcessFields::SIZE))
        );
    }

    #[test]
    fn test_parse_skips_blank_and_comments() {
        assert_eq!(ControlCommand::parse("").unwrap(), None);
        assert_eq!(ControlCommand::parse("   ").unwrap(), None);
        assert_eq!(ControlCommand::parse("# memory_fields=1").unwrap(), None);
    }

    #[test]
    fn test_parse_pid_and_adj() {
        assert_eq!(
            ControlCommand::parse("pid=1234").unwrap(),
            Some(ControlCommand::Pid(Some(1234)))
        );
        assert_eq!(
            ControlCommand::parse("pid=-1").unwrap(),
            Some(ControlCommand::Pid(None))
        );
        assert_eq!(
            ControlCommand::parse("pid=none").unwrap(),
            Some(ControlCommand::Pid(None))
        );
        assert_eq!(
            ControlCommand::parse("min_adj=-12").unwrap(),
            Some(ControlCommand::MinAdj(-12))
        );
    }

    #[test]
    fn test_parse_interval_and_trigger() {
        assert_eq!(
            ControlCommand::parse("interval_ms=250").unwrap(),
            Some(ControlCommand::Interval(Duration::from_millis(250)))
        );
        assert_eq!(
            ControlCommand::parse("trigger=1").unwrap(),
            Some(ControlCommand::Trigger(TriggerCause::LowMemoryKiller))
        );
        assert_eq!(
            ControlCommand::parse("trigger=manual").unwrap(),
            Some(ControlCommand::Trigger(TriggerCause::Manual))
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            ControlCommand::parse("colour=blue"),
            Err(ConfigError::UnknownSetting(_))
        ));
        assert!(matches!(
            ControlCommand::parse("memory_fields"),
            Err(ConfigError::UnknownSetting(_))
        ));
        assert!(matches!(
            ControlCommand::parse("memory_fields=0x80"),
            Err(ConfigError::UnknownBits { .. })
        ));
        assert!(matches!(
            ControlCommand::parse("max_adj=high"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(ControlCommand::parse("interval_ms=0").is_err());
        assert!(ControlCommand::parse("trigger=7").is_err());
        assert!(ControlCommand::parse("pid=-2").is_err());
    }

    #[test]
    fn test_apply_updates_filter() {
        let logger = logger();
        for line in ["memory_fields=1", "min_adj=0", "max_adj=8", "pid=42"] {
            let command = ControlCommand::parse(line).unwrap().unwrap();
            command.apply(&logger, None);
        }

        let filter = logger.filter();
        assert_eq!(filter.memory, MemoryFields::FREE);
        assert_eq!((filter.min_adj, filter.max_adj), (0, 8));
        assert_eq!(filter.pid, Some(42));
    }

    #[test]
    fn test_apply_adj_bounds_in_any_order() {
        let logger = logger();
        for line in ["min_adj=20", "max_adj=30"] {
            let command = ControlCommand::parse(line).unwrap().unwrap();
            command.apply(&logger, None);
        }
        let filter = logger.filter();
        assert_eq!((filter.min_adj, filter.max_adj), (20, 30));

        // Lowering the top first passes through an empty window.
        for line in ["max_adj=-10", "min_adj=-16"] {
            let command = ControlCommand::parse(line).unwrap().unwrap();
            command.apply(&logger, None);
        }
        let filter = logger.filter();
        assert_eq!((filter.min_adj, filter.max_adj), (-16, -10));
    }

    #[test]
    fn test_apply_trigger_samples() {
        let logger = logger();
        ControlCommand::Trigger(TriggerCause::Manual).apply(&logger, None);
        assert!(logger.unread() > 0);
    }
}
