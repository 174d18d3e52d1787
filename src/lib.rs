//! memlog - memory pressure logger library.
//!
//! Samples global memory, vm event and per-process memory statistics into a
//! fixed-size word ring and renders them back as a text stream whose columns
//! follow a runtime-adjustable filter.
//!
//! - [`storage`] - the word ring with overwrite-oldest semantics
//! - [`filter`] - field masks and process selection settings
//! - [`format`] - format program mapping record words to text
//! - [`collector`] - data providers (procfs, mocks)
//! - [`logger`] - the logger context, sampler, reader, timer and control commands
//!
//! ```
//! use memlog::collector::MockFs;
//! use memlog::filter::FilterConfig;
//! use memlog::logger::{MemLogger, Providers, Sampler, TriggerCause};
//!
//! let providers = Providers::procfs(MockFs::typical_system(), "/proc", "/sys");
//! let logger = MemLogger::new(10, FilterConfig::default(), Sampler::new(providers));
//!
//! logger.trigger(TriggerCause::Manual);
//!
//! let mut buf = [0u8; 4096];
//! let n = logger.read(&mut buf).unwrap();
//! assert!(buf[..n].starts_with(b"\n<2>"));
//! ```

pub mod collector;
pub mod error;
pub mod filter;
pub mod format;
pub mod logger;
pub mod storage;
