//! Data providers consumed by the sampler.
//!
//! The sampler never touches `/proc` itself; it reads through the provider
//! traits in [`traits`]. On Linux these are backed by the procfs collectors,
//! in tests by [`MockFs`] scenarios or [`StaticSource`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          Sampler                            │
//! │   MemoryStats / Gpu / CompressedSwap / VmEvent / Process    │
//! │                     Provider (traits)                       │
//! └──────────────┬──────────────────────────────┬───────────────┘
//!                │                              │
//!  ┌─────────────▼──────────────┐  ┌────────────▼──────────────┐
//!  │ SystemCollector, ZramUsage │  │     ProcessCollector      │
//!  │  - /proc/meminfo           │  │  - /proc/[pid]/stat       │
//!  │  - /proc/vmstat            │  │  - /proc/[pid]/status     │
//!  │  - /sys/block/zram0        │  │  - /proc/[pid]/task/*     │
//!  └─────────────┬──────────────┘  └────────────┬──────────────┘
//!                └──────────────┬───────────────┘
//!                        ┌──────▼──────┐
//!                        │  FileSystem │ (trait)
//!                        └──────┬──────┘
//!                 ┌─────────────┴─────────────┐
//!          ┌──────▼──────┐             ┌──────▼──────┐
//!          │   RealFs    │             │   MockFs    │
//!          │ (Linux)     │             │ (Testing)   │
//!          └─────────────┘             └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```
//! use memlog::collector::{MockFs, SystemCollector};
//! use memlog::collector::traits::MemoryStatsProvider;
//!
//! let fs = MockFs::typical_system();
//! let collector = SystemCollector::new(fs, "/proc");
//! let stats = collector.memory_stats().unwrap();
//! assert_eq!(stats.free, 812000);
//! ```

pub mod mock;
pub mod model;
pub mod procfs;
pub mod traits;

pub use mock::{MockFs, StaticSource};
pub use model::{MemoryStats, ProcessEntry, ProcessMemory, ThreadCounters, VmEventCounters};
pub use procfs::{CollectError, ProcessCollector, SystemCollector, ZramUsage};
pub use traits::{FileSystem, NoGpuUsage, RealFs};
