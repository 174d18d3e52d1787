//! Providers backed by the Linux `/proc` and `/sys` filesystems.
//!
//! This module provides parsers and collectors for reading memory, vm event
//! and process information through the [`FileSystem`](super::traits::FileSystem)
//! abstraction.

pub mod parser;
pub mod process;
pub mod system;

pub use process::{CollectError, ProcessCollector};
pub use system::{SystemCollector, ZramUsage};
