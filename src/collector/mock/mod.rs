//! Mock data sources for testing.
//!
//! `MockFs` and its scenarios stand in for `/proc` and `/sys` when testing
//! the procfs providers; `StaticSource` feeds fixed values straight into
//! the sampler.

mod filesystem;
mod providers;
mod scenarios;

pub use filesystem::MockFs;
pub use providers::{FailingSource, StaticSource};
