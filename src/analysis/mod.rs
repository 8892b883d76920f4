//! Analysis modules.
//!
//! All statistics are derived here from store snapshots; handlers and the
//! report mode only read data and call into this module.

pub mod aggregator;

pub use aggregator::*;
