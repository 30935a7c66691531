//! Configuration.
//!
//! [`Params`] is the declarative, serde-loadable set of governance
//! parameters that every engine operation reads.

mod params;

pub use params::{OrderLimits, Params, SECONDS_PER_DAY};
