//! Persisted records.
//!
//! Five independently-keyed record kinds make up the AMM state: [`Pool`],
//! [`PoolState`], [`TickInfo`], [`Position`] and [`FarmingPlan`].  Records
//! reference each other by id only; the [`Store`](crate::store::Store)
//! owns them all.

mod plan;
mod pool;
mod position;
mod tick_info;

pub use plan::{FarmingPlan, RewardAllocation};
pub use pool::{Pool, PoolState};
pub use position::Position;
pub use tick_info::TickInfo;
