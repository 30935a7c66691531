//! Contracts with the collaborators the AMM core does not own.
//!
//! - [`BankKeeper`]: the balance ledger that holds every coin.
//! - [`MatchingEngine`]: the order book the pools' synthetic orders are
//!   posted to; fills come back as [`PoolOrderFill`] reports.

mod bank_keeper;
mod matching_engine;

pub use bank_keeper::BankKeeper;
pub use matching_engine::{MatchingEngine, PoolOrderFill};
