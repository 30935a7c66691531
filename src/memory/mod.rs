//! In-memory implementations of the collaborator traits.
//!
//! [`InMemoryLedger`] and [`InMemoryOrderBook`] stand in for the real
//! balance ledger and matching engine in tests, simulations and demos.

mod ledger;
mod order_book;

pub use ledger::InMemoryLedger;
pub use order_book::{InMemoryOrderBook, RestingOrder};
