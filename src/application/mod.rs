//! Application layer containing the canteen business logic.
//!
//! Every service works through a [`unit_of_work::UnitOfWork`]: reads that
//! decide a write and the write itself happen in one isolated, all-or-nothing
//! unit. [`canteen::Canteen`] wires the services together behind a single
//! storage engine.

pub mod canteen;
pub mod cart;
pub mod checkout;
pub mod ledger;
pub mod orders;
pub mod unit_of_work;
