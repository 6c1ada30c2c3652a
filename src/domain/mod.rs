//! Canteen entities, value objects and the storage port.

pub mod cart;
pub mod money;
pub mod order;
pub mod ports;
pub mod product;
pub mod stand;
pub mod transaction;
pub mod user;
