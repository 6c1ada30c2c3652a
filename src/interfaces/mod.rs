//! Operator-facing batch surface: command files in, balance report out.

pub mod batch;
pub mod csv;
pub mod seed;
