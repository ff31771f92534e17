//! One-shot subcommands.

pub mod check;
pub mod collections;
pub mod query;
pub mod stats;
