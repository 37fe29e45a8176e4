//! CLI command implementations.

pub mod cursor;
pub mod merge;
pub mod simulate;
