//! CLI command implementations

pub mod attach;
pub mod clone;
pub mod detach;
pub mod fields;
pub mod show;
