//! CLI command implementations.

pub mod codes;
pub mod common;
pub mod get;
pub mod json;
