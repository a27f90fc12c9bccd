//! CLI command implementations.

pub mod detect;
pub mod generate;
pub mod hex_utils;
pub mod offset;
pub mod resolve;
pub mod scan;
pub mod validate;
