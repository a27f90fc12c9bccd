//! Hex address parsing shared by commands.

use anyhow::{Context, Result};

/// Parse a hex address with or without a "0x" prefix.
pub fn parse_hex_address(text: &str) -> Result<u64> {
    let digits = text
        .trim()
        .trim_start_matches("0x")
        .trim_start_matches("0X");
    u64::from_str_radix(digits, 16).with_context(|| format!("invalid hex address '{}'", text))
}
