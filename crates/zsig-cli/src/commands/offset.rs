//! Offset command implementation.

use anyhow::Result;
use zsig_core::IMAGE_BASE;

use super::hex_utils::parse_hex_address;

/// Run the offset command
pub fn run(from: &str, to: &str) -> Result<()> {
    let from_addr = parse_hex_address(from)?;
    let to_addr = parse_hex_address(to)?;

    let diff = to_addr.abs_diff(from_addr);
    let sign = if to_addr >= from_addr { "" } else { "-" };

    println!("From: 0x{:X}{}", from_addr, rva_note(from_addr));
    println!("To:   0x{:X}{}", to_addr, rva_note(to_addr));
    println!();
    println!("Offset: {}{} (0x{:X})", sign, diff, diff);

    Ok(())
}

/// RVA against the fixed retail image base, for addresses at or above it.
/// Disassembler exports and patch tables usually speak RVAs.
fn rva_note(addr: u64) -> String {
    addr.checked_sub(IMAGE_BASE)
        .map(|rva| format!("  (rva 0x{:X})", rva))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rva_note() {
        assert_eq!(rva_note(0x41F2D0), "  (rva 0x1F2D0)");
        assert_eq!(rva_note(IMAGE_BASE), "  (rva 0x0)");
        // Below the image base there is no meaningful RVA.
        assert_eq!(rva_note(0x1000), "");
    }
}
