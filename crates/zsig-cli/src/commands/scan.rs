//! Scan command implementation.

use anyhow::Result;
use zsig_core::{Scanner, parse_pattern};

use crate::source::SourceArgs;

/// Run the scan command
pub fn run(pattern: &str, limit: usize, source: &SourceArgs) -> Result<()> {
    let bytes = parse_pattern(pattern)?;

    source.with_reader(|reader| {
        let scanner = Scanner::new(reader);
        let matches = scanner.find_all(&bytes)?;

        if matches.is_empty() {
            println!("No matches.");
            return Ok(());
        }

        for addr in matches.iter().take(limit) {
            println!("0x{:X}", addr);
        }
        if matches.len() > limit {
            println!("... ({} more)", matches.len() - limit);
        }
        println!();
        println!("Total matches: {}", matches.len());

        Ok(())
    })
}
