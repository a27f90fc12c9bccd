//! Generate command implementation.

use std::fs;
use std::path::Path;

use anyhow::Result;
use owo_colors::OwoColorize;
use zsig_core::{GameVersion, generate_set, parse_names_export, save_signatures};

/// Run the generate command
pub fn run(names_file: &Path, version: GameVersion, output: &Path, warnings: bool) -> Result<()> {
    let content = fs::read_to_string(names_file)?;
    let (symbols, skipped) = parse_names_export(&content)?;

    let set = generate_set(version, &symbols);
    save_signatures(output, &set)?;

    println!(
        "Wrote {} entries for {} to {}",
        set.entries.len().green(),
        version.namespace_name(),
        output.display()
    );
    println!(
        "Parsed {} symbols, skipped {} lines",
        symbols.len(),
        skipped.len()
    );
    println!();
    println!("Entries carry no patterns yet; author them against the binary.");

    if warnings && !skipped.is_empty() {
        println!();
        println!("Skipped lines:");
        for line in &skipped {
            println!("  {}", line);
        }
    }

    Ok(())
}
