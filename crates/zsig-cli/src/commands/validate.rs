//! Validate command implementation.

use std::fs;
use std::path::Path;

use anyhow::{Result, bail};
use owo_colors::OwoColorize;
use zsig_core::SignatureSet;

/// Run the validate command
pub fn run(file: &Path) -> Result<()> {
    let content = fs::read_to_string(file)?;
    let set: SignatureSet = serde_json::from_str(&content)?;

    println!(
        "=== {} ({} entries, {}) ===",
        file.display(),
        set.entries.len(),
        set.version.namespace_name()
    );

    // Whole-set invariants first (duplicate names).
    let mut set_error = None;
    if let Err(e) = set.validate() {
        set_error = Some(e.to_string());
    }

    let mut errors = 0usize;
    let mut skeletons = 0usize;

    for entry in &set.entries {
        if entry.signatures.is_empty() {
            skeletons += 1;
            println!("  {:<32} {} no patterns", entry.name, "~".yellow());
            continue;
        }

        let mut entry_errors = Vec::new();
        for (index, signature) in entry.signatures.iter().enumerate() {
            if let Err(e) = signature.validate() {
                entry_errors.push(format!("alternative {}: {}", index, e));
            }
        }

        if entry_errors.is_empty() {
            println!(
                "  {:<32} {} {} alternative(s)",
                entry.name,
                "ok".green(),
                entry.signatures.len()
            );
        } else {
            errors += entry_errors.len();
            for message in entry_errors {
                println!("  {:<32} {} {}", entry.name, "err".red(), message);
            }
        }
    }

    println!();
    if skeletons > 0 {
        println!("{} entries have no patterns yet", skeletons);
    }

    if let Some(message) = set_error {
        bail!("{}", message);
    }
    if errors > 0 {
        bail!("{} invalid signature(s)", errors);
    }

    println!("Signature set is valid.");
    Ok(())
}
