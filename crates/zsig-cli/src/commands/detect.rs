//! Detect command implementation.

use anyhow::Result;
use owo_colors::OwoColorize;
use zsig_core::detect_version;

use crate::source::SourceArgs;

/// Run the detect command
pub fn run(source: &SourceArgs) -> Result<()> {
    source.with_reader(|reader| {
        let detected = detect_version(reader)?;

        println!("=== Game Version Detection ===");
        println!(
            "Version:    {} ({})",
            detected.version.namespace_name().green(),
            detected.version.tag()
        );
        println!("Base:       0x{:X}", detected.base_address);
        println!(
            "Image size: 0x{:X} ({} MB)",
            detected.image_size,
            detected.image_size / 1024 / 1024
        );
        match &detected.banner {
            Some(banner) => println!("Banner:     {:?}", banner),
            None => println!("Banner:     {}", "(not found)".yellow()),
        }

        Ok(())
    })
}
