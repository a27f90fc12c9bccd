//! Resolve command implementation.

use std::path::Path;

use anyhow::{Result, bail};
use owo_colors::OwoColorize;
use tracing::warn;
use zsig_core::{
    EngineResolver, ResolveSignature, SignatureDatabase, detect_version, load_signatures,
    save_to_cache, try_load_cached,
};

use crate::source::SourceArgs;

/// Run the resolve command
pub fn run(
    names: &[String],
    signatures: Option<&Path>,
    no_cache: bool,
    source: &SourceArgs,
) -> Result<()> {
    source.with_reader(|reader| {
        let detected = detect_version(reader)?;

        let set = match signatures {
            Some(path) => {
                let set = load_signatures(path)?;
                if set.version != detected.version {
                    return Err(zsig_core::Error::VersionMismatch {
                        expected: detected.version.tag().to_string(),
                        actual: set.version.tag().to_string(),
                    }
                    .into());
                }
                set
            }
            None => {
                let db = SignatureDatabase::default();
                match db.set_for(detected.version) {
                    Some(set) => set.clone(),
                    None => bail!("no signature set for {}", detected.version.tag()),
                }
            }
        };

        let resolver = EngineResolver::with_version(reader, detected.version, set);

        if !no_cache
            && let Some(cached) = try_load_cached(detected.version, detected.image_size)
        {
            resolver.preload(&cached);
        }

        println!(
            "{} ({} name{})",
            detected.version.namespace_name(),
            names.len(),
            if names.len() == 1 { "" } else { "s" }
        );
        println!();

        let mut failures = 0usize;
        for name in names {
            match resolver.resolve(name) {
                Ok(addr) => println!("  {:<32} -> 0x{:X}", name, addr.green()),
                Err(e) => {
                    failures += 1;
                    println!("  {:<32} -> {}", name, e.to_string().red());
                }
            }
        }

        if no_cache {
            warn!("Cache disabled; resolved addresses were not persisted");
        } else {
            save_to_cache(
                detected.version,
                detected.image_size,
                resolver.resolved_addresses(),
            );
        }

        if failures > 0 {
            bail!("{} of {} signatures failed to resolve", failures, names.len());
        }
        Ok(())
    })
}
