//! Signature-name-to-address resolution.
//!
//! One resolver exists per running game, selected once at attach time from
//! the detected version. Names resolve lazily on first request and are
//! memoized; nothing is scanned for a name nobody asks about.

mod cache;

pub use cache::{AddressCache, save_to_cache, try_load_cached};

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::memory::ReadMemory;
use crate::scan::Scanner;
use crate::sig::{SignatureDatabase, SignatureSet};
use crate::version::{GameVersion, detect_version};

/// Resolves a signature name to a runtime memory address.
pub trait ResolveSignature {
    fn version(&self) -> GameVersion;

    fn resolve(&self, name: &str) -> Result<u64>;
}

/// Resolver bound to one game version and one loaded image.
pub struct EngineResolver<'a, R: ReadMemory + ?Sized> {
    version: GameVersion,
    set: SignatureSet,
    scanner: Scanner<'a, R>,
    resolved: Mutex<HashMap<String, u64>>,
}

impl<'a, R: ReadMemory + ?Sized> EngineResolver<'a, R> {
    /// Detect the image's version and bind that version's signature set.
    pub fn attach(reader: &'a R, db: &SignatureDatabase) -> Result<Self> {
        let detected = detect_version(reader)?;
        let set = db.set_for(detected.version).ok_or_else(|| {
            Error::ResolveFailed(format!(
                "no signature set for {}",
                detected.version.namespace_name()
            ))
        })?;
        info!(
            "Attached to {} (base {:#x}, {} signatures)",
            detected.version.namespace_name(),
            detected.base_address,
            set.entries.len()
        );
        Ok(Self::with_version(reader, detected.version, set.clone()))
    }

    /// Bind a known version explicitly (version already detected, or a
    /// custom set loaded from JSON).
    pub fn with_version(reader: &'a R, version: GameVersion, set: SignatureSet) -> Self {
        Self {
            version,
            set,
            scanner: Scanner::new(reader),
            resolved: Mutex::new(HashMap::new()),
        }
    }

    /// Seed the memo table, e.g. from a persisted [`AddressCache`].
    pub fn preload(&self, addresses: &HashMap<String, u64>) {
        let mut resolved = self.resolved.lock().unwrap();
        for (name, addr) in addresses {
            resolved.insert(name.to_ascii_lowercase(), *addr);
        }
    }

    /// Snapshot of everything resolved so far, for persisting.
    pub fn resolved_addresses(&self) -> HashMap<String, u64> {
        self.resolved.lock().unwrap().clone()
    }

    fn resolve_uncached(&self, name: &str) -> Result<u64> {
        let entry = self
            .set
            .entry(name)
            .ok_or_else(|| Error::SignatureNotFound {
                name: name.to_string(),
                version: self.version,
            })?;

        for (index, signature) in entry.signatures.iter().enumerate() {
            let targets = self.scanner.resolve_targets(signature)?;
            match targets.as_slice() {
                [target] => {
                    debug!(
                        "{}: {:#x} (alternative {}, pattern {})",
                        entry.name, target, index, signature.pattern
                    );
                    return Ok(*target);
                }
                [] => {
                    debug!(
                        "{}: alternative {} matched nothing ({})",
                        entry.name, index, signature.pattern
                    );
                }
                many => {
                    // Ambiguous pattern; a wrong address is worse than none.
                    debug!(
                        "{}: alternative {} is ambiguous, {} targets: {:X?}",
                        entry.name,
                        index,
                        many.len(),
                        &many[..many.len().min(5)]
                    );
                }
            }
        }

        Err(Error::ResolveFailed(format!(
            "'{}': none of {} alternative(s) produced a unique target",
            entry.name,
            entry.signatures.len()
        )))
    }
}

impl<R: ReadMemory + ?Sized> ResolveSignature for EngineResolver<'_, R> {
    fn version(&self) -> GameVersion {
        self.version
    }

    fn resolve(&self, name: &str) -> Result<u64> {
        let key = name.to_ascii_lowercase();

        if let Some(addr) = self.resolved.lock().unwrap().get(&key) {
            return Ok(*addr);
        }

        let addr = self.resolve_uncached(name)?;
        self.resolved.lock().unwrap().insert(key, addr);
        Ok(addr)
    }
}

/// Resolve a signature named by a bare identifier token.
///
/// `signature_of!(resolver, oCGame_Render)` reads like the engine headers
/// and expands to `resolver.resolve("oCGame_Render")`.
#[macro_export]
macro_rules! signature_of {
    ($resolver:expr, $name:ident) => {
        $crate::resolve::ResolveSignature::resolve(&$resolver, stringify!($name))
    };
}
