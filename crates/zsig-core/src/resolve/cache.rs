//! Resolved-address cache for faster startup.
//!
//! Scanning the image for every signature takes a noticeable moment on
//! attach. Addresses are stable for a given build, so they are persisted
//! keyed by version tag and image size and reused while they stay fresh.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::version::GameVersion;

/// Cache file name
const CACHE_FILE: &str = ".zsig-cache.json";

/// Maximum age for cache validity (24 hours)
const MAX_CACHE_AGE_SECS: u64 = 24 * 60 * 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressCache {
    pub version: GameVersion,
    /// `SizeOfImage` the addresses were resolved against. A patched exe
    /// changes size before it changes anything else we can see cheaply.
    pub image_size: usize,
    pub addresses: HashMap<String, u64>,
    /// Cache creation timestamp (Unix seconds)
    pub created_at: u64,
}

impl AddressCache {
    pub fn new(version: GameVersion, image_size: usize, addresses: HashMap<String, u64>) -> Self {
        let created_at = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        Self {
            version,
            image_size,
            addresses,
            created_at,
        }
    }

    pub fn load() -> Option<Self> {
        Self::load_from_path(CACHE_FILE)
    }

    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Option<Self> {
        let content = match fs::read_to_string(path.as_ref()) {
            Ok(c) => c,
            Err(e) => {
                debug!("Cache file not found or unreadable: {}", e);
                return None;
            }
        };

        match serde_json::from_str::<AddressCache>(&content) {
            Ok(cache) => {
                debug!(
                    "Loaded cache: version={}, {} addresses, created_at={}",
                    cache.version.tag(),
                    cache.addresses.len(),
                    cache.created_at
                );
                Some(cache)
            }
            Err(e) => {
                warn!("Failed to parse cache file: {}", e);
                None
            }
        }
    }

    pub fn save(&self) -> Result<(), std::io::Error> {
        self.save_to_path(CACHE_FILE)
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        fs::write(&path, content)?;
        info!("Saved address cache to {}", path.as_ref().display());
        Ok(())
    }

    /// Check if the cache applies to the given image.
    pub fn is_valid_for(&self, version: GameVersion, image_size: usize) -> bool {
        if self.version != version {
            debug!(
                "Cache version mismatch: cached={}, current={}",
                self.version.tag(),
                version.tag()
            );
            return false;
        }

        if self.image_size != image_size {
            debug!(
                "Cache image size mismatch: cached={:#x}, current={:#x}",
                self.image_size, image_size
            );
            return false;
        }

        let now = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        let age = now.saturating_sub(self.created_at);
        if age > MAX_CACHE_AGE_SECS {
            debug!("Cache expired: age={} seconds", age);
            return false;
        }

        if self.addresses.is_empty() {
            debug!("Cache holds no addresses");
            return false;
        }

        true
    }
}

/// Load cached addresses if they apply to the given image.
pub fn try_load_cached(version: GameVersion, image_size: usize) -> Option<HashMap<String, u64>> {
    let cache = AddressCache::load()?;

    if cache.is_valid_for(version, image_size) {
        info!(
            "Using {} cached addresses for {}",
            cache.addresses.len(),
            version.tag()
        );
        Some(cache.addresses)
    } else {
        None
    }
}

/// Persist resolved addresses for the next run.
pub fn save_to_cache(version: GameVersion, image_size: usize, addresses: HashMap<String, u64>) {
    if addresses.is_empty() {
        return;
    }
    let cache = AddressCache::new(version, image_size, addresses);
    if let Err(e) = cache.save() {
        warn!("Failed to save address cache: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn sample_addresses() -> HashMap<String, u64> {
        let mut addresses = HashMap::new();
        addresses.insert("zCParser_Parse".to_string(), 0x44_1230);
        addresses.insert("oCGame_Render".to_string(), 0x46_AA00);
        addresses
    }

    #[test]
    fn test_cache_save_and_load() {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path().to_path_buf();

        let cache = AddressCache::new(GameVersion::Gothic2Addon, 0x8E_9000, sample_addresses());
        cache.save_to_path(&path).unwrap();

        let loaded = AddressCache::load_from_path(&path).unwrap();
        assert_eq!(loaded.version, GameVersion::Gothic2Addon);
        assert_eq!(loaded.addresses["zCParser_Parse"], 0x44_1230);
        assert!(loaded.is_valid_for(GameVersion::Gothic2Addon, 0x8E_9000));
    }

    #[test]
    fn test_cache_version_mismatch() {
        let cache = AddressCache::new(GameVersion::Gothic2Addon, 0x8E_9000, sample_addresses());
        assert!(!cache.is_valid_for(GameVersion::Gothic2Classic, 0x8E_9000));
    }

    #[test]
    fn test_cache_image_size_mismatch() {
        let cache = AddressCache::new(GameVersion::Gothic2Addon, 0x8E_9000, sample_addresses());
        assert!(!cache.is_valid_for(GameVersion::Gothic2Addon, 0x8E_A000));
    }

    #[test]
    fn test_cache_empty_addresses_invalid() {
        let cache = AddressCache::new(GameVersion::Gothic1Classic, 0x76_C000, HashMap::new());
        assert!(!cache.is_valid_for(GameVersion::Gothic1Classic, 0x76_C000));
    }

    #[test]
    fn test_cache_expired() {
        let mut cache = AddressCache::new(GameVersion::Gothic1Addon, 0x78_3000, sample_addresses());
        cache.created_at = cache.created_at.saturating_sub(MAX_CACHE_AGE_SECS + 60);
        assert!(!cache.is_valid_for(GameVersion::Gothic1Addon, 0x78_3000));
    }
}
