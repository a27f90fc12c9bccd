//! Runtime game version detection.
//!
//! The four retail builds ship identical-looking executables (the exe name
//! alone never identifies the version), so detection fingerprints the
//! loaded image instead:
//!
//! 1. `SizeOfImage` lookup against the known retail sizes.
//! 2. Fallback: scan the image for the per-version engine banner string.
//!
//! An image matching neither is a hard error, never a guess.

use encoding_rs::WINDOWS_1252;
use strum::IntoEnumIterator;
use tracing::{debug, info, warn};

use super::GameVersion;
use crate::error::{Error, Result};
use crate::memory::ReadMemory;
use crate::scan::{MARKER_CONTEXT_BYTES, Scanner};
use crate::sig::exact_pattern;

/// What detection learned about the image.
#[derive(Debug, Clone)]
pub struct DetectedImage {
    pub version: GameVersion,
    pub base_address: u64,
    pub image_size: usize,
    /// Engine banner decoded from the image, when found.
    pub banner: Option<String>,
}

/// Detect which of the four builds the image is.
pub fn detect_version<R: ReadMemory + ?Sized>(reader: &R) -> Result<DetectedImage> {
    let base_address = reader.base_address();
    let image_size = reader.image_size();

    let size_matches: Vec<GameVersion> = GameVersion::iter()
        .filter(|v| v.image_size() == image_size)
        .collect();

    match size_matches.as_slice() {
        [version] => {
            debug!(
                "Image size {:#x} fingerprints {}",
                image_size,
                version.tag()
            );
            let banner = find_banner(reader, *version);
            if let Some(ref text) = banner {
                debug!("Engine banner: {:?}", text);
            }
            info!("Detected {} by image size", version.namespace_name());
            Ok(DetectedImage {
                version: *version,
                base_address,
                image_size,
                banner,
            })
        }
        [] => {
            warn!(
                "Image size {:#x} matches no retail build, falling back to banner scan",
                image_size
            );
            detect_by_banner(reader, GameVersion::iter())
        }
        several => {
            // Modified executables can collide on size; the banner decides.
            debug!(
                "Image size {:#x} is ambiguous ({:?}), falling back to banner scan",
                image_size, several
            );
            detect_by_banner(reader, several.iter().copied())
        }
    }
}

fn detect_by_banner<R, I>(reader: &R, candidates: I) -> Result<DetectedImage>
where
    R: ReadMemory + ?Sized,
    I: Iterator<Item = GameVersion>,
{
    for version in candidates {
        if let Some(banner) = find_banner(reader, version) {
            info!(
                "Detected {} by engine banner {:?}",
                version.namespace_name(),
                banner
            );
            return Ok(DetectedImage {
                version,
                base_address: reader.base_address(),
                image_size: reader.image_size(),
                banner: Some(banner),
            });
        }
    }

    Err(Error::VersionDetectFailed(format!(
        "image size {:#x} matches no retail build and no engine banner was found",
        reader.image_size()
    )))
}

/// Scan for the version's banner string; return the decoded banner line.
fn find_banner<R: ReadMemory + ?Sized>(reader: &R, version: GameVersion) -> Option<String> {
    let scanner = Scanner::new(reader);
    let pattern = exact_pattern(version.version_marker());
    let addr = scanner.find_first(&pattern).ok().flatten()?;

    // The banner is a NUL-terminated single-byte string; decode a window
    // around the match as WINDOWS_1252 (the engine's codepage).
    let window = reader
        .read_bytes(addr, MARKER_CONTEXT_BYTES)
        .unwrap_or_else(|_| version.version_marker().to_vec());
    let len = window.iter().position(|&b| b == 0).unwrap_or(window.len());
    let (decoded, _, _) = WINDOWS_1252.decode(&window[..len]);
    Some(decoded.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MockMemoryBuilder;

    fn image_with_marker(version: GameVersion, size: usize) -> crate::memory::MockMemoryReader {
        let mut marker = version.version_marker().to_vec();
        marker.push(0);
        MockMemoryBuilder::new(0x40_0000, size)
            .write_bytes(0x1200, &marker)
            .build()
    }

    #[test]
    fn test_detect_each_version_by_size() {
        for version in GameVersion::iter() {
            let reader = image_with_marker(version, version.image_size());
            let detected = detect_version(&reader).unwrap();
            assert_eq!(detected.version, version);
            assert_eq!(detected.image_size, version.image_size());
            assert_eq!(
                detected.banner.as_deref(),
                Some(std::str::from_utf8(version.version_marker()).unwrap())
            );
        }
    }

    #[test]
    fn test_detect_falls_back_to_banner_on_unknown_size() {
        let reader = image_with_marker(GameVersion::Gothic2Addon, 0x4000);
        let detected = detect_version(&reader).unwrap();
        assert_eq!(detected.version, GameVersion::Gothic2Addon);
    }

    #[test]
    fn test_detect_fails_on_unknown_image() {
        let reader = MockMemoryBuilder::new(0x40_0000, 0x4000).build();
        let err = detect_version(&reader).unwrap_err();
        assert!(matches!(err, Error::VersionDetectFailed(_)));
    }
}
