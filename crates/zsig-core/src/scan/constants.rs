//! Scan tuning constants.

/// Chunk size for reading the image during a scan (1MB).
///
/// Reads go through `ReadProcessMemory` on live targets, so fewer, larger
/// reads win; 1MB keeps the working buffer small enough to stay cheap.
pub const SCAN_CHUNK_SIZE: usize = 1024 * 1024;

/// How many bytes around a marker match to decode when logging version
/// banners found in the image.
pub const MARKER_CONTEXT_BYTES: usize = 48;
