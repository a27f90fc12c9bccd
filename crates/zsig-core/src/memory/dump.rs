//! Raw memory dump reader.
//!
//! A dump is the in-memory image written to disk as-is (virtual layout, not
//! the PE file layout), paired with the base address it was captured at.
//! This is the cross-platform path: dumps taken on a Windows box can be
//! scanned anywhere.

use std::fs;
use std::path::Path;

use tracing::debug;

use super::{ReadMemory, check_bounds};
use crate::error::{Error, Result};
use crate::version::IMAGE_BASE;

pub struct DumpReader {
    base: u64,
    data: Vec<u8>,
}

impl DumpReader {
    /// Load a dump file captured at `base`. Pass [`IMAGE_BASE`] for the
    /// retail executables (they are fixed-base).
    pub fn load<P: AsRef<Path>>(path: P, base: u64) -> Result<Self> {
        let data = fs::read(&path)?;
        if data.is_empty() {
            return Err(Error::MemoryReadFailed {
                address: base,
                message: format!("dump file {} is empty", path.as_ref().display()),
            });
        }
        debug!(
            "Loaded dump {} ({} bytes at base {:#x})",
            path.as_ref().display(),
            data.len(),
            base
        );
        Ok(Self { base, data })
    }

    /// Load a dump captured at the fixed retail image base.
    pub fn load_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load(path, IMAGE_BASE)
    }

    pub fn from_bytes(base: u64, data: Vec<u8>) -> Self {
        Self { base, data }
    }
}

impl ReadMemory for DumpReader {
    fn base_address(&self) -> u64 {
        self.base
    }

    fn image_size(&self) -> usize {
        self.data.len()
    }

    fn read_bytes(&self, addr: u64, len: usize) -> Result<Vec<u8>> {
        check_bounds(self.base, self.data.len(), addr, len)?;
        let offset = (addr - self.base) as usize;
        Ok(self.data[offset..offset + len].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_and_read() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&[0xAA, 0xBB, 0xCC, 0xDD]).unwrap();

        let reader = DumpReader::load(file.path(), 0x400000).unwrap();
        assert_eq!(reader.base_address(), 0x400000);
        assert_eq!(reader.image_size(), 4);
        assert_eq!(reader.read_bytes(0x400001, 2).unwrap(), vec![0xBB, 0xCC]);
        assert!(reader.read_bytes(0x400003, 2).is_err());
    }

    #[test]
    fn test_empty_dump_rejected() {
        let file = NamedTempFile::new().unwrap();
        assert!(DumpReader::load(file.path(), 0x400000).is_err());
    }
}
