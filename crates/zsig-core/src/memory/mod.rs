//! Access to the loaded executable image.
//!
//! Everything above this module goes through the [`ReadMemory`] trait, so
//! the scanner and resolver work identically against a live process, a raw
//! memory dump, or a test double.

mod dump;
#[cfg(target_os = "windows")]
mod process;

#[cfg(test)]
pub mod mock;

pub use dump::DumpReader;
#[cfg(target_os = "windows")]
pub use process::{MemoryReader, ProcessHandle};

#[cfg(test)]
pub use mock::{MockMemoryBuilder, MockMemoryReader};

use crate::error::{Error, Result};

/// Read access to a loaded (or dumped) executable image.
///
/// Addresses are virtual addresses, not offsets: the image occupies
/// `[base_address, base_address + image_size)`.
pub trait ReadMemory {
    fn base_address(&self) -> u64;

    fn image_size(&self) -> usize;

    fn read_bytes(&self, addr: u64, len: usize) -> Result<Vec<u8>>;

    fn contains(&self, addr: u64) -> bool {
        let base = self.base_address();
        addr >= base && addr - base < self.image_size() as u64
    }

    fn read_u8(&self, addr: u64) -> Result<u8> {
        Ok(self.read_bytes(addr, 1)?[0])
    }

    fn read_u16(&self, addr: u64) -> Result<u16> {
        let bytes = self.read_bytes(addr, 2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    fn read_u32(&self, addr: u64) -> Result<u32> {
        let bytes = self.read_bytes(addr, 4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_i32(&self, addr: u64) -> Result<i32> {
        let bytes = self.read_bytes(addr, 4)?;
        Ok(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_u64(&self, addr: u64) -> Result<u64> {
        let bytes = self.read_bytes(addr, 8)?;
        Ok(u64::from_le_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ]))
    }
}

/// Reject reads that fall outside the image before touching the backend.
pub(crate) fn check_bounds(base: u64, size: usize, addr: u64, len: usize) -> Result<()> {
    let end = base.checked_add(size as u64).ok_or_else(|| Error::MemoryReadFailed {
        address: addr,
        message: format!(
            "image bounds overflow: base {:#x} + size {:#x}",
            base, size
        ),
    })?;
    let read_end = addr.checked_add(len as u64).unwrap_or(u64::MAX);
    if addr < base || read_end > end {
        return Err(Error::MemoryReadFailed {
            address: addr,
            message: format!(
                "read of {} bytes outside image [{:#x}, {:#x})",
                len, base, end
            ),
        });
    }
    Ok(())
}
