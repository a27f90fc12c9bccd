//! Test doubles for [`ReadMemory`].

use std::sync::atomic::{AtomicUsize, Ordering};

use super::{ReadMemory, check_bounds};
use crate::error::Result;

/// In-memory fake image. Starts zero-filled; content is written at offsets
/// relative to the base address via [`MockMemoryBuilder`].
pub struct MockMemoryReader {
    base: u64,
    data: Vec<u8>,
    reads: AtomicUsize,
}

impl MockMemoryReader {
    /// Number of `read_bytes` calls made so far. Used to assert laziness.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }
}

impl ReadMemory for MockMemoryReader {
    fn base_address(&self) -> u64 {
        self.base
    }

    fn image_size(&self) -> usize {
        self.data.len()
    }

    fn read_bytes(&self, addr: u64, len: usize) -> Result<Vec<u8>> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        check_bounds(self.base, self.data.len(), addr, len)?;
        let offset = (addr - self.base) as usize;
        Ok(self.data[offset..offset + len].to_vec())
    }
}

pub struct MockMemoryBuilder {
    base: u64,
    data: Vec<u8>,
}

impl MockMemoryBuilder {
    pub fn new(base: u64, size: usize) -> Self {
        Self {
            base,
            data: vec![0; size],
        }
    }

    pub fn write_bytes(mut self, offset: usize, bytes: &[u8]) -> Self {
        self.data[offset..offset + bytes.len()].copy_from_slice(bytes);
        self
    }

    pub fn write_u32(self, offset: usize, value: u32) -> Self {
        self.write_bytes(offset, &value.to_le_bytes())
    }

    pub fn write_i32(self, offset: usize, value: i32) -> Self {
        self.write_bytes(offset, &value.to_le_bytes())
    }

    pub fn build(self) -> MockMemoryReader {
        MockMemoryReader {
            base: self.base,
            data: self.data,
            reads: AtomicUsize::new(0),
        }
    }
}
