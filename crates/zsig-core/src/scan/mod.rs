//! Image scanner: wildcard pattern matching and displacement decoding.

mod constants;

pub use constants::*;

use memchr::memchr_iter;
use tracing::debug;

use crate::error::{Error, Result};
use crate::memory::ReadMemory;
use crate::sig::CodeSignature;

pub struct Scanner<'a, R: ReadMemory + ?Sized> {
    reader: &'a R,
    chunk_size: usize,
}

impl<'a, R: ReadMemory + ?Sized> Scanner<'a, R> {
    pub fn new(reader: &'a R) -> Self {
        Self {
            reader,
            chunk_size: SCAN_CHUNK_SIZE,
        }
    }

    /// Scanner with a custom chunk size. Tests use tiny chunks to exercise
    /// matches spanning chunk boundaries.
    pub fn with_chunk_size(reader: &'a R, chunk_size: usize) -> Self {
        Self { reader, chunk_size }
    }

    /// All match addresses of `pattern` in the image, sorted and deduped.
    ///
    /// The image is read in chunks with a `pattern.len() - 1` tail carried
    /// between chunks, so a match spanning a boundary is found exactly once.
    pub fn find_all(&self, pattern: &[Option<u8>]) -> Result<Vec<u64>> {
        let base = self.reader.base_address();
        let limit = self.reader.image_size();
        let mut results: Vec<u64> = Vec::new();
        let mut scanned: usize = 0;
        let mut tail: Vec<u8> = Vec::new();

        while scanned < limit {
            let remaining = limit - scanned;
            let read_size = remaining.min(self.chunk_size);
            let addr = base + scanned as u64;

            let chunk = match self.reader.read_bytes(addr, read_size) {
                Ok(bytes) => bytes,
                Err(e) => {
                    if scanned == 0 {
                        return Err(Error::ResolveFailed(format!(
                            "failed to read image start: {}",
                            e
                        )));
                    }
                    debug!(
                        "Scan stopped at offset {:#x} of {:#x}: {}",
                        scanned, limit, e
                    );
                    break;
                }
            };

            let mut data = Vec::with_capacity(tail.len() + chunk.len());
            data.extend_from_slice(&tail);
            data.extend_from_slice(&chunk);

            let data_base = addr - tail.len() as u64;
            find_in_buffer(&data, data_base, pattern, &mut results);

            if pattern.len() > 1 {
                let keep = (pattern.len() - 1).min(data.len());
                tail = data[data.len() - keep..].to_vec();
            } else {
                tail.clear();
            }

            scanned += read_size;
        }

        results.sort_unstable();
        results.dedup();
        Ok(results)
    }

    pub fn find_first(&self, pattern: &[Option<u8>]) -> Result<Option<u64>> {
        Ok(self.find_all(pattern)?.into_iter().next())
    }

    /// Match a signature and decode every referenced address.
    ///
    /// Per match: read the 4-byte operand at `disp_offset`, interpret it as
    /// absolute imm32 or rel32 per the signature, then apply the optional
    /// dereference and addend. Targets outside the image are dropped.
    pub fn resolve_targets(&self, signature: &CodeSignature) -> Result<Vec<u64>> {
        let pattern = signature.pattern_bytes()?;
        let matches = self.find_all(&pattern)?;
        let mut targets = Vec::new();

        for match_addr in matches {
            let disp_addr = match_addr + signature.disp_offset as u64;
            let disp = match self.reader.read_i32(disp_addr) {
                Ok(v) => v,
                Err(_) => continue,
            };

            let mut target = if signature.relative {
                let next_ip = match_addr + signature.instr_len as u64;
                next_ip.wrapping_add_signed(disp as i64)
            } else {
                disp as u32 as u64
            };

            if signature.deref {
                if !self.reader.contains(target) {
                    debug!(
                        "Rejecting deref through {:#x} (outside image)",
                        target
                    );
                    continue;
                }
                // 32-bit image: pointer cells are 4 bytes.
                match self.reader.read_u32(target) {
                    Ok(ptr) => target = ptr as u64,
                    Err(_) => continue,
                }
            }

            if signature.addend != 0 {
                target = target.wrapping_add_signed(signature.addend);
            }

            if !self.reader.contains(target) {
                debug!(
                    "Rejecting target {:#x} from match {:#x} (outside image)",
                    target, match_addr
                );
                continue;
            }

            targets.push(target);
        }

        targets.sort_unstable();
        targets.dedup();
        Ok(targets)
    }
}

/// Wildcard match over a buffer, anchored on the first concrete pattern
/// byte with memchr.
fn find_in_buffer(buffer: &[u8], base_addr: u64, pattern: &[Option<u8>], out: &mut Vec<u64>) {
    if pattern.is_empty() || buffer.len() < pattern.len() {
        return;
    }

    // parse_pattern guarantees a concrete first byte; hand-built patterns
    // may not, so anchor on the first concrete byte wherever it sits.
    let (anchor_idx, anchor) = match pattern
        .iter()
        .enumerate()
        .find_map(|(i, b)| b.map(|v| (i, v)))
    {
        Some(found) => found,
        None => {
            // All-wildcard pattern matches everywhere; nobody needs that.
            return;
        }
    };

    let last_start = buffer.len() - pattern.len();

    for pos in memchr_iter(anchor, buffer) {
        let Some(start) = pos.checked_sub(anchor_idx) else {
            continue;
        };
        if start > last_start {
            break;
        }

        let matched = pattern
            .iter()
            .enumerate()
            .all(|(j, byte)| byte.is_none_or(|value| buffer[start + j] == value));

        if matched {
            out.push(base_addr + start as u64);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MockMemoryBuilder;
    use crate::sig::parse_pattern;

    const BASE: u64 = 0x40_0000;

    #[test]
    fn test_find_all_with_wildcards() {
        let reader = MockMemoryBuilder::new(BASE, 0x100)
            .write_bytes(0x10, &[0xE8, 0x11, 0x22, 0x33, 0x44, 0x8B])
            .write_bytes(0x40, &[0xE8, 0x99, 0x88, 0x77, 0x66, 0x8B])
            .write_bytes(0x60, &[0xE8, 0x99, 0x88, 0x77, 0x66, 0x90])
            .build();

        let pattern = parse_pattern("E8 ?? ?? ?? ?? 8B").unwrap();
        let matches = Scanner::new(&reader).find_all(&pattern).unwrap();
        assert_eq!(matches, vec![BASE + 0x10, BASE + 0x40]);
    }

    #[test]
    fn test_match_spanning_chunk_boundary_found_once() {
        let needle = [0x55u8, 0x8B, 0xEC, 0x83, 0xEC, 0x20];
        // Place the needle straddling the 0x40 chunk boundary.
        let reader = MockMemoryBuilder::new(BASE, 0x100)
            .write_bytes(0x3D, &needle)
            .build();

        let pattern = parse_pattern("55 8B EC 83 EC 20").unwrap();
        let scanner = Scanner::with_chunk_size(&reader, 0x40);
        assert_eq!(scanner.find_all(&pattern).unwrap(), vec![BASE + 0x3D]);
    }

    #[test]
    fn test_pattern_longer_than_image() {
        let reader = MockMemoryBuilder::new(BASE, 4).build();
        let pattern = parse_pattern("01 02 03 04 05 06").unwrap();
        assert!(Scanner::new(&reader).find_all(&pattern).unwrap().is_empty());
    }

    #[test]
    fn test_resolve_relative_target() {
        // call rel32 at 0x20: E8 disp32, next_ip = 0x400025, disp = 0x30
        let reader = MockMemoryBuilder::new(BASE, 0x100)
            .write_bytes(0x20, &[0xE8])
            .write_i32(0x21, 0x30)
            .write_bytes(0x25, &[0x8B, 0x4E])
            .build();

        let signature = CodeSignature {
            pattern: "E8 ?? ?? ?? ?? 8B 4E".to_string(),
            disp_offset: 1,
            relative: true,
            instr_len: 5,
            deref: false,
            addend: 0,
        };
        let targets = Scanner::new(&reader).resolve_targets(&signature).unwrap();
        assert_eq!(targets, vec![BASE + 0x25 + 0x30]);
    }

    #[test]
    fn test_resolve_absolute_with_deref_and_addend() {
        // mov eax, [0x400080]; the cell at 0x80 holds 0x400090.
        let reader = MockMemoryBuilder::new(BASE, 0x100)
            .write_bytes(0x20, &[0xA1])
            .write_u32(0x21, (BASE + 0x80) as u32)
            .write_bytes(0x25, &[0x8B, 0x48, 0x04])
            .write_u32(0x80, (BASE + 0x90) as u32)
            .build();

        let signature = CodeSignature {
            pattern: "A1 ?? ?? ?? ?? 8B 48 04".to_string(),
            disp_offset: 1,
            relative: false,
            instr_len: 0,
            deref: true,
            addend: 8,
        };
        let targets = Scanner::new(&reader).resolve_targets(&signature).unwrap();
        assert_eq!(targets, vec![BASE + 0x98]);
    }

    #[test]
    fn test_resolve_rejects_out_of_image_target() {
        // rel32 pointing far below the image base.
        let reader = MockMemoryBuilder::new(BASE, 0x100)
            .write_bytes(0x20, &[0xE8])
            .write_i32(0x21, -0x10_0000)
            .write_bytes(0x25, &[0x8B, 0x4E])
            .build();

        let signature = CodeSignature {
            pattern: "E8 ?? ?? ?? ?? 8B 4E".to_string(),
            disp_offset: 1,
            relative: true,
            instr_len: 5,
            deref: false,
            addend: 0,
        };
        let targets = Scanner::new(&reader).resolve_targets(&signature).unwrap();
        assert!(targets.is_empty());
    }
}
