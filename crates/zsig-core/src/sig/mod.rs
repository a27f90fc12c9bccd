//! Signature model: wildcard byte patterns and the displacement decode
//! rules that turn a pattern match into the address it references.

pub mod builtin;

pub use builtin::{SignatureDatabase, builtin_signatures};

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::version::GameVersion;

/// One scannable pattern plus the rule for extracting an address from the
/// matched instruction sequence.
///
/// The retail builds are 32-bit x86, so the operand at `disp_offset` is a
/// 4-byte little-endian value interpreted either as an absolute address
/// (`mov eax, [imm32]` style, `relative: false`) or as a rel32 displacement
/// (`call`/`jmp`, `relative: true`, target = match + `instr_len` + disp).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeSignature {
    pub pattern: String,
    #[serde(default)]
    pub disp_offset: usize,
    #[serde(default)]
    pub relative: bool,
    #[serde(default)]
    pub instr_len: usize,
    #[serde(default)]
    pub deref: bool,
    #[serde(default)]
    pub addend: i64,
}

impl CodeSignature {
    pub fn pattern_bytes(&self) -> Result<Vec<Option<u8>>> {
        parse_pattern(&self.pattern)
    }

    /// Check the signature is internally consistent without scanning.
    pub fn validate(&self) -> Result<()> {
        let bytes = self.pattern_bytes()?;
        if self.disp_offset + 4 > bytes.len() {
            return Err(Error::InvalidPattern(format!(
                "displacement at offset {} runs past the {}-byte pattern",
                self.disp_offset,
                bytes.len()
            )));
        }
        if self.relative && self.instr_len < self.disp_offset + 4 {
            return Err(Error::InvalidPattern(format!(
                "instr_len {} too short for rel32 operand at offset {}",
                self.instr_len, self.disp_offset
            )));
        }
        Ok(())
    }
}

/// A named signature with alternative patterns, tried in order.
///
/// Later game patches occasionally rebuild a function; keeping the old
/// pattern first and the patched one second lets one set serve both.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureEntry {
    pub name: String,
    pub signatures: Vec<CodeSignature>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureSet {
    pub version: GameVersion,
    pub entries: Vec<SignatureEntry>,
}

impl SignatureSet {
    pub fn entry(&self, name: &str) -> Option<&SignatureEntry> {
        self.entries
            .iter()
            .find(|entry| entry.name.eq_ignore_ascii_case(name))
    }

    /// Entry names must be unique (case-insensitive) and every pattern must
    /// parse; enforced on load so a bad set fails early, not mid-resolve.
    pub fn validate(&self) -> Result<()> {
        let mut seen: Vec<String> = Vec::new();
        for entry in &self.entries {
            let lower = entry.name.to_ascii_lowercase();
            if seen.contains(&lower) {
                return Err(Error::InvalidPattern(format!(
                    "duplicate signature entry '{}'",
                    entry.name
                )));
            }
            seen.push(lower);

            for signature in &entry.signatures {
                signature.validate().map_err(|e| {
                    Error::InvalidPattern(format!("entry '{}': {}", entry.name, e))
                })?;
            }
        }
        Ok(())
    }
}

pub fn load_signatures<P: AsRef<Path>>(path: P) -> Result<SignatureSet> {
    let content = fs::read_to_string(&path)?;
    let set: SignatureSet = serde_json::from_str(&content)?;
    set.validate()?;
    Ok(set)
}

pub fn save_signatures<P: AsRef<Path>>(path: P, set: &SignatureSet) -> Result<()> {
    let content = serde_json::to_string_pretty(set)?;
    fs::write(path, content)?;
    Ok(())
}

/// Parse an AOB pattern ("E8 ?? ?? ?? ?? 8B 4C 24") into match bytes.
///
/// The first byte must be concrete: the scanner anchors its candidate
/// search on it.
pub fn parse_pattern(pattern: &str) -> Result<Vec<Option<u8>>> {
    let mut bytes = Vec::new();
    for token in pattern.split_whitespace() {
        if token == "??" || token == "?" {
            bytes.push(None);
            continue;
        }

        let value = u8::from_str_radix(token, 16).map_err(|e| {
            Error::InvalidPattern(format!("invalid token '{}': {}", token, e))
        })?;
        bytes.push(Some(value));
    }

    if bytes.is_empty() {
        return Err(Error::InvalidPattern("pattern is empty".to_string()));
    }
    if bytes[0].is_none() {
        return Err(Error::InvalidPattern(
            "pattern must start with a concrete byte".to_string(),
        ));
    }

    Ok(bytes)
}

pub fn format_pattern(bytes: &[Option<u8>]) -> String {
    bytes
        .iter()
        .map(|b| match b {
            Some(value) => format!("{:02X}", value),
            None => "??".to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Build an all-concrete pattern from raw bytes (marker-string scans).
pub fn exact_pattern(bytes: &[u8]) -> Vec<Option<u8>> {
    bytes.iter().copied().map(Some).collect()
}
