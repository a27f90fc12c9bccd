//! # zsig-core
//!
//! Core library for the zsig signature resolver.
//!
//! This crate provides:
//! - Process/image memory access behind a common reader trait
//! - Wildcard byte-pattern (AOB) scanning with displacement decoding
//! - Game version detection for the four retail engine builds
//! - Named signature sets and a lazy, memoizing address resolver
//! - Symbol tooling for authoring signature sets from name exports
//!
//! The resolver is selected once at attach time from the detected game
//! version; individual names resolve lazily and are memoized, optionally
//! persisted across runs via the address cache.

pub mod error;
pub mod memory;
pub mod resolve;
pub mod scan;
pub mod sig;
pub mod symbols;
pub mod version;

pub use error::{Error, Result};
pub use memory::{DumpReader, ReadMemory};
#[cfg(target_os = "windows")]
pub use memory::{MemoryReader, ProcessHandle};
pub use resolve::{
    AddressCache, EngineResolver, ResolveSignature, save_to_cache, try_load_cached,
};
pub use scan::Scanner;
pub use sig::{
    CodeSignature, SignatureDatabase, SignatureEntry, SignatureSet, builtin_signatures,
    exact_pattern, format_pattern, load_signatures, parse_pattern, save_signatures,
};
pub use symbols::{
    NamedSymbol, SymbolInfo, entry_name, generate_set, parse_names_export, parse_symbol,
};
pub use version::{DetectedImage, GameVersion, IMAGE_BASE, detect_version};
