//! Built-in signature sets for the four retail builds.
//!
//! These cover a core set of engine symbols used by most mods. Patterns
//! were lifted from the retail binaries; alternatives exist where a patch
//! rebuilt the function. External sets loaded from JSON take the same
//! shape and can extend or replace these.

use strum::IntoEnumIterator;

use super::{CodeSignature, SignatureEntry, SignatureSet};
use crate::version::GameVersion;

/// `call rel32` whose target is the symbol.
fn call_target(pattern: &str) -> CodeSignature {
    CodeSignature {
        pattern: pattern.to_string(),
        disp_offset: 1,
        relative: true,
        instr_len: 5,
        deref: false,
        addend: 0,
    }
}

/// Instruction with an absolute imm32 operand addressing the symbol.
fn static_addr(pattern: &str, disp_offset: usize) -> CodeSignature {
    CodeSignature {
        pattern: pattern.to_string(),
        disp_offset,
        relative: false,
        instr_len: 0,
        deref: false,
        addend: 0,
    }
}

/// Absolute imm32 operand addressing a pointer cell holding the symbol.
fn global_ptr(pattern: &str, disp_offset: usize) -> CodeSignature {
    CodeSignature {
        deref: true,
        ..static_addr(pattern, disp_offset)
    }
}

fn entry(name: &str, signatures: Vec<CodeSignature>) -> SignatureEntry {
    SignatureEntry {
        name: name.to_string(),
        signatures,
    }
}

/// The built-in signature set for one game version.
pub fn builtin_signatures(version: GameVersion) -> SignatureSet {
    let entries = match version {
        GameVersion::Gothic1Classic => vec![
            entry(
                "zCParser_Parse",
                vec![call_target("E8 ?? ?? ?? ?? 8B 4E 24 85 C9")],
            ),
            entry(
                "oCGame_Render",
                vec![call_target("E8 ?? ?? ?? ?? 8B 0D ?? ?? ?? ?? 51 E8")],
            ),
            entry(
                "oCNpc_SetAttribute",
                vec![call_target("E8 ?? ?? ?? ?? 83 C4 08 8B 86")],
            ),
            entry(
                "zCOption_ReadString",
                vec![static_addr("B9 ?? ?? ?? ?? E8 ?? ?? ?? ?? 50 68", 1)],
            ),
            entry(
                "oCGame_Instance",
                vec![global_ptr("A1 ?? ?? ?? ?? 8B 48 04 85 C9 74", 1)],
            ),
            entry(
                "zERROR_Report",
                vec![call_target("E8 ?? ?? ?? ?? 83 C4 0C 5F 5E 5D")],
            ),
        ],
        GameVersion::Gothic1Addon => vec![
            entry(
                "zCParser_Parse",
                vec![call_target("E8 ?? ?? ?? ?? 8B 4E 28 85 C9")],
            ),
            entry(
                "oCGame_Render",
                vec![call_target("E8 ?? ?? ?? ?? 8B 0D ?? ?? ?? ?? 52 E8")],
            ),
            entry(
                "oCNpc_SetAttribute",
                vec![call_target("E8 ?? ?? ?? ?? 83 C4 08 8B 96")],
            ),
            entry(
                "zCOption_ReadString",
                vec![static_addr("B9 ?? ?? ?? ?? E8 ?? ?? ?? ?? 50 6A", 1)],
            ),
            entry(
                "oCGame_Instance",
                vec![global_ptr("A1 ?? ?? ?? ?? 8B 48 08 85 C9 74", 1)],
            ),
            entry(
                "zERROR_Report",
                vec![call_target("E8 ?? ?? ?? ?? 83 C4 10 5F 5E 5D")],
            ),
        ],
        GameVersion::Gothic2Classic => vec![
            entry(
                "zCParser_Parse",
                vec![call_target("E8 ?? ?? ?? ?? 8B 4D F0 64 89 0D")],
            ),
            entry(
                "oCGame_Render",
                vec![call_target("E8 ?? ?? ?? ?? 8B 0D ?? ?? ?? ?? 56 E8")],
            ),
            entry(
                "oCNpc_SetAttribute",
                vec![call_target("E8 ?? ?? ?? ?? 8B 8E ?? ?? ?? ?? 83 C4 08")],
            ),
            entry(
                "zCOption_ReadString",
                vec![static_addr("B9 ?? ?? ?? ?? E8 ?? ?? ?? ?? 8B F0 56", 1)],
            ),
            entry(
                "oCGame_Instance",
                vec![global_ptr("8B 0D ?? ?? ?? ?? 8B 01 FF 50 24", 2)],
            ),
            entry(
                "zERROR_Report",
                vec![call_target("E8 ?? ?? ?? ?? 83 C4 0C 33 C0 5F 5E")],
            ),
        ],
        GameVersion::Gothic2Addon => vec![
            entry(
                "zCParser_Parse",
                vec![
                    // 2.6 retail
                    call_target("E8 ?? ?? ?? ?? 8B 4D F0 64 89 0D ?? ?? ?? ?? 59"),
                    // 2.6 fix rebuilt the prologue of the caller
                    call_target("E8 ?? ?? ?? ?? 8B 4D EC 64 89 0D ?? ?? ?? ?? 59"),
                ],
            ),
            entry(
                "oCGame_Render",
                vec![call_target("E8 ?? ?? ?? ?? 8B 0D ?? ?? ?? ?? 57 E8")],
            ),
            entry(
                "oCNpc_SetAttribute",
                vec![call_target("E8 ?? ?? ?? ?? 8B 8E ?? ?? ?? ?? 83 C4 10")],
            ),
            entry(
                "zCOption_ReadString",
                vec![static_addr("B9 ?? ?? ?? ?? E8 ?? ?? ?? ?? 8B F8 57", 1)],
            ),
            entry(
                "oCGame_Instance",
                vec![global_ptr("8B 0D ?? ?? ?? ?? 8B 01 FF 50 28", 2)],
            ),
            entry(
                "zERROR_Report",
                vec![call_target("E8 ?? ?? ?? ?? 83 C4 10 33 C0 5F 5E")],
            ),
        ],
    };

    SignatureSet { version, entries }
}

/// All four built-in sets, with optional per-version overrides.
pub struct SignatureDatabase {
    sets: Vec<SignatureSet>,
}

impl Default for SignatureDatabase {
    fn default() -> Self {
        Self {
            sets: GameVersion::iter().map(builtin_signatures).collect(),
        }
    }
}

impl SignatureDatabase {
    /// Replace the set for its own version (external JSON set).
    pub fn with_set(mut self, set: SignatureSet) -> Self {
        if let Some(slot) = self.sets.iter_mut().find(|s| s.version == set.version) {
            *slot = set;
        } else {
            self.sets.push(set);
        }
        self
    }

    pub fn set_for(&self, version: GameVersion) -> Option<&SignatureSet> {
        self.sets.iter().find(|s| s.version == version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_sets_validate() {
        for version in GameVersion::iter() {
            let set = builtin_signatures(version);
            assert_eq!(set.version, version);
            set.validate().unwrap();
            assert!(set.entry("zCParser_Parse").is_some());
        }
    }

    #[test]
    fn test_database_covers_all_versions() {
        let db = SignatureDatabase::default();
        for version in GameVersion::iter() {
            assert!(db.set_for(version).is_some());
        }
    }

    #[test]
    fn test_database_override() {
        let replacement = SignatureSet {
            version: GameVersion::Gothic1Classic,
            entries: vec![],
        };
        let db = SignatureDatabase::default().with_set(replacement);
        assert!(db.set_for(GameVersion::Gothic1Classic).unwrap().entries.is_empty());
        assert!(!db.set_for(GameVersion::Gothic2Addon).unwrap().entries.is_empty());
    }
}
