//! Disassembler name-export parsing and signature-set skeletons.
//!
//! The export format is one symbol per line: a hex address and the
//! demangled declaration, in either order (different disassemblers export
//! different orders). Lines that fail to parse (data symbols, vtables,
//! compiler thunks without declarations) are skipped and reported so an
//! operator can eyeball what was dropped.

use tracing::debug;

use super::{SymbolInfo, entry_name, parse_symbol};
use crate::error::Result;
use crate::sig::{SignatureEntry, SignatureSet};
use crate::version::GameVersion;

#[derive(Debug, Clone)]
pub struct NamedSymbol {
    pub address: u64,
    pub symbol: SymbolInfo,
}

/// Parse a names export. Returns the parsed symbols and the lines that
/// were skipped.
pub fn parse_names_export(content: &str) -> Result<(Vec<NamedSymbol>, Vec<String>)> {
    let mut symbols = Vec::new();
    let mut skipped = Vec::new();

    for raw_line in content.lines() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        let Some((address, declaration)) = split_address(line) else {
            skipped.push(line.to_string());
            continue;
        };

        match parse_symbol(normalize_declaration(declaration)) {
            Ok(symbol) => symbols.push(NamedSymbol { address, symbol }),
            Err(e) => {
                debug!("Skipping unparseable name: {}", e);
                skipped.push(line.to_string());
            }
        }
    }

    Ok((symbols, skipped))
}

/// Split a line into its address and declaration. The address may lead
/// (`address declaration`) or trail (`declaration address`).
fn split_address(line: &str) -> Option<(u64, &str)> {
    if let Some((first, rest)) = line.split_once(char::is_whitespace)
        && let Some(address) = parse_address_token(first)
    {
        return Some((address, rest));
    }
    if let Some((rest, last)) = line.rsplit_once(char::is_whitespace)
        && let Some(address) = parse_address_token(last)
    {
        return Some((address, rest));
    }
    None
}

fn parse_address_token(text: &str) -> Option<u64> {
    let digits = text.trim_start_matches("0x").trim_start_matches("0X");
    u64::from_str_radix(digits, 16).ok()
}

/// Strip export noise that precedes the actual declaration.
fn normalize_declaration(declaration: &str) -> &str {
    declaration.trim().trim_start_matches("[thunk]:").trim()
}

/// Build a signature-set skeleton from parsed symbols.
///
/// Entries carry no patterns yet (those are authored against the binary);
/// duplicates keep the first occurrence, matching the generator the
/// community tables came from.
pub fn generate_set(version: GameVersion, symbols: &[NamedSymbol]) -> SignatureSet {
    let mut entries: Vec<SignatureEntry> = Vec::new();
    let mut seen: Vec<String> = Vec::new();

    for named in symbols {
        let name = entry_name(&named.symbol);
        let lower = name.to_ascii_lowercase();
        if seen.contains(&lower) {
            debug!(
                "Skipping duplicate entry '{}' at {:#x}",
                name, named.address
            );
            continue;
        }
        seen.push(lower);
        entries.push(SignatureEntry {
            name,
            signatures: Vec::new(),
        });
    }

    SignatureSet { version, entries }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPORT: &str = "\
0041F2D0 public: int __thiscall zCParser::Parse(class zSTRING &)
0x00467A10 public: virtual void __thiscall oCGame::Render(void)
; comment line
00423380 class oCGame * ogame
00423390 public: int __thiscall zCParser::Parse(class zSTRING &)
garbage line without address
004AB000 public: __thiscall oCNpc::oCNpc(void)
";

    #[test]
    fn test_parse_names_export() {
        let (symbols, skipped) = parse_names_export(EXPORT).unwrap();

        // Both Parse occurrences survive parsing; dedup happens in
        // generate_set.
        assert_eq!(symbols.len(), 4);
        assert_eq!(symbols[0].address, 0x41F2D0);
        assert_eq!(symbols[0].symbol.qualified_name(), "zCParser::Parse");
        assert_eq!(symbols[1].address, 0x467A10);

        assert_eq!(skipped.len(), 2);
        assert!(skipped[0].contains("ogame"));
        assert!(skipped[1].contains("garbage"));
    }

    #[test]
    fn test_parse_names_export_address_last() {
        let export = "\
void __cdecl ExitGameFunc(void) 00401000
public: int __thiscall zCParser::Parse(class zSTRING &) 0x0041F2D0
";
        let (symbols, skipped) = parse_names_export(export).unwrap();

        assert_eq!(symbols.len(), 2);
        assert_eq!(symbols[0].address, 0x401000);
        assert_eq!(symbols[0].symbol.method_name, "ExitGameFunc");
        assert_eq!(symbols[1].address, 0x41F2D0);
        assert_eq!(symbols[1].symbol.qualified_name(), "zCParser::Parse");
        assert!(skipped.is_empty());
    }

    #[test]
    fn test_generate_set_skeleton() {
        let (symbols, _) = parse_names_export(EXPORT).unwrap();
        let set = generate_set(GameVersion::Gothic1Classic, &symbols);

        assert_eq!(set.version, GameVersion::Gothic1Classic);
        let names: Vec<_> = set.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["zCParser_Parse", "oCGame_Render", "oCNpc_Ctor"]);
        assert!(set.entries.iter().all(|e| e.signatures.is_empty()));
        // Skeleton still satisfies the set invariants.
        set.validate().unwrap();
    }
}
