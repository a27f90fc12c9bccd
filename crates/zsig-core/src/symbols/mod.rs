//! Demangled C++ symbol parsing.
//!
//! Signature sets are authored from disassembler name exports whose names
//! are demangled MSVC declarations
//! (`public: virtual int __thiscall zCParser::Parse(class zSTRING &)`).
//! This module breaks such a declaration into its components so entry
//! names can be derived mechanically.

mod names;

pub use names::{NamedSymbol, generate_set, parse_names_export};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const CALLING_CONVENTIONS: &[&str] = &[
    "__thiscall",
    "__cdecl",
    "__stdcall",
    "__fastcall",
    "__vectorcall",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolInfo {
    pub return_type: String,
    pub calling_convention: String,
    /// Empty for free functions; may be nested (`A::B`) or templated.
    pub class_name: String,
    pub method_name: String,
    pub arguments: Vec<String>,
}

impl SymbolInfo {
    /// `Class::Method` key, matching the signature-table convention.
    pub fn qualified_name(&self) -> String {
        if self.class_name.is_empty() {
            self.method_name.clone()
        } else {
            format!("{}::{}", self.class_name, self.method_name)
        }
    }
}

/// Parse a demangled MSVC declaration into structured components.
///
/// Declarations without a calling convention (data symbols, vtables) are
/// rejected; the signature tables only carry functions.
pub fn parse_symbol(declaration: &str) -> Result<SymbolInfo> {
    let mut rest = declaration.trim();

    // Access specifier, thunk marker, storage qualifiers.
    for prefix in ["public:", "private:", "protected:", "[thunk]:"] {
        if let Some(stripped) = rest.strip_prefix(prefix) {
            rest = stripped.trim_start();
        }
    }
    loop {
        let mut stripped_any = false;
        for word in ["static", "virtual"] {
            if let Some(stripped) = strip_word(rest, word) {
                rest = stripped;
                stripped_any = true;
            }
        }
        if !stripped_any {
            break;
        }
    }

    // Split around the calling convention.
    let (return_part, callconv, after) = split_calling_convention(rest).ok_or_else(|| {
        Error::InvalidSymbol(format!("no calling convention in '{}'", declaration))
    })?;

    // Trailing cv-qualifiers sit after the closing paren.
    let mut body = after.trim();
    loop {
        let trimmed = body.trim_end();
        if let Some(stripped) = trimmed
            .strip_suffix("const")
            .or_else(|| trimmed.strip_suffix("volatile"))
        {
            body = stripped.trim_end();
        } else {
            body = trimmed;
            break;
        }
    }

    if !body.ends_with(')') {
        return Err(Error::InvalidSymbol(format!(
            "no argument list in '{}'",
            declaration
        )));
    }

    let open = matching_open_paren(body).ok_or_else(|| {
        Error::InvalidSymbol(format!("unbalanced parentheses in '{}'", declaration))
    })?;
    let qualified = body[..open].trim();
    let args_raw = &body[open + 1..body.len() - 1];

    if qualified.is_empty() {
        return Err(Error::InvalidSymbol(format!(
            "no method name in '{}'",
            declaration
        )));
    }

    let (class_name, method_name) = split_qualified_name(qualified);

    let arguments: Vec<String> = if args_raw.trim() == "void" || args_raw.trim().is_empty() {
        Vec::new()
    } else {
        split_top_level(args_raw, ',')
            .into_iter()
            .map(|arg| arg.trim().to_string())
            .filter(|arg| !arg.is_empty())
            .collect()
    };

    let mut return_type = return_part.trim().to_string();
    if return_type.is_empty() {
        // Constructors return the class; everything else nameless is void.
        return_type = if !class_name.is_empty() && method_name == last_segment(&class_name) {
            format!("{}*", class_name)
        } else {
            "void".to_string()
        };
    }

    Ok(SymbolInfo {
        return_type,
        calling_convention: callconv.to_string(),
        class_name,
        method_name,
        arguments,
    })
}

/// Derive the signature-entry name for a parsed symbol
/// (`zCParser::Parse` -> `zCParser_Parse`, operators mapped to words).
pub fn entry_name(symbol: &SymbolInfo) -> String {
    let method = method_slug(symbol);
    if symbol.class_name.is_empty() {
        method
    } else {
        format!("{}_{}", symbol.class_name.replace("::", "_"), method)
    }
}

fn method_slug(symbol: &SymbolInfo) -> String {
    let method = symbol.method_name.as_str();

    if method.starts_with('~') {
        return "Dtor".to_string();
    }
    if !symbol.class_name.is_empty() && method == last_segment(&symbol.class_name) {
        return "Ctor".to_string();
    }

    if let Some(op) = method.strip_prefix("operator") {
        let slug = match op.trim() {
            "=" => "Assign",
            "==" => "Eq",
            "!=" => "Ne",
            "<" => "Lt",
            ">" => "Gt",
            "+" => "Add",
            "-" => "Sub",
            "*" => "Mul",
            "/" => "Div",
            "[]" => "Index",
            "()" => "Call",
            "new" => "New",
            "delete" => "Delete",
            other => {
                // Conversion operators and the rest: sanitize.
                return format!("Op{}", sanitize(other));
            }
        };
        return format!("Op{}", slug);
    }

    sanitize(method)
}

fn sanitize(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn strip_word<'a>(text: &'a str, word: &str) -> Option<&'a str> {
    let stripped = text.strip_prefix(word)?;
    if stripped.starts_with(char::is_whitespace) {
        Some(stripped.trim_start())
    } else {
        None
    }
}

/// Find the declaration's calling convention: the earliest standalone
/// token match (calling conventions also appear inside function-pointer
/// argument types, which sit further right).
fn split_calling_convention(text: &str) -> Option<(&str, &str, &str)> {
    let mut earliest: Option<(usize, &str)> = None;

    for &callconv in CALLING_CONVENTIONS {
        for (pos, _) in text.match_indices(callconv) {
            let before = &text[..pos];
            let after = &text[pos + callconv.len()..];
            let ok_before = before.is_empty() || before.ends_with(char::is_whitespace);
            let ok_after = after.starts_with(char::is_whitespace);
            if ok_before && ok_after && earliest.is_none_or(|(best, _)| pos < best) {
                earliest = Some((pos, callconv));
            }
        }
    }

    earliest.map(|(pos, callconv)| {
        (
            &text[..pos],
            callconv,
            &text[pos + callconv.len()..],
        )
    })
}

/// Index of the '(' matching the trailing ')' of `text`.
fn matching_open_paren(text: &str) -> Option<usize> {
    let mut depth = 0i32;
    for (i, c) in text.char_indices().rev() {
        match c {
            ')' => depth += 1,
            '(' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split `A::B<x::y>::Method` into class (`A::B<x::y>`) and method.
fn split_qualified_name(qualified: &str) -> (String, String) {
    let bytes = qualified.as_bytes();
    let mut angle_depth = 0i32;
    let mut split_at = None;

    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'<' => angle_depth += 1,
            b'>' => angle_depth -= 1,
            b':' if angle_depth == 0 && i + 1 < bytes.len() && bytes[i + 1] == b':' => {
                // Keep the last top-level "::" before the method, but never
                // split inside "operator::" (not a real operator anyway).
                split_at = Some(i);
                i += 1;
            }
            _ => {}
        }
        i += 1;
    }

    match split_at {
        Some(pos) => (
            qualified[..pos].to_string(),
            qualified[pos + 2..].to_string(),
        ),
        None => (String::new(), qualified.to_string()),
    }
}

fn last_segment(class_name: &str) -> &str {
    // Template arguments may contain "::", so strip them first.
    let base = match class_name.find('<') {
        Some(pos) => &class_name[..pos],
        None => class_name,
    };
    base.rsplit("::").next().unwrap_or(base)
}

/// Split on `sep` ignoring separators nested in angle brackets or parens.
fn split_top_level(text: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;

    for (i, c) in text.char_indices() {
        match c {
            '<' | '(' => depth += 1,
            '>' | ')' => depth -= 1,
            c if c == sep && depth == 0 => {
                parts.push(&text[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_thiscall_method() {
        let symbol = parse_symbol(
            "public: virtual int __thiscall zCParser::Parse(class zSTRING &)",
        )
        .unwrap();
        assert_eq!(symbol.return_type, "int");
        assert_eq!(symbol.calling_convention, "__thiscall");
        assert_eq!(symbol.class_name, "zCParser");
        assert_eq!(symbol.method_name, "Parse");
        assert_eq!(symbol.arguments, vec!["class zSTRING &"]);
        assert_eq!(symbol.qualified_name(), "zCParser::Parse");
        assert_eq!(entry_name(&symbol), "zCParser_Parse");
    }

    #[test]
    fn test_parse_free_function() {
        let symbol = parse_symbol("void __cdecl ExitGameFunc(void)").unwrap();
        assert_eq!(symbol.class_name, "");
        assert_eq!(symbol.method_name, "ExitGameFunc");
        assert!(symbol.arguments.is_empty());
        assert_eq!(entry_name(&symbol), "ExitGameFunc");
    }

    #[test]
    fn test_parse_constructor_return_type() {
        let symbol = parse_symbol("public: __thiscall oCNpc::oCNpc(void)").unwrap();
        assert_eq!(symbol.return_type, "oCNpc*");
        assert_eq!(entry_name(&symbol), "oCNpc_Ctor");
    }

    #[test]
    fn test_parse_destructor() {
        let symbol = parse_symbol("public: virtual __thiscall oCNpc::~oCNpc(void)").unwrap();
        assert_eq!(symbol.return_type, "void");
        assert_eq!(entry_name(&symbol), "oCNpc_Dtor");
    }

    #[test]
    fn test_parse_thunk_and_static() {
        let symbol = parse_symbol(
            "[thunk]: public: virtual void __thiscall oCNpc::Archive(class zCArchiver &)",
        )
        .unwrap();
        assert_eq!(symbol.method_name, "Archive");

        let symbol =
            parse_symbol("public: static class zCParser * __cdecl zCParser::GetParser(void)")
                .unwrap();
        assert_eq!(symbol.return_type, "class zCParser *");
        assert_eq!(entry_name(&symbol), "zCParser_GetParser");
    }

    #[test]
    fn test_parse_operator_overloads() {
        let symbol = parse_symbol(
            "public: class zSTRING & __thiscall zSTRING::operator=(class zSTRING const &)",
        )
        .unwrap();
        assert_eq!(symbol.method_name, "operator=");
        assert_eq!(entry_name(&symbol), "zSTRING_OpAssign");

        let symbol = parse_symbol(
            "public: int __thiscall zSTRING::operator==(class zSTRING const &) const",
        )
        .unwrap();
        assert_eq!(entry_name(&symbol), "zSTRING_OpEq");
    }

    #[test]
    fn test_parse_templated_class() {
        let symbol = parse_symbol(
            "public: void __thiscall zCArray<class zCVob *>::InsertEnd(class zCVob *)",
        )
        .unwrap();
        assert_eq!(symbol.class_name, "zCArray<class zCVob *>");
        assert_eq!(symbol.method_name, "InsertEnd");
        assert_eq!(symbol.arguments.len(), 1);
    }

    #[test]
    fn test_parse_nested_paren_arguments() {
        let symbol = parse_symbol(
            "public: void __thiscall zCMenu::SetCallback(void (__cdecl *)(int, int))",
        )
        .unwrap();
        assert_eq!(symbol.arguments, vec!["void (__cdecl *)(int, int)"]);
    }

    #[test]
    fn test_parse_cv_qualified_method() {
        let symbol =
            parse_symbol("public: int __thiscall zSTRING::Length(void) const").unwrap();
        assert_eq!(symbol.method_name, "Length");
        assert!(symbol.arguments.is_empty());
    }

    #[test]
    fn test_reject_data_symbols() {
        assert!(parse_symbol("class oCGame * ogame").is_err());
        assert!(parse_symbol("").is_err());
        assert!(parse_symbol("const zCParser::`vftable'").is_err());
    }
}
