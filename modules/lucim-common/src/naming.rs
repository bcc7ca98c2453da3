//! Token classification and naming conventions shared by every auditor.
//!
//! All functions are total: malformed input yields `false`, never a panic.

/// Canonical name of the System participant in structured artifacts.
pub const SYSTEM_NAME: &str = "System";

/// Alias of the System lifeline in the textual formats.
pub const SYSTEM_ALIAS: &str = "system";

/// Prefix every actor type name carries.
pub const ACTOR_TYPE_PREFIX: &str = "Act";

/// True iff `token` names the System: `System` in structured artifacts or the
/// lowercase alias `system` used by the textual formats.
pub fn is_system_token(token: &str) -> bool {
    let t = token.trim();
    t == SYSTEM_NAME || t == SYSTEM_ALIAS
}

/// camelCase instance name: non-empty, lowercase first character, alphanumeric
/// throughout, with at least one alphabetic character.
pub fn is_camel_case(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_lowercase() => {}
        _ => return false,
    }
    name.chars().all(char::is_alphanumeric) && name.chars().any(char::is_alphabetic)
}

/// Actor type name: literal `Act` prefix followed by a PascalCase tail
/// (`ActOperator`, `ActMsrCreator`).
pub fn is_act_type(name: &str) -> bool {
    let Some(tail) = name.strip_prefix(ACTOR_TYPE_PREFIX) else {
        return false;
    };
    match tail.chars().next() {
        Some(first) if first.is_uppercase() => tail.chars().all(char::is_alphanumeric),
        _ => false,
    }
}

/// Upper-case the first character, leaving the rest untouched.
pub fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
