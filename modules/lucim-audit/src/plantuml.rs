//! Line lexer for the PlantUML-like scenario and diagram formats.
//!
//! Every input line maps to exactly one [`Line`] kind. Lines that match no
//! known shape become [`Line::Other`] and are skipped by the auditors, so the
//! lexer is total over arbitrary text.

use std::sync::LazyLock;

use regex::Regex;

static PARTICIPANT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^participant\s+("?)([^"]+?)"?\s+as\s+(\w+)(?:\s+(#[0-9A-Fa-f]{6}))?\s*$"#).unwrap()
});

static CANONICAL_SYSTEM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^participant\s+System\s+as\s+system(?:\s+#[0-9A-Fa-f]{6})?\s*$").unwrap()
});

static MESSAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\S+?)\s*(--?>)\s*(\S+)\s*:\s*(\w+)\s*\(([^)]*)\)\s*$").unwrap()
});

static ACTIVATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^activate\s+(\w+)\b").unwrap());

static DEACTIVATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^deactivate\s+(\w+)\b").unwrap());

/// Arrow style of a message line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arrow {
    /// `->`
    Solid,
    /// `-->`
    Dashed,
}

impl Arrow {
    pub fn as_str(self) -> &'static str {
        match self {
            Arrow::Solid => "->",
            Arrow::Dashed => "-->",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub label: String,
    pub alias: String,
    pub quoted: bool,
    pub color: Option<String>,
    /// Exactly `participant System as system`, optionally coloured.
    pub canonical_system: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub lhs: String,
    pub arrow: Arrow,
    pub rhs: String,
    pub name: String,
    /// Raw text between the parentheses.
    pub params: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Blank,
    Comment,
    StartUml,
    EndUml,
    Participant(Participant),
    Message(Message),
    Activate(String),
    Deactivate(String),
    Other,
}

impl Line {
    /// Lines that take part in adjacency checks.
    pub fn is_significant(&self) -> bool {
        !matches!(self, Line::Blank | Line::Comment)
    }
}

/// A classified line with its 1-based line number and raw text.
#[derive(Debug, Clone)]
pub struct LexedLine<'a> {
    pub number: usize,
    pub raw: &'a str,
    pub kind: Line,
}

pub fn is_comment(line: &str) -> bool {
    let s = line.trim();
    if s.is_empty() {
        return false;
    }
    s.starts_with("//")
        || s.starts_with('\'')
        || (s.starts_with("/note ") && s.ends_with('/'))
        || (s.starts_with("note ") && s.contains(':'))
        || s.starts_with("note over ")
}

pub fn classify_line(raw: &str) -> Line {
    let line = raw.trim();
    if line.is_empty() {
        return Line::Blank;
    }
    if is_comment(line) {
        return Line::Comment;
    }
    if line.starts_with("@startuml") {
        return Line::StartUml;
    }
    if line.starts_with("@enduml") {
        return Line::EndUml;
    }
    if let Some(caps) = PARTICIPANT_RE.captures(line) {
        return Line::Participant(Participant {
            quoted: !caps[1].is_empty(),
            label: caps[2].trim().to_string(),
            alias: caps[3].to_string(),
            color: caps.get(4).map(|m| m.as_str().to_string()),
            canonical_system: CANONICAL_SYSTEM_RE.is_match(line),
        });
    }
    if let Some(caps) = ACTIVATE_RE.captures(line) {
        return Line::Activate(caps[1].to_string());
    }
    if let Some(caps) = DEACTIVATE_RE.captures(line) {
        return Line::Deactivate(caps[1].to_string());
    }
    if let Some(caps) = MESSAGE_RE.captures(line) {
        let arrow = if &caps[2] == "-->" { Arrow::Dashed } else { Arrow::Solid };
        return Line::Message(Message {
            lhs: caps[1].to_string(),
            arrow,
            rhs: caps[3].to_string(),
            name: caps[4].to_string(),
            params: caps[5].to_string(),
        });
    }
    Line::Other
}

pub fn lex(text: &str) -> Vec<LexedLine<'_>> {
    text.lines()
        .enumerate()
        .map(|(i, raw)| LexedLine {
            number: i + 1,
            raw,
            kind: classify_line(raw),
        })
        .collect()
}

/// Split a parameter list on top-level commas, honouring single and double
/// quotes. Items are trimmed; an all-blank list yields no items.
pub fn split_params(raw: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut buf = String::new();
    let mut in_single = false;
    let mut in_double = false;

    for ch in raw.trim().chars() {
        match ch {
            '\'' if !in_double => {
                in_single = !in_single;
                buf.push(ch);
            }
            '"' if !in_single => {
                in_double = !in_double;
                buf.push(ch);
            }
            ',' if !in_single && !in_double => {
                parts.push(buf.trim().to_string());
                buf.clear();
            }
            _ => buf.push(ch),
        }
    }
    parts.push(buf.trim().to_string());

    if parts.len() == 1 && parts[0].is_empty() {
        return Vec::new();
    }
    parts
}
