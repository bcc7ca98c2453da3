//! Envelope guards for raw generator output.
//!
//! Artifacts arrive as opaque text that may be wrapped in Markdown fences or
//! surrounded by prose. These helpers flag that (the `*0-*-BLOCK-ONLY` rules)
//! and recover the payload so the structural audit can still run.

use lucim_common::{Location, RuleId, Violation};
use serde_json::Value;

const FENCE: &str = "```";
const START_UML: &str = "@startuml";
const END_UML: &str = "@enduml";
const PREVIEW_CHARS: usize = 200;

fn preview(s: &str) -> String {
    s.chars().take(PREVIEW_CHARS).collect()
}

// --- JSON blocks ---

/// Check that `raw` is solely a JSON object: no fences, no text before the
/// first `{` or after the last `}`. `rule` is the family's block-only id.
pub fn check_json_block_only(raw: &str, rule: RuleId) -> Vec<Violation> {
    let mut violations = Vec::new();
    let content = raw.trim();
    if content.is_empty() {
        return violations;
    }
    let location = || Location::path("raw_content");

    if content.contains(FENCE) {
        violations.push(
            Violation::new(rule, location())
                .with_message("Markdown code fences must be removed; the artifact must be a bare JSON object.")
                .with_value("has_code_fences", true)
                .with_value("content_preview", preview(content)),
        );
        return violations;
    }

    let (Some(first), Some(last)) = (content.find('{'), content.rfind('}')) else {
        violations.push(
            Violation::new(rule, location())
                .with_message("No JSON object found.")
                .with_value("content_preview", preview(content)),
        );
        return violations;
    };
    if first >= last {
        violations.push(
            Violation::new(rule, location())
                .with_message("No JSON object found.")
                .with_value("content_preview", preview(content)),
        );
        return violations;
    }

    let before = content[..first].trim();
    if !before.is_empty() {
        violations.push(
            Violation::new(rule, location())
                .with_message("Text before the JSON object must be removed.")
                .with_value("text_before", preview(before)),
        );
    }
    let after = content[last + 1..].trim();
    if !after.is_empty() {
        violations.push(
            Violation::new(rule, location())
                .with_message("Text after the JSON object must be removed.")
                .with_value("text_after", preview(after)),
        );
    }
    violations
}

/// Drop Markdown fence lines (```` ``` ```` or ```` ```json ````), keeping the body.
pub fn strip_fences(raw: &str) -> String {
    raw.lines()
        .filter(|line| !line.trim_start().starts_with(FENCE))
        .collect::<Vec<_>>()
        .join("\n")
}

/// The slice from the first `{` to the last `}`, or the trimmed input when
/// there is no such span.
pub fn json_object_span(raw: &str) -> &str {
    match (raw.find('{'), raw.rfind('}')) {
        (Some(first), Some(last)) if first < last => &raw[first..=last],
        _ => raw.trim(),
    }
}

/// Unwrap the generator envelope `{"data": {...}}` when present.
pub fn unwrap_data(value: &Value) -> &Value {
    match value.get("data") {
        Some(inner) if inner.is_object() => inner,
        _ => value,
    }
}

// --- PlantUML blocks ---

/// Check that `raw` is solely a `@startuml … @enduml` block.
pub fn check_plantuml_block_only(raw: &str) -> Vec<Violation> {
    let mut violations = Vec::new();
    let content = raw.trim();
    if content.is_empty() {
        return violations;
    }
    let rule = RuleId::Ldr0PlantumlBlockOnly;

    if content.contains(FENCE) {
        violations.push(
            Violation::new(rule, Location::Line(1))
                .with_message("Markdown code fences must be removed; the diagram must be a bare PlantUML block.")
                .with_value("has_code_fences", true)
                .with_value("content_preview", preview(content)),
        );
        return violations;
    }

    let Some(start) = content.find(START_UML) else {
        violations.push(
            Violation::new(rule, Location::Line(1))
                .with_message("No @startuml found.")
                .with_value("content_preview", preview(content)),
        );
        return violations;
    };
    let end = match content.rfind(END_UML) {
        Some(end) if end > start => end,
        _ => {
            violations.push(
                Violation::new(rule, Location::Line(1))
                    .with_message("No @enduml found after @startuml.")
                    .with_value("content_preview", preview(content)),
            );
            return violations;
        }
    };

    let before = content[..start].trim();
    if !before.is_empty() {
        violations.push(
            Violation::new(rule, Location::Line(1))
                .with_message("Text before @startuml must be removed.")
                .with_value("text_before", preview(before)),
        );
    }
    let after = content[end + END_UML.len()..].trim();
    if !after.is_empty() {
        violations.push(
            Violation::new(rule, Location::Line(1))
                .with_message("Text after @enduml must be removed.")
                .with_value("text_after", preview(after)),
        );
    }
    violations
}

/// Recover the PlantUML text from a JSON wrapper or from surrounding text.
/// Returns `None` when no `@startuml … @enduml` block can be found.
pub fn extract_plantuml(raw: &str) -> Option<String> {
    plantuml_from_json(raw).or_else(|| plantuml_in_text(raw))
}

/// The PlantUML string carried by a generator JSON wrapper, if `raw` is one.
pub fn plantuml_from_json(raw: &str) -> Option<String> {
    let value = serde_json::from_str::<Value>(raw.trim()).ok()?;
    plantuml_in_json(&value)
        .filter(|text| text.contains(START_UML))
        .map(str::to_string)
}

fn plantuml_in_json(value: &Value) -> Option<&str> {
    let data = value.get("data").filter(|d| d.is_object());
    let node = data.unwrap_or(value);
    node.get("plantuml-diagram")
        .and_then(Value::as_str)
        .or_else(|| {
            node.get("diagram")
                .and_then(|d| d.get("plantuml"))
                .and_then(Value::as_str)
        })
}

fn plantuml_in_text(raw: &str) -> Option<String> {
    let lower = raw.to_ascii_lowercase();
    let start = lower.find(START_UML)?;
    let end = start + START_UML.len() + lower[start + START_UML.len()..].find(END_UML)?;
    let block = &raw[start..end + END_UML.len()];
    Some(block.replace("\\n", "\n").replace("\\t", "\t"))
}
