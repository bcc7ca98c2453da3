use std::fs;
use std::io::{self, Read};
use std::path::Path;

use lucim_audit::block::{json_object_span, strip_fences, unwrap_data};
use lucim_common::AuditError;
use serde_json::Value;

/// Read an artifact from `path`, or from stdin when `path` is `-`.
pub fn read_artifact(path: &Path) -> Result<String, AuditError> {
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        return Ok(buf);
    }
    Ok(fs::read_to_string(path)?)
}

/// Load an operation model used for cross-referencing. Unlike the audited
/// artifact, a reference model that does not parse is a caller error.
pub fn read_model(path: &Path) -> Result<Value, AuditError> {
    let raw = read_artifact(path)?;
    parse_model(&raw)
}

pub fn parse_model(raw: &str) -> Result<Value, AuditError> {
    let body = strip_fences(raw);
    let value: Value = serde_json::from_str(json_object_span(&body))?;
    Ok(unwrap_data(&value).clone())
}
