//! The optional marketplace parameter document.
//!
//! Conventional path `vbma-parameters.json`, shaped as
//! `{ "parameters": { "<key>": { "value": ... } } }`. The document is read
//! defensively: a leading byte-order mark is stripped before parsing, and a
//! missing or malformed document degrades to "no values from this source"
//! rather than aborting.

use crate::error::LabError;
use crate::util::strip_bom;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

pub const DEFAULT_PARAMS_FILE: &str = "vbma-parameters.json";

#[derive(Deserialize)]
struct RawDoc {
    #[serde(default)]
    parameters: BTreeMap<String, RawParam>,
}

#[derive(Deserialize)]
struct RawParam {
    value: Value,
}

/// Parsed parameter document, keyed by parameter name.
#[derive(Debug, Default)]
pub struct ParamDoc {
    values: BTreeMap<String, Value>,
}

impl ParamDoc {
    pub fn parse(origin: &str, text: &str) -> Result<Self, LabError> {
        let raw: RawDoc =
            serde_json::from_str(strip_bom(text)).map_err(|err| LabError::MalformedDocument {
                origin: origin.to_string(),
                reason: err.to_string(),
            })?;
        let values = raw
            .parameters
            .into_iter()
            .map(|(key, param)| (key, param.value))
            .collect();
        Ok(ParamDoc { values })
    }

    /// String value for a key; non-string scalars are not coerced.
    pub fn string_value(&self, key: &str) -> Option<String> {
        match self.values.get(key) {
            Some(Value::String(text)) => {
                let trimmed = text.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            _ => None,
        }
    }

    /// Opaque object value for a key, passed through unmodified.
    pub fn object_value(&self, key: &str) -> Option<Value> {
        self.values
            .get(key)
            .filter(|value| value.is_object())
            .cloned()
    }
}

/// Load the document if it exists and parses; anything else is "source
/// unavailable" (a malformed document is warned about, not fatal).
pub fn load_optional(path: &Path) -> Option<ParamDoc> {
    if !path.is_file() {
        return None;
    }
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) => {
            tracing::warn!(path = %path.display(), %err, "parameter document unreadable; ignoring");
            return None;
        }
    };
    match ParamDoc::parse(&path.display().to_string(), &text) {
        Ok(doc) => Some(doc),
        Err(err) => {
            tracing::warn!(%err, "parameter document malformed; ignoring");
            None
        }
    }
}
