//! Persisted deployment state, the hand-off between deploy and destroy.
//!
//! A single record as plain `key=value` lines, overwritten wholesale after
//! each successful deploy (last-writer-wins; the single-operator assumption
//! makes concurrent-writer protection unnecessary). Teardown reads it when
//! explicit identifiers are not supplied.

use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

pub const DEFAULT_STATE_FILE: &str = "vbma-state.env";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeploymentState {
    pub app_rg_name: String,
    pub app_name: Option<String>,
    pub mrg_name: Option<String>,
    pub subscription_id: String,
}

impl DeploymentState {
    pub fn write(&self, path: &Path) -> Result<()> {
        let mut out = String::new();
        let _ = writeln!(out, "APP_RG_NAME={}", self.app_rg_name);
        let _ = writeln!(out, "APP_NAME={}", self.app_name.as_deref().unwrap_or(""));
        let _ = writeln!(out, "MRG_NAME={}", self.mrg_name.as_deref().unwrap_or(""));
        let _ = writeln!(out, "SUBSCRIPTION_ID={}", self.subscription_id);
        fs::write(path, out).with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }

    /// Lenient read: absent file is `None`, malformed lines are skipped
    /// with a warning, unknown keys are ignored.
    pub fn load_optional(path: &Path) -> Option<Self> {
        if !path.is_file() {
            return None;
        }
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "state file unreadable; ignoring");
                return None;
            }
        };
        let mut state = DeploymentState::default();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                tracing::warn!(line, "malformed state line; skipping");
                continue;
            };
            let value = value.trim();
            match key.trim() {
                "APP_RG_NAME" => state.app_rg_name = value.to_string(),
                "APP_NAME" => state.app_name = non_empty(value),
                "MRG_NAME" => state.mrg_name = non_empty(value),
                "SUBSCRIPTION_ID" => state.subscription_id = value.to_string(),
                _ => {}
            }
        }
        Some(state)
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}
