//! Marketplace offer resolution for the VBMA managed application.
//!
//! Identifiers resolve through the same tiered chain as the base
//! configuration, with the parameter document as the middle tier. The one
//! invariant enforced locally is naming: the managed resource group must
//! differ from the base resource group (the control plane rejects identical
//! names), so a collision is renamed before any remote call.

use crate::config::{KeySpec, Resolver};
use crate::error::LabError;
use crate::params::ParamDoc;
use serde_json::Value;
use std::collections::BTreeMap;

pub const PUBLISHER: KeySpec = KeySpec {
    env: "VBMA_PUBLISHER",
    doc_key: Some("publisher"),
    default: Some("veeam"),
};
pub const OFFER: KeySpec = KeySpec {
    env: "VBMA_OFFER",
    doc_key: Some("offer"),
    default: Some("azure_backup_free"),
};
pub const PLAN: KeySpec = KeySpec {
    env: "VBMA_PLAN",
    doc_key: Some("plan"),
    default: Some("veeambackupazure"),
};
pub const PLAN_VERSION: KeySpec = KeySpec {
    env: "VBMA_PLAN_VERSION",
    doc_key: Some("planVersion"),
    default: Some("1.0.0"),
};
pub const APP_NAME: KeySpec = KeySpec {
    env: "VBMA_APP_NAME",
    doc_key: Some("managedApplicationName"),
    default: Some("vbma"),
};
pub const MRG_NAME: KeySpec = KeySpec {
    env: "VBMA_MRG_NAME",
    doc_key: Some("managedResourceGroupName"),
    default: None,
};
pub const APP_PARAMS_ENV: &str = "VBMA_APP_PARAMS";
const APP_PARAMS_DOC_KEY: &str = "appParameters";

/// Resolved marketplace offer coordinates and targets.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketplaceOffer {
    pub publisher: String,
    pub offer: String,
    pub plan: String,
    pub plan_version: String,
    pub app_name: String,
    pub managed_rg_name: String,
    /// Opaque parameter object passed through to the managed application
    /// unmodified.
    pub app_parameters: Value,
}

impl MarketplaceOffer {
    /// Resolve the offer. `base_rg_name` is the main resource group; a
    /// managed-RG name equal to it is renamed with a `-mrg` suffix.
    pub fn resolve(
        overrides: &BTreeMap<String, String>,
        doc: Option<&ParamDoc>,
        base_rg_name: &str,
    ) -> Result<Self, LabError> {
        let resolver = Resolver::new(overrides, doc);
        let mut missing = Vec::new();
        let mut require = |spec: &KeySpec| {
            resolver.lookup(spec).unwrap_or_else(|| {
                missing.push(spec.env.to_string());
                String::new()
            })
        };

        let publisher = require(&PUBLISHER);
        let offer = require(&OFFER);
        let plan = require(&PLAN);
        let plan_version = require(&PLAN_VERSION);
        let app_name = require(&APP_NAME);
        if !missing.is_empty() {
            return Err(LabError::MissingRequiredParameter { keys: missing });
        }

        let mut managed_rg_name = resolver
            .lookup(&MRG_NAME)
            .unwrap_or_else(|| format!("{app_name}-mrg"));
        if managed_rg_name == base_rg_name {
            let renamed = format!("{managed_rg_name}-mrg");
            tracing::warn!(
                requested = %managed_rg_name,
                renamed = %renamed,
                "managed resource group name collides with the base resource group; renaming"
            );
            managed_rg_name = renamed;
        }

        let app_parameters = resolve_app_parameters(overrides, doc)?;

        Ok(MarketplaceOffer {
            publisher,
            offer,
            plan,
            plan_version,
            app_name,
            managed_rg_name,
            app_parameters,
        })
    }
}

/// The override holds JSON text; being explicitly provided, it is not a
/// degradable source and malformed JSON is fatal.
fn resolve_app_parameters(
    overrides: &BTreeMap<String, String>,
    doc: Option<&ParamDoc>,
) -> Result<Value, LabError> {
    if let Some(raw) = overrides.get(APP_PARAMS_ENV).map(|raw| raw.trim()) {
        if !raw.is_empty() {
            let value: Value =
                serde_json::from_str(raw).map_err(|err| LabError::MalformedDocument {
                    origin: APP_PARAMS_ENV.to_string(),
                    reason: err.to_string(),
                })?;
            if !value.is_object() {
                return Err(LabError::MalformedDocument {
                    origin: APP_PARAMS_ENV.to_string(),
                    reason: "expected a JSON object".to_string(),
                });
            }
            return Ok(value);
        }
    }
    if let Some(value) = doc.and_then(|doc| doc.object_value(APP_PARAMS_DOC_KEY)) {
        return Ok(value);
    }
    Ok(Value::Object(serde_json::Map::new()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn overrides(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn defaults_resolve_without_any_source() {
        let offer = MarketplaceOffer::resolve(&overrides(&[]), None, "veeam-lab-rg").unwrap();
        assert_eq!(offer.publisher, "veeam");
        assert_eq!(offer.offer, "azure_backup_free");
        assert_eq!(offer.plan, "veeambackupazure");
        assert_eq!(offer.plan_version, "1.0.0");
        assert_eq!(offer.app_name, "vbma");
        assert_eq!(offer.managed_rg_name, "vbma-mrg");
        assert_eq!(offer.app_parameters, json!({}));
    }

    #[test]
    fn document_values_override_defaults() {
        let doc = ParamDoc::parse(
            "test",
            r#"{ "parameters": {
                "publisher": { "value": "contoso" },
                "managedResourceGroupName": { "value": "contoso-mrg" },
                "appParameters": { "value": { "tier": "free" } }
            } }"#,
        )
        .unwrap();
        let offer = MarketplaceOffer::resolve(&overrides(&[]), Some(&doc), "veeam-lab-rg").unwrap();
        assert_eq!(offer.publisher, "contoso");
        assert_eq!(offer.managed_rg_name, "contoso-mrg");
        assert_eq!(offer.app_parameters, json!({ "tier": "free" }));
    }

    #[test]
    fn env_overrides_win_over_document() {
        let doc = ParamDoc::parse(
            "test",
            r#"{ "parameters": { "plan": { "value": "from-doc" } } }"#,
        )
        .unwrap();
        let map = overrides(&[("VBMA_PLAN", "from-env")]);
        let offer = MarketplaceOffer::resolve(&map, Some(&doc), "veeam-lab-rg").unwrap();
        assert_eq!(offer.plan, "from-env");
    }

    #[test]
    fn managed_rg_colliding_with_base_rg_is_renamed() {
        let map = overrides(&[("VBMA_MRG_NAME", "veeam-lab-rg")]);
        let offer = MarketplaceOffer::resolve(&map, None, "veeam-lab-rg").unwrap();
        assert_eq!(offer.managed_rg_name, "veeam-lab-rg-mrg");
    }

    #[test]
    fn default_managed_rg_colliding_with_base_rg_is_renamed() {
        let map = overrides(&[("VBMA_APP_NAME", "lab")]);
        let offer = MarketplaceOffer::resolve(&map, None, "lab-mrg").unwrap();
        assert_eq!(offer.managed_rg_name, "lab-mrg-mrg");
    }

    #[test]
    fn malformed_app_params_override_is_fatal() {
        let map = overrides(&[("VBMA_APP_PARAMS", "{ nope")]);
        let err = MarketplaceOffer::resolve(&map, None, "veeam-lab-rg").unwrap_err();
        assert!(matches!(err, LabError::MalformedDocument { .. }));
    }

    #[test]
    fn non_object_app_params_override_is_fatal() {
        let map = overrides(&[("VBMA_APP_PARAMS", "[1,2]")]);
        let err = MarketplaceOffer::resolve(&map, None, "veeam-lab-rg").unwrap_err();
        assert!(matches!(err, LabError::MalformedDocument { .. }));
    }

    #[test]
    fn app_params_override_wins_over_document() {
        let doc = ParamDoc::parse(
            "test",
            r#"{ "parameters": { "appParameters": { "value": { "tier": "doc" } } } }"#,
        )
        .unwrap();
        let map = overrides(&[("VBMA_APP_PARAMS", r#"{ "tier": "env" }"#)]);
        let offer = MarketplaceOffer::resolve(&map, Some(&doc), "veeam-lab-rg").unwrap();
        assert_eq!(offer.app_parameters, json!({ "tier": "env" }));
    }
}
