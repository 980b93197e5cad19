//! Tiered parameter resolution.
//!
//! Each key is looked up through an ordered chain of sources: explicit
//! overrides (CLI flags merged over the process environment), then the
//! parameter document, then built-in defaults. The first source with a
//! non-empty value wins. Required keys unresolved after the chain abort the
//! run before any remote call, reporting every missing key at once.

use crate::error::LabError;
use crate::params::ParamDoc;
use std::collections::BTreeMap;

/// Lookup spec for one parameter: override name, optional document key,
/// optional built-in default.
#[derive(Debug, Clone, Copy)]
pub struct KeySpec {
    pub env: &'static str,
    pub doc_key: Option<&'static str>,
    pub default: Option<&'static str>,
}

pub const SUBSCRIPTION_ID: KeySpec = KeySpec {
    env: "SUBSCRIPTION_ID",
    doc_key: None,
    default: None,
};
pub const ADMIN_PASSWORD: KeySpec = KeySpec {
    env: "ADMIN_PASSWORD",
    doc_key: None,
    default: None,
};
pub const LOCATION: KeySpec = KeySpec {
    env: "LOCATION",
    doc_key: None,
    default: Some("westeurope"),
};
pub const RG_NAME: KeySpec = KeySpec {
    env: "RG_NAME",
    doc_key: None,
    default: Some("veeam-lab-rg"),
};
pub const PREFIX: KeySpec = KeySpec {
    env: "PREFIX",
    doc_key: None,
    default: Some("veeam-lab"),
};
pub const ADMIN_USERNAME: KeySpec = KeySpec {
    env: "ADMIN_USERNAME",
    doc_key: None,
    default: Some("veeamadmin"),
};
pub const ALLOWED_RDP_SOURCE: KeySpec = KeySpec {
    env: "ALLOWED_RDP_SOURCE",
    doc_key: None,
    default: Some("0.0.0.0/0"),
};
pub const DEPLOY_VBMA: KeySpec = KeySpec {
    env: "DEPLOY_VBMA",
    doc_key: None,
    default: None,
};

/// Resolves keys against the override map and the optional parameter
/// document. Sources are tried in order; empty values count as absent.
pub struct Resolver<'a> {
    overrides: &'a BTreeMap<String, String>,
    doc: Option<&'a ParamDoc>,
}

impl<'a> Resolver<'a> {
    pub fn new(overrides: &'a BTreeMap<String, String>, doc: Option<&'a ParamDoc>) -> Self {
        Resolver { overrides, doc }
    }

    pub fn lookup(&self, spec: &KeySpec) -> Option<String> {
        let sources: [fn(&Self, &KeySpec) -> Option<String>; 3] = [
            Self::from_overrides,
            Self::from_document,
            Self::from_default,
        ];
        sources.iter().find_map(|source| source(self, spec))
    }

    fn from_overrides(&self, spec: &KeySpec) -> Option<String> {
        let value = self.overrides.get(spec.env)?.trim();
        (!value.is_empty()).then(|| value.to_string())
    }

    fn from_document(&self, spec: &KeySpec) -> Option<String> {
        self.doc?.string_value(spec.doc_key?)
    }

    fn from_default(&self, spec: &KeySpec) -> Option<String> {
        spec.default.map(str::to_string)
    }
}

/// Fully resolved base configuration; every field is non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub subscription_id: String,
    pub admin_password: String,
    pub location: String,
    pub rg_name: String,
    pub prefix: String,
    pub admin_username: String,
    pub allowed_rdp_source: String,
}

impl ResolvedConfig {
    pub fn resolve(
        overrides: &BTreeMap<String, String>,
        doc: Option<&ParamDoc>,
    ) -> Result<Self, LabError> {
        let resolver = Resolver::new(overrides, doc);
        let mut missing = Vec::new();
        let mut require = |spec: &KeySpec| {
            resolver.lookup(spec).unwrap_or_else(|| {
                missing.push(spec.env.to_string());
                String::new()
            })
        };

        let config = ResolvedConfig {
            subscription_id: require(&SUBSCRIPTION_ID),
            admin_password: require(&ADMIN_PASSWORD),
            location: require(&LOCATION),
            rg_name: require(&RG_NAME),
            prefix: require(&PREFIX),
            admin_username: require(&ADMIN_USERNAME),
            allowed_rdp_source: require(&ALLOWED_RDP_SOURCE),
        };

        if missing.is_empty() {
            Ok(config)
        } else {
            Err(LabError::MissingRequiredParameter { keys: missing })
        }
    }
}

/// Truthy parse for the marketplace toggle: `1`, `true`, `yes` (any case).
pub fn toggle_enabled(value: Option<&str>) -> bool {
    matches!(
        value.map(str::to_ascii_lowercase).as_deref(),
        Some("1") | Some("true") | Some("yes")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overrides(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    const SPEC_WITH_DOC_KEY: KeySpec = KeySpec {
        env: "PUBLISHER",
        doc_key: Some("publisher"),
        default: Some("built-in"),
    };

    #[test]
    fn override_wins_over_document_and_default() {
        let map = overrides(&[("PUBLISHER", "from-env")]);
        let doc = ParamDoc::parse(
            "test",
            r#"{ "parameters": { "publisher": { "value": "from-doc" } } }"#,
        )
        .unwrap();
        let resolver = Resolver::new(&map, Some(&doc));
        assert_eq!(
            resolver.lookup(&SPEC_WITH_DOC_KEY).as_deref(),
            Some("from-env")
        );
    }

    #[test]
    fn document_wins_over_default() {
        let map = overrides(&[]);
        let doc = ParamDoc::parse(
            "test",
            r#"{ "parameters": { "publisher": { "value": "from-doc" } } }"#,
        )
        .unwrap();
        let resolver = Resolver::new(&map, Some(&doc));
        assert_eq!(
            resolver.lookup(&SPEC_WITH_DOC_KEY).as_deref(),
            Some("from-doc")
        );
    }

    #[test]
    fn default_applies_when_other_sources_are_empty() {
        let map = overrides(&[]);
        let resolver = Resolver::new(&map, None);
        assert_eq!(
            resolver.lookup(&SPEC_WITH_DOC_KEY).as_deref(),
            Some("built-in")
        );
    }

    #[test]
    fn key_with_no_source_is_unresolved() {
        let map = overrides(&[]);
        let resolver = Resolver::new(&map, None);
        assert_eq!(resolver.lookup(&SUBSCRIPTION_ID), None);
    }

    #[test]
    fn empty_override_counts_as_absent() {
        let map = overrides(&[("LOCATION", "  ")]);
        let resolver = Resolver::new(&map, None);
        assert_eq!(resolver.lookup(&LOCATION).as_deref(), Some("westeurope"));
    }

    #[test]
    fn resolve_reports_every_missing_key() {
        let err = ResolvedConfig::resolve(&overrides(&[]), None).unwrap_err();
        match err {
            LabError::MissingRequiredParameter { keys } => {
                assert_eq!(keys, vec!["SUBSCRIPTION_ID", "ADMIN_PASSWORD"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn minimal_environment_resolves_to_documented_defaults() {
        let map = overrides(&[("SUBSCRIPTION_ID", "sub-1"), ("ADMIN_PASSWORD", "p")]);
        let config = ResolvedConfig::resolve(&map, None).unwrap();
        assert_eq!(
            config,
            ResolvedConfig {
                subscription_id: "sub-1".to_string(),
                admin_password: "p".to_string(),
                location: "westeurope".to_string(),
                rg_name: "veeam-lab-rg".to_string(),
                prefix: "veeam-lab".to_string(),
                admin_username: "veeamadmin".to_string(),
                allowed_rdp_source: "0.0.0.0/0".to_string(),
            }
        );
    }

    #[test]
    fn toggle_parsing() {
        assert!(toggle_enabled(Some("1")));
        assert!(toggle_enabled(Some("true")));
        assert!(toggle_enabled(Some("Yes")));
        assert!(!toggle_enabled(Some("0")));
        assert!(!toggle_enabled(Some("")));
        assert!(!toggle_enabled(None));
    }
}
