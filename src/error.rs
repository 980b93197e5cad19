//! Fatal error taxonomy for the deploy and destroy workflows.
//!
//! Advisory failures (terms acceptance, teardown deletions) are not errors
//! at this level; the sequencers log them and continue. Everything here
//! terminates the workflow with a non-zero exit.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LabError {
    /// One or more required keys were unresolved after the full lookup
    /// chain. Carries every missing key, not just the first.
    #[error("missing required parameters: {}", keys.join(", "))]
    MissingRequiredParameter { keys: Vec<String> },

    /// The control plane rejected the subscription binding.
    #[error("cannot bind subscription {subscription}: {reason}")]
    Context {
        subscription: String,
        reason: String,
    },

    /// The target managed resource group already exists and cannot be
    /// reused. The message names the exact group to remove or override.
    #[error(
        "managed resource group {name} already exists; \
         delete it (az group delete --name {name}) or set VBMA_MRG_NAME to a different name"
    )]
    NamingConflict { name: String },

    /// A remote call failed on a step with no fallback.
    #[error("{step} failed: {reason}")]
    RemoteCall { step: String, reason: String },

    /// An explicitly provided document or override was not parseable.
    #[error("{origin} is not valid JSON: {reason}")]
    MalformedDocument { origin: String, reason: String },
}
