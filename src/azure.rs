//! Control-plane seam.
//!
//! `ControlPlane` is one method per remote operation the workflows consume;
//! `AzCli` is the production implementation shelling out to the `az`
//! executable. The sequencers decide which failures are fatal; this module
//! only reports them, carrying the step label and the first stderr line.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Instant;

use anyhow::{Context, Result};
use serde_json::Value;
use thiserror::Error;

/// A failed remote call: which step, and the control plane's first
/// complaint.
#[derive(Debug, Error)]
#[error("{step}: {reason}")]
pub struct RemoteError {
    pub step: &'static str,
    pub reason: String,
}

/// Inputs for the managed application creation call.
#[derive(Debug, Clone)]
pub struct ManagedAppRequest {
    pub name: String,
    pub resource_group: String,
    pub location: String,
    pub publisher: String,
    pub offer: String,
    pub plan: String,
    pub plan_version: String,
    /// Full resource id of the managed resource group.
    pub managed_rg_id: String,
    pub app_parameters: Value,
}

/// Remote operations the deploy and destroy sequencers issue, in the
/// vocabulary of the lab workflow rather than of any particular transport.
pub trait ControlPlane {
    fn bind_subscription(&self, subscription_id: &str) -> Result<(), RemoteError>;
    fn ensure_resource_group(&self, name: &str, location: &str) -> Result<(), RemoteError>;
    fn resource_group_exists(&self, name: &str) -> Result<bool, RemoteError>;
    fn submit_template_deployment(
        &self,
        resource_group: &str,
        deployment_name: &str,
        template_path: &Path,
        parameters: &[(&'static str, String)],
    ) -> Result<(), RemoteError>;
    fn accept_marketplace_terms(
        &self,
        publisher: &str,
        offer: &str,
        plan: &str,
    ) -> Result<(), RemoteError>;
    fn create_managed_app(&self, request: &ManagedAppRequest) -> Result<(), RemoteError>;
    fn delete_managed_app(&self, name: &str, resource_group: &str) -> Result<(), RemoteError>;
    /// Requested no-wait; returns once the control plane accepts the
    /// deletion.
    fn delete_resource_group(&self, name: &str) -> Result<(), RemoteError>;
}

/// Production implementation over the `az` CLI.
pub struct AzCli {
    az: PathBuf,
}

impl AzCli {
    /// Locate `az` once up front so a missing CLI fails with a clear
    /// message instead of mid-sequence.
    pub fn locate() -> Result<Self> {
        let az = which::which("az").context("locate the az CLI on PATH")?;
        Ok(AzCli { az })
    }

    fn run(&self, step: &'static str, args: &[String]) -> Result<Vec<u8>, RemoteError> {
        let start = Instant::now();
        let output = Command::new(&self.az)
            .args(args)
            .output()
            .map_err(|err| RemoteError {
                step,
                reason: format!("spawn az: {err}"),
            })?;
        let elapsed_ms = start.elapsed().as_millis();
        tracing::info!(step, elapsed_ms, success = output.status.success(), "az call complete");

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let line = stderr
                .lines()
                .map(str::trim)
                .find(|line| !line.is_empty())
                .unwrap_or_default();
            let reason = if line.is_empty() {
                format!("status {}", output.status)
            } else {
                line.to_string()
            };
            return Err(RemoteError { step, reason });
        }
        Ok(output.stdout)
    }
}

fn args(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|part| part.to_string()).collect()
}

fn template_deployment_args(
    resource_group: &str,
    deployment_name: &str,
    template_path: &Path,
    parameters: &[(&'static str, String)],
) -> Vec<String> {
    let mut argv = args(&[
        "deployment",
        "group",
        "create",
        "--resource-group",
        resource_group,
        "--name",
        deployment_name,
        "--template-file",
    ]);
    argv.push(template_path.display().to_string());
    for (key, value) in parameters {
        argv.push("--parameters".to_string());
        argv.push(format!("{key}={value}"));
    }
    argv
}

fn managed_app_args(request: &ManagedAppRequest) -> Vec<String> {
    let mut argv = args(&[
        "managedapp",
        "create",
        "--name",
        &request.name,
        "--resource-group",
        &request.resource_group,
        "--location",
        &request.location,
        "--kind",
        "MarketPlace",
        "--plan-publisher",
        &request.publisher,
        "--plan-product",
        &request.offer,
        "--plan-name",
        &request.plan,
        "--plan-version",
        &request.plan_version,
        "--managed-rg-id",
        &request.managed_rg_id,
    ]);
    argv.push("--parameters".to_string());
    argv.push(request.app_parameters.to_string());
    argv
}

impl ControlPlane for AzCli {
    fn bind_subscription(&self, subscription_id: &str) -> Result<(), RemoteError> {
        self.run(
            "bind subscription",
            &args(&["account", "set", "--subscription", subscription_id]),
        )?;
        Ok(())
    }

    fn ensure_resource_group(&self, name: &str, location: &str) -> Result<(), RemoteError> {
        // `az group create` is create-if-absent.
        self.run(
            "ensure resource group",
            &args(&["group", "create", "--name", name, "--location", location]),
        )?;
        Ok(())
    }

    fn resource_group_exists(&self, name: &str) -> Result<bool, RemoteError> {
        let step = "check resource group";
        let stdout = self.run(step, &args(&["group", "exists", "--name", name]))?;
        let text = String::from_utf8_lossy(&stdout);
        match text.trim() {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(RemoteError {
                step,
                reason: format!("unexpected response: {other}"),
            }),
        }
    }

    fn submit_template_deployment(
        &self,
        resource_group: &str,
        deployment_name: &str,
        template_path: &Path,
        parameters: &[(&'static str, String)],
    ) -> Result<(), RemoteError> {
        self.run(
            "submit template deployment",
            &template_deployment_args(resource_group, deployment_name, template_path, parameters),
        )?;
        Ok(())
    }

    fn accept_marketplace_terms(
        &self,
        publisher: &str,
        offer: &str,
        plan: &str,
    ) -> Result<(), RemoteError> {
        // Two call shapes across az versions; first success wins.
        let modern = args(&[
            "vm", "image", "terms", "accept",
            "--publisher", publisher,
            "--offer", offer,
            "--plan", plan,
        ]);
        let first = self.run("accept marketplace terms", &modern);
        let Err(err) = first else {
            return Ok(());
        };
        tracing::warn!(%err, "terms accept call failed; trying legacy shape");
        let legacy = args(&[
            "vm", "image", "accept-terms",
            "--publisher", publisher,
            "--offer", offer,
            "--plan", plan,
        ]);
        self.run("accept marketplace terms (legacy)", &legacy)?;
        Ok(())
    }

    fn create_managed_app(&self, request: &ManagedAppRequest) -> Result<(), RemoteError> {
        self.run("create managed application", &managed_app_args(request))?;
        Ok(())
    }

    fn delete_managed_app(&self, name: &str, resource_group: &str) -> Result<(), RemoteError> {
        self.run(
            "delete managed application",
            &args(&[
                "managedapp",
                "delete",
                "--name",
                name,
                "--resource-group",
                resource_group,
            ]),
        )?;
        Ok(())
    }

    fn delete_resource_group(&self, name: &str) -> Result<(), RemoteError> {
        self.run(
            "delete resource group",
            &args(&["group", "delete", "--name", name, "--yes", "--no-wait"]),
        )?;
        Ok(())
    }
}
