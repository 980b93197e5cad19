//! The deployment and teardown sequencers.
//!
//! Both are strictly linear pipelines over the `ControlPlane` seam. Deploy
//! steps are fatal in order (bind, ensure RG, template submission, managed
//! app creation) except terms acceptance, which is advisory. Teardown is
//! advisory throughout once the subscription is bound; there is no rollback
//! anywhere, destroy is the cleanup path.

use crate::azure::{AzCli, ControlPlane, ManagedAppRequest, RemoteError};
use crate::cli::{DeployArgs, DestroyArgs};
use crate::config::{self, ResolvedConfig};
use crate::error::LabError;
use crate::marketplace::{self, MarketplaceOffer};
use crate::params;
use crate::state::DeploymentState;
use crate::util::now_epoch_ms;
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::Path;

pub fn run_deploy(args: DeployArgs) -> Result<()> {
    let overrides = deploy_overrides(&args, env_snapshot());
    let doc = params::load_optional(&args.parameters);
    let config = ResolvedConfig::resolve(&overrides, doc.as_ref())?;

    let deploy_vbma = config::toggle_enabled(
        overrides.get(config::DEPLOY_VBMA.env).map(String::as_str),
    );
    // Marketplace identifiers resolve before any remote call so naming
    // conflicts and malformed overrides fail fast.
    let offer = if deploy_vbma {
        Some(MarketplaceOffer::resolve(
            &overrides,
            doc.as_ref(),
            &config.rg_name,
        )?)
    } else {
        None
    };

    let az = AzCli::locate()?;
    deploy(&az, &config, offer.as_ref(), &args.template, &args.state_file)
}

pub fn run_destroy(args: DestroyArgs) -> Result<()> {
    let state = DeploymentState::load_optional(&args.state_file);
    let ids = teardown_ids(&args, &env_snapshot(), state.as_ref())?;
    let az = AzCli::locate()?;
    destroy(&az, &ids)
}

fn env_snapshot() -> BTreeMap<String, String> {
    std::env::vars().collect()
}

/// Flags are the same tier as their environment twins; a given flag wins
/// within that tier.
fn deploy_overrides(
    args: &DeployArgs,
    mut env: BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let flags = [
        (config::SUBSCRIPTION_ID.env, args.subscription.as_ref()),
        (config::RG_NAME.env, args.resource_group.as_ref()),
        (config::LOCATION.env, args.location.as_ref()),
        (config::PREFIX.env, args.prefix.as_ref()),
        (config::ADMIN_USERNAME.env, args.admin_username.as_ref()),
        (config::ADMIN_PASSWORD.env, args.admin_password.as_ref()),
        (
            config::ALLOWED_RDP_SOURCE.env,
            args.allowed_rdp_source.as_ref(),
        ),
    ];
    for (key, value) in flags {
        if let Some(value) = value {
            env.insert(key.to_string(), value.clone());
        }
    }
    if args.deploy_vbma {
        env.insert(config::DEPLOY_VBMA.env.to_string(), "1".to_string());
    }
    env
}

fn remote_fatal(err: RemoteError) -> LabError {
    LabError::RemoteCall {
        step: err.step.to_string(),
        reason: err.reason,
    }
}

fn advisory(result: Result<(), RemoteError>) {
    if let Err(err) = result {
        tracing::warn!(step = err.step, reason = %err.reason, "best-effort step failed; continuing");
    }
}

fn deploy(
    cp: &dyn ControlPlane,
    config: &ResolvedConfig,
    offer: Option<&MarketplaceOffer>,
    template: &Path,
    state_file: &Path,
) -> Result<()> {
    cp.bind_subscription(&config.subscription_id)
        .map_err(|err| LabError::Context {
            subscription: config.subscription_id.clone(),
            reason: err.reason,
        })?;

    cp.ensure_resource_group(&config.rg_name, &config.location)
        .map_err(remote_fatal)?;

    // Timestamped so reruns never collide with a prior deployment record.
    let deployment_name = format!("veeam-lab-{}", now_epoch_ms()?);
    let parameters = [
        ("prefix", config.prefix.clone()),
        ("location", config.location.clone()),
        ("adminUsername", config.admin_username.clone()),
        ("adminPassword", config.admin_password.clone()),
        ("allowedRdpSource", config.allowed_rdp_source.clone()),
    ];
    cp.submit_template_deployment(&config.rg_name, &deployment_name, template, &parameters)
        .map_err(remote_fatal)?;
    println!(
        "deployment {} accepted in resource group {}",
        deployment_name, config.rg_name
    );

    if let Some(offer) = offer {
        if cp
            .resource_group_exists(&offer.managed_rg_name)
            .map_err(remote_fatal)?
        {
            return Err(LabError::NamingConflict {
                name: offer.managed_rg_name.clone(),
            }
            .into());
        }

        advisory(cp.accept_marketplace_terms(&offer.publisher, &offer.offer, &offer.plan));

        let request = ManagedAppRequest {
            name: offer.app_name.clone(),
            resource_group: config.rg_name.clone(),
            location: config.location.clone(),
            publisher: offer.publisher.clone(),
            offer: offer.offer.clone(),
            plan: offer.plan.clone(),
            plan_version: offer.plan_version.clone(),
            managed_rg_id: format!(
                "/subscriptions/{}/resourceGroups/{}",
                config.subscription_id, offer.managed_rg_name
            ),
            app_parameters: offer.app_parameters.clone(),
        };
        cp.create_managed_app(&request).map_err(remote_fatal)?;
        println!(
            "managed application {} created (managed resource group {})",
            offer.app_name, offer.managed_rg_name
        );
    }

    let state = DeploymentState {
        app_rg_name: config.rg_name.clone(),
        app_name: offer.map(|offer| offer.app_name.clone()),
        mrg_name: offer.map(|offer| offer.managed_rg_name.clone()),
        subscription_id: config.subscription_id.clone(),
    };
    state
        .write(state_file)
        .with_context(|| format!("persist deployment state to {}", state_file.display()))?;
    println!("wrote {}", state_file.display());
    Ok(())
}

/// Minimal identifier set teardown needs; everything but the subscription
/// is optional or defaulted.
#[derive(Debug, PartialEq, Eq)]
struct TeardownIds {
    subscription_id: String,
    rg_name: String,
    app_name: Option<String>,
    mrg_name: Option<String>,
}

/// Flag, then environment, then persisted state; blank values count as
/// absent at every tier.
fn pick(
    flag: Option<&str>,
    env: &BTreeMap<String, String>,
    key: &str,
    from_state: Option<&str>,
) -> Option<String> {
    [flag, env.get(key).map(String::as_str), from_state]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(str::to_string)
}

fn teardown_ids(
    args: &DestroyArgs,
    env: &BTreeMap<String, String>,
    state: Option<&DeploymentState>,
) -> Result<TeardownIds, LabError> {
    let subscription_id = pick(
        args.subscription.as_deref(),
        env,
        config::SUBSCRIPTION_ID.env,
        state.map(|state| state.subscription_id.as_str()),
    )
    .ok_or_else(|| LabError::MissingRequiredParameter {
        keys: vec![config::SUBSCRIPTION_ID.env.to_string()],
    })?;

    let rg_name = pick(
        args.resource_group.as_deref(),
        env,
        config::RG_NAME.env,
        state.map(|state| state.app_rg_name.as_str()),
    )
    .unwrap_or_else(|| config::RG_NAME.default.unwrap_or_default().to_string());

    let app_name = pick(
        args.app_name.as_deref(),
        env,
        marketplace::APP_NAME.env,
        state.and_then(|state| state.app_name.as_deref()),
    );
    let mrg_name = pick(
        args.managed_resource_group.as_deref(),
        env,
        marketplace::MRG_NAME.env,
        state.and_then(|state| state.mrg_name.as_deref()),
    );

    Ok(TeardownIds {
        subscription_id,
        rg_name,
        app_name,
        mrg_name,
    })
}

fn destroy(cp: &dyn ControlPlane, ids: &TeardownIds) -> Result<()> {
    cp.bind_subscription(&ids.subscription_id)
        .map_err(|err| LabError::Context {
            subscription: ids.subscription_id.clone(),
            reason: err.reason,
        })?;

    if let Some(app_name) = &ids.app_name {
        advisory(cp.delete_managed_app(app_name, &ids.rg_name));
    }
    if let Some(mrg_name) = &ids.mrg_name {
        advisory(cp.delete_resource_group(mrg_name));
    }
    advisory(cp.delete_resource_group(&ids.rg_name));

    println!("requested deletion of resource group {}", ids.rg_name);
    Ok(())
}
