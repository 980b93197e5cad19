//! CLI argument parsing for the lab workflows.
//!
//! The CLI is intentionally thin: flags are the top tier of the same
//! resolution chain the environment feeds, so every flag here has an
//! environment-variable twin and the sequencers never read `std::env`
//! themselves.
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::params::DEFAULT_PARAMS_FILE;
use crate::state::DEFAULT_STATE_FILE;

/// Default ARM template submitted by `deploy`.
pub const DEFAULT_TEMPLATE: &str = "templates/mainTemplate.json";

#[derive(Parser, Debug)]
#[command(
    name = "vlab",
    version,
    about = "Deploy and tear down the Veeam Azure lab",
    after_help = "Commands:\n  deploy    Provision the lab topology (optionally with the VBMA managed app)\n  destroy   Best-effort teardown of everything deploy created\n\nExamples:\n  SUBSCRIPTION_ID=... ADMIN_PASSWORD=... vlab deploy\n  vlab deploy --subscription ... --admin-password ... --deploy-vbma\n  vlab destroy\n  SUBSCRIPTION_ID=... vlab destroy --resource-group veeam-lab-rg",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level workflow commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    Deploy(DeployArgs),
    Destroy(DestroyArgs),
}

/// Deploy command inputs. Every identifier flag falls back to its
/// environment variable, then (for marketplace keys) the parameter
/// document, then a built-in default.
#[derive(Parser, Debug)]
#[command(about = "Provision the lab resource group, network/VM template, and optionally VBMA")]
pub struct DeployArgs {
    /// Target subscription id (env: SUBSCRIPTION_ID)
    #[arg(long, value_name = "ID")]
    pub subscription: Option<String>,

    /// Base resource group name (env: RG_NAME)
    #[arg(long, value_name = "NAME")]
    pub resource_group: Option<String>,

    /// Azure location (env: LOCATION)
    #[arg(long, value_name = "LOCATION")]
    pub location: Option<String>,

    /// Naming prefix for lab resources (env: PREFIX)
    #[arg(long, value_name = "PREFIX")]
    pub prefix: Option<String>,

    /// VM administrator username (env: ADMIN_USERNAME)
    #[arg(long, value_name = "USER")]
    pub admin_username: Option<String>,

    /// VM administrator password (env: ADMIN_PASSWORD)
    #[arg(long, value_name = "PASSWORD")]
    pub admin_password: Option<String>,

    /// CIDR allowed to reach RDP (env: ALLOWED_RDP_SOURCE)
    #[arg(long, value_name = "CIDR")]
    pub allowed_rdp_source: Option<String>,

    /// Also deploy the VBMA marketplace managed application
    /// (env: DEPLOY_VBMA)
    #[arg(long)]
    pub deploy_vbma: bool,

    /// ARM template to submit
    #[arg(long, value_name = "PATH", default_value = DEFAULT_TEMPLATE)]
    pub template: PathBuf,

    /// Marketplace parameter document
    #[arg(long, value_name = "PATH", default_value = DEFAULT_PARAMS_FILE)]
    pub parameters: PathBuf,

    /// Where to persist deployment state for destroy
    #[arg(long, value_name = "PATH", default_value = DEFAULT_STATE_FILE)]
    pub state_file: PathBuf,
}

/// Destroy command inputs. Identifiers missing here and in the environment
/// are taken from the persisted state file.
#[derive(Parser, Debug)]
#[command(about = "Tear down the managed app, its managed RG, and the base resource group")]
pub struct DestroyArgs {
    /// Target subscription id (env: SUBSCRIPTION_ID)
    #[arg(long, value_name = "ID")]
    pub subscription: Option<String>,

    /// Base resource group name (env: RG_NAME)
    #[arg(long, value_name = "NAME")]
    pub resource_group: Option<String>,

    /// Managed application name (env: VBMA_APP_NAME)
    #[arg(long, value_name = "NAME")]
    pub app_name: Option<String>,

    /// Managed resource group name (env: VBMA_MRG_NAME)
    #[arg(long, value_name = "NAME")]
    pub managed_resource_group: Option<String>,

    /// Deployment state file written by deploy
    #[arg(long, value_name = "PATH", default_value = DEFAULT_STATE_FILE)]
    pub state_file: PathBuf,
}
