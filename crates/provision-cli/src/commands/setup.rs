//! `provision setup azure|identity|devops|all`

use crate::{OutputFormat, SetupTarget};
use anyhow::{Context, Result};
use command_runner::{CommandRunner, ProcessRunner};
use provision_config::loader;
use provision_core::{
    CloudClient, DevOpsClient, IdentityClient, RunReport, setup_all, setup_azure, setup_devops,
    setup_identity,
};
use std::path::Path;
use std::sync::Arc;

pub async fn run(config_path: &Path, format: OutputFormat, target: SetupTarget) -> Result<u8> {
    let mut config = loader::load(config_path).context("Failed to load configuration")?;

    let runner: Arc<dyn CommandRunner> = Arc::new(ProcessRunner::new());
    let cloud = CloudClient::new(runner.clone(), &config.azure.subscription_id);
    let identity = IdentityClient::new(runner.clone());
    let devops = DevOpsClient::new(
        runner.clone(),
        &config.azure_dev_ops.organization_url,
        &config.azure_dev_ops.project,
    );

    let mut report = RunReport::new();

    // Only the azure and identity flows write values back into the config.
    let (dry_run, writes_config) = match &target {
        SetupTarget::Azure { dry_run, .. } | SetupTarget::Identity { dry_run, .. } => {
            (*dry_run, true)
        }
        SetupTarget::All { dry_run, .. } => (*dry_run, true),
        SetupTarget::Devops { dry_run, .. } => (*dry_run, false),
    };

    match target {
        SetupTarget::Azure { environment, .. } => {
            setup_azure(
                &mut config,
                &cloud,
                &environment.environments(),
                dry_run,
                &mut report,
            )
            .await?;
        }
        SetupTarget::Identity { environment, .. } => {
            setup_identity(
                &mut config,
                &cloud,
                &identity,
                &environment.environments(),
                dry_run,
                &mut report,
            )
            .await?;
        }
        SetupTarget::Devops { environment, .. } => {
            setup_devops(
                &config,
                &devops,
                &environment.environments(),
                dry_run,
                &mut report,
            )
            .await?;
        }
        SetupTarget::All { environment, .. } => {
            setup_all(
                &mut config,
                &cloud,
                &identity,
                &devops,
                &environment.environments(),
                dry_run,
                &mut report,
            )
            .await?;
        }
    }

    report.finish();

    if writes_config && !dry_run {
        loader::save(&mut config, config_path).context("Failed to write configuration back")?;
    }

    super::emit_report(&report, format)?;
    Ok(report.exit_code())
}
