//! `provision fix-credentials`

use crate::{EnvArg, OutputFormat};
use anyhow::{Context, Result};
use command_runner::{CommandRunner, ProcessRunner};
use provision_config::loader;
use provision_core::{DevOpsClient, IdentityClient, RunReport, fix_federated_credentials};
use std::path::Path;
use std::sync::Arc;

pub async fn run(config_path: &Path, format: OutputFormat, environment: EnvArg) -> Result<u8> {
    let config = loader::load(config_path).context("Failed to load configuration")?;

    let runner: Arc<dyn CommandRunner> = Arc::new(ProcessRunner::new());
    let identity = IdentityClient::new(runner.clone());
    let devops = DevOpsClient::new(
        runner.clone(),
        &config.azure_dev_ops.organization_url,
        &config.azure_dev_ops.project,
    );

    let mut report = RunReport::new();
    let credential_names = fix_federated_credentials(
        &config,
        &identity,
        &devops,
        &environment.environments(),
        &mut report,
    )
    .await?;
    report.finish();

    if format == OutputFormat::Text {
        println!("\nFederated credentials on the app registration:");
        if credential_names.is_empty() {
            println!("  (none)");
        }
        for name in &credential_names {
            println!("  - {name}");
        }
    }

    super::emit_report(&report, format)?;
    Ok(report.exit_code())
}
