//! `provision status`

use crate::{EnvArg, OutputFormat};
use anyhow::{Context, Result};
use command_runner::{CommandRunner, ProcessRunner};
use comfy_table::{Cell, Color, Table};
use provision_config::{DeploymentConfig, Environment};
use provision_core::{CloudClient, DevOpsClient, Existence, IdentityClient};
use std::path::Path;
use std::sync::Arc;

struct EnvironmentStatus {
    environment: Environment,
    resource_group: bool,
    ai_services: bool,
    service_connection: bool,
    federated_credential: bool,
}

pub async fn run(config_path: &Path, format: OutputFormat, environment: EnvArg) -> Result<u8> {
    let config = provision_config::loader::load(config_path).context("Failed to load configuration")?;

    let runner: Arc<dyn CommandRunner> = Arc::new(ProcessRunner::new());
    let cloud = CloudClient::new(runner.clone(), &config.azure.subscription_id);
    let identity = IdentityClient::new(runner.clone());
    let devops = DevOpsClient::new(
        runner.clone(),
        &config.azure_dev_ops.organization_url,
        &config.azure_dev_ops.project,
    );

    // Credential names are on the app registration, fetched once.
    let credential_names = match &config.service_principal {
        Some(sp) => identity.federated_credential_names(&sp.app_id).await?,
        None => Vec::new(),
    };

    let mut rows = Vec::new();
    for env in environment.environments() {
        let rg = config.resource_group(env);
        let account = config.ai_services_name(env);
        let sc = config.service_connection_name(env);
        let cred = config.federated_credential_name(env);

        rows.push(EnvironmentStatus {
            environment: env,
            resource_group: cloud.resource_group_exists(&rg).await? == Existence::Found,
            ai_services: cloud.ai_services_show(&rg, &account).await? == Existence::Found,
            service_connection: devops.service_endpoint_find(&sc).await?.is_some(),
            federated_credential: credential_names.contains(&cred),
        });
    }

    match format {
        OutputFormat::Json => print_json(&config, &rows)?,
        OutputFormat::Text => print_table(&rows),
    }

    Ok(0)
}

fn print_json(config: &DeploymentConfig, rows: &[EnvironmentStatus]) -> Result<()> {
    let environments: Vec<_> = rows
        .iter()
        .map(|row| {
            serde_json::json!({
                "environment": row.environment.as_str(),
                "resourceGroup": row.resource_group,
                "aiServices": row.ai_services,
                "serviceConnection": row.service_connection,
                "federatedCredential": row.federated_credential,
            })
        })
        .collect();

    let document = serde_json::json!({
        "resourceGroupBase": config.azure.resource_group_base,
        "servicePrincipal": config.service_principal.as_ref().map(|sp| sp.app_id.clone()),
        "environments": environments,
    });

    println!("{}", serde_json::to_string_pretty(&document)?);
    Ok(())
}

fn print_table(rows: &[EnvironmentStatus]) {
    let mut table = Table::new();
    table.set_header(vec![
        "ENVIRONMENT",
        "RESOURCE GROUP",
        "AI SERVICES",
        "SERVICE CONNECTION",
        "FEDERATED CREDENTIAL",
    ]);

    for row in rows {
        table.add_row(vec![
            Cell::new(row.environment.as_str()),
            presence_cell(row.resource_group),
            presence_cell(row.ai_services),
            presence_cell(row.service_connection),
            presence_cell(row.federated_credential),
        ]);
    }

    println!("{table}");
}

fn presence_cell(present: bool) -> Cell {
    if present {
        Cell::new("present").fg(Color::Green)
    } else {
        Cell::new("absent").fg(Color::DarkGrey)
    }
}
