//! `provision validate`

use anyhow::{Context, Result};
use provision_config::{ConfigError, Environment, loader, resolver};
use std::path::Path;

pub async fn run(config_path: &Path) -> Result<u8> {
    println!("Validating {}...", config_path.display());

    let content = match std::fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ConfigError::NotFound(config_path.to_path_buf()).into());
        }
        Err(e) => return Err(e).context("Failed to read configuration"),
    };

    // Warn about referenced-but-unset variables before resolution turns
    // the ones without defaults into hard errors.
    for reference in resolver::find_references(&content) {
        if std::env::var(&reference.name).is_err() && !reference.has_default {
            println!(
                "  ⚠ References undefined environment variable: {}",
                reference.name
            );
        }
    }

    let config = loader::load_str(&content).context("Failed to parse configuration")?;

    println!("✓ Configuration valid");
    println!("  Schema version: {}", config.metadata.schema_version);
    println!("  Organization: {}", config.azure_dev_ops.organization_url);
    println!("  Project: {}", config.azure_dev_ops.project);
    println!("  Resource group base: {}", config.azure.resource_group_base);

    for env in Environment::ALL {
        let record = config.azure.environments.get(env);
        match &record.ai_project_endpoint {
            Some(endpoint) => println!("  {env}: {endpoint}"),
            None => println!("  {env}: no project endpoint yet"),
        }
    }

    match &config.service_principal {
        Some(identity) => println!("  Service principal: {}", identity.app_id),
        None => println!("  Service principal: not configured"),
    }

    Ok(0)
}
