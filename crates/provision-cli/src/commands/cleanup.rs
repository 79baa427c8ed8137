//! `provision cleanup`

use anyhow::{Context, Result};
use command_runner::{CommandRunner, ProcessRunner};
use provision_config::loader;
use provision_core::{CloudClient, IdentityClient, discover_cleanup, execute_cleanup};
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Arc;

pub async fn run(config_path: &Path, force: bool) -> Result<u8> {
    let config = loader::load(config_path).context("Failed to load configuration")?;

    let runner: Arc<dyn CommandRunner> = Arc::new(ProcessRunner::new());
    let cloud = CloudClient::new(runner.clone(), &config.azure.subscription_id);
    let identity = IdentityClient::new(runner.clone());

    let plan = discover_cleanup(&config, &cloud, &identity).await?;

    if plan.is_empty() {
        println!("Nothing to delete.");
        return Ok(0);
    }

    println!("The following will be deleted:");
    for rg in &plan.resource_groups {
        println!("  - resource group '{rg}'");
    }
    if let Some(app) = &plan.app {
        println!(
            "  - app registration '{}' ({})",
            plan.app_display_name, app.app_id
        );
    }

    if !force {
        let phrase = &config.azure.resource_group_base;
        print!("\nType '{phrase}' to confirm deletion: ");
        io::stdout().flush()?;

        let mut answer = String::new();
        io::stdin().lock().read_line(&mut answer)?;
        if answer.trim() != phrase {
            println!("Cleanup aborted.");
            return Ok(0);
        }
    }

    let summary = execute_cleanup(&plan, &cloud, &identity).await?;

    println!();
    for line in &summary.deleted {
        println!("✓ {line}");
    }
    for (resource, error) in &summary.failed {
        eprintln!("✗ {resource}: {error}");
    }
    println!(
        "\n{} deleted, {} failed",
        summary.deleted.len(),
        summary.failed.len()
    );
    println!("Note: resource group deletion continues in the background.");

    Ok(summary.exit_code())
}
