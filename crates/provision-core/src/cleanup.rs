//! Teardown of everything the harness created.
//!
//! A single linear pass: enumerate resources by name prefix, let the caller
//! confirm, then delete. Resource group deletion is asynchronous fire and
//! forget; the identity is deleted synchronously.

use crate::clients::{AppRegistration, CloudClient, IdentityClient};
use crate::Result;
use provision_config::DeploymentConfig;
use tracing::info;

/// Everything slated for deletion
#[derive(Debug, Clone)]
pub struct CleanupPlan {
    /// Resource groups matching the configured name prefix
    pub resource_groups: Vec<String>,
    /// The automation app registration, if one exists
    pub app: Option<AppRegistration>,
    /// Display name used to find the app, for printing
    pub app_display_name: String,
}

impl CleanupPlan {
    /// True when there is nothing to delete
    pub fn is_empty(&self) -> bool {
        self.resource_groups.is_empty() && self.app.is_none()
    }
}

/// What happened during a cleanup run
#[derive(Debug, Default)]
pub struct CleanupSummary {
    /// Human-readable lines for completed deletions
    pub deleted: Vec<String>,
    /// (resource, error) pairs for failed deletions
    pub failed: Vec<(String, String)>,
}

impl CleanupSummary {
    /// Process exit code: `0` when every deletion went through
    pub fn exit_code(&self) -> u8 {
        if self.failed.is_empty() { 0 } else { 1 }
    }
}

/// Enumerate what a cleanup would delete, without deleting anything
pub async fn discover_cleanup(
    config: &DeploymentConfig,
    cloud: &CloudClient,
    identity: &IdentityClient,
) -> Result<CleanupPlan> {
    let prefix = format!("{}-", config.azure.resource_group_base);
    let resource_groups = cloud.resource_groups_with_prefix(&prefix).await?;

    let app_display_name = config.service_principal_display_name();
    let app = identity.find_app(&app_display_name).await?;

    Ok(CleanupPlan {
        resource_groups,
        app,
        app_display_name,
    })
}

/// Delete everything in the plan.
///
/// Failures are collected, not fatal; the pass always finishes.
pub async fn execute_cleanup(
    plan: &CleanupPlan,
    cloud: &CloudClient,
    identity: &IdentityClient,
) -> Result<CleanupSummary> {
    let mut summary = CleanupSummary::default();

    for rg in &plan.resource_groups {
        match cloud.resource_group_delete_nowait(rg).await {
            Ok(()) => {
                info!(resource_group = %rg, "deletion requested");
                summary
                    .deleted
                    .push(format!("resource group '{rg}' (deletion requested)"));
            }
            Err(e) => summary.failed.push((rg.clone(), e.to_string())),
        }
    }

    if let Some(app) = &plan.app {
        match identity.delete_app(&app.app_id).await {
            Ok(()) => {
                info!(app_id = %app.app_id, "app registration deleted");
                summary.deleted.push(format!(
                    "app registration '{}' ({})",
                    plan.app_display_name, app.app_id
                ));
            }
            Err(e) => summary
                .failed
                .push((plan.app_display_name.clone(), e.to_string())),
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use command_runner::ScriptedRunner;
    use std::sync::Arc;

    fn config() -> DeploymentConfig {
        provision_config::loader::load_str(
            r#"{
                "metadata": { "schemaVersion": "1.0" },
                "azureDevOps": {
                    "organizationUrl": "https://dev.azure.com/contoso",
                    "project": "starter"
                },
                "azure": {
                    "subscriptionId": "00000000-0000-0000-0000-000000000000",
                    "tenantId": "11111111-1111-1111-1111-111111111111",
                    "location": "westeurope",
                    "resourceGroupBase": "rg-demo",
                    "environments": {}
                }
            }"#,
        )
        .unwrap()
    }

    #[smol_potat::test]
    async fn test_discover_matches_prefix_only() {
        let runner = Arc::new(ScriptedRunner::new());
        runner.ok(
            "group list",
            r#"[{"name": "rg-demo-dev"}, {"name": "rg-demolition"}, {"name": "rg-demo-prod"}]"#,
        );
        runner.ok("ad app list", "[]");

        let config = config();
        let cloud = CloudClient::new(runner.clone(), &config.azure.subscription_id);
        let identity = IdentityClient::new(runner);

        let plan = discover_cleanup(&config, &cloud, &identity).await.unwrap();
        assert_eq!(plan.resource_groups, vec!["rg-demo-dev", "rg-demo-prod"]);
        assert!(plan.app.is_none());
        assert!(!plan.is_empty());
    }

    #[smol_potat::test]
    async fn test_execute_collects_failures_and_finishes() {
        let runner = Arc::new(ScriptedRunner::new());
        runner.fail("group delete --name rg-demo-dev", 1, "ERROR: denied");
        runner.ok("group delete --name rg-demo-prod", "");
        runner.ok("ad app delete", "");

        let plan = CleanupPlan {
            resource_groups: vec!["rg-demo-dev".to_string(), "rg-demo-prod".to_string()],
            app: Some(AppRegistration {
                app_id: "app-123".to_string(),
                object_id: "obj-456".to_string(),
            }),
            app_display_name: "rg-demo-automation".to_string(),
        };

        let cloud = CloudClient::new(runner.clone(), "sub");
        let identity = IdentityClient::new(runner.clone());
        let summary = execute_cleanup(&plan, &cloud, &identity).await.unwrap();

        assert_eq!(summary.deleted.len(), 2);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.exit_code(), 1);

        // The failed group did not stop the rest of the pass.
        assert_eq!(runner.call_count("group delete"), 2);
        assert_eq!(runner.call_count("ad app delete"), 1);

        // Group deletes are fire and forget.
        assert!(runner.calls()[0].contains("--no-wait"));
    }
}
