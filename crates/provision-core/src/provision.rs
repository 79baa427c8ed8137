//! The provisioning flows.
//!
//! Control flow is strictly linear: for each target environment, for each
//! declared resource, check/create/tag, record the outcome, keep going.
//! A failed step never aborts the loop and never rolls anything back.

use crate::clients::{CloudClient, DevOpsClient, IdentityClient};
use crate::ensure::{Existence, ensure_resource};
use crate::outcome::{ResourceKind, ResourceOutcome, RunReport};
use crate::{Error, Result};
use provision_config::{DeploymentConfig, Environment, ServicePrincipalIdentity};
use std::time::Duration;
use tracing::{info, warn};

/// Role granted to the automation identity on each resource group
pub(crate) const RESOURCE_GROUP_ROLE: &str = "Contributor";

/// Provision cloud resources: resource group, AI Services account and AI
/// project per environment.
///
/// The endpoint of each environment's AI project is written back into the
/// configuration; the caller is responsible for saving it.
pub async fn setup_azure(
    config: &mut DeploymentConfig,
    cloud: &CloudClient,
    environments: &[Environment],
    dry_run: bool,
    report: &mut RunReport,
) -> Result<()> {
    let location = config.azure.location.clone();
    let tags = config.settings.tags.clone();

    for &env in environments {
        info!(environment = %env, "provisioning cloud resources");

        let rg = config.resource_group(env);
        report.record(
            ensure_resource(
                ResourceKind::ResourceGroup,
                &rg,
                dry_run,
                cloud.resource_group_exists(&rg),
                cloud.resource_group_create(&rg, &location, &tags),
            )
            .await,
        );

        let account = config.ai_services_name(env);
        report.record(
            ensure_resource(
                ResourceKind::AiServices,
                &account,
                dry_run,
                cloud.ai_services_show(&rg, &account),
                cloud.ai_services_create(&rg, &account, &location, &tags),
            )
            .await,
        );

        let project = config.ai_project_name(env);
        let outcome = ensure_resource(
            ResourceKind::AiProject,
            &project,
            dry_run,
            cloud.ai_project_show(&rg, &account, &project),
            cloud.ai_project_create(&rg, &account, &project, &location),
        )
        .await;
        let project_usable = !outcome.status.is_failed();
        report.record(outcome);

        let endpoint_missing = config
            .azure
            .environments
            .get(env)
            .ai_project_endpoint
            .is_none();
        if !dry_run && project_usable && endpoint_missing {
            match cloud.ai_project_endpoint(&rg, &account, &project).await {
                Ok(Some(endpoint)) => {
                    config.azure.environments.get_mut(env).ai_project_endpoint = Some(endpoint);
                }
                Ok(None) => {}
                Err(e) => warn!(project = %project, error = %e, "could not read project endpoint"),
            }
        }
    }

    Ok(())
}

/// Provision the automation identity: app registration, service principal
/// and a role assignment per environment.
///
/// The created identity is written back into the configuration; the caller
/// is responsible for saving it. A fixed sleep separates identity creation
/// from the role assignments, because the identity takes a moment to become
/// visible to the authorization system.
pub async fn setup_identity(
    config: &mut DeploymentConfig,
    cloud: &CloudClient,
    identity: &IdentityClient,
    environments: &[Environment],
    dry_run: bool,
    report: &mut RunReport,
) -> Result<()> {
    let display_name = config.service_principal_display_name();
    let kind = ResourceKind::ServicePrincipal;

    // The app and service principal ids have to be captured for the
    // write-back, so this step is spelled out instead of going through
    // ensure_resource.
    let existing = match identity.find_app(&display_name).await {
        Ok(existing) => existing,
        Err(e) => {
            report.record(ResourceOutcome::failed(
                kind,
                &display_name,
                format!("lookup failed: {e}"),
            ));
            return Ok(());
        }
    };

    let (app, created) = match existing {
        Some(app) => (app, false),
        None if dry_run => {
            report.record(ResourceOutcome::skipped(
                kind,
                &display_name,
                "dry run - would create",
            ));
            record_dry_run_assignments(config, environments, report);
            return Ok(());
        }
        None => match identity.create_app(&display_name).await {
            Ok(app) => (app, true),
            Err(e) => {
                report.record(ResourceOutcome::failed(kind, &display_name, e.to_string()));
                return Ok(());
            }
        },
    };

    let object_id = match identity.service_principal(&app.app_id).await {
        Ok(Some(object_id)) => object_id,
        Ok(None) if dry_run => {
            report.record(ResourceOutcome::skipped(
                kind,
                &display_name,
                "dry run - would create service principal",
            ));
            record_dry_run_assignments(config, environments, report);
            return Ok(());
        }
        Ok(None) => match identity.create_service_principal(&app.app_id).await {
            Ok(object_id) => object_id,
            Err(e) => {
                report.record(ResourceOutcome::failed(kind, &display_name, e.to_string()));
                return Ok(());
            }
        },
        Err(e) => {
            report.record(ResourceOutcome::failed(
                kind,
                &display_name,
                format!("lookup failed: {e}"),
            ));
            return Ok(());
        }
    };

    if created {
        report.record(ResourceOutcome::created(kind, &display_name));
    } else {
        report.record(ResourceOutcome::skipped(kind, &display_name, "already exists"));
    }

    config.service_principal = Some(ServicePrincipalIdentity {
        app_id: app.app_id.clone(),
        object_id,
        tenant_id: config.azure.tenant_id.clone(),
        display_name: display_name.clone(),
    });

    if created && !dry_run {
        let delay = config.settings.propagation_delay_secs();
        info!(delay, "waiting for identity propagation");
        async_io::Timer::after(Duration::from_secs(delay)).await;
    }

    for &env in environments {
        let rg = config.resource_group(env);
        let scope = cloud.resource_group_scope(&rg);
        let name = format!("{RESOURCE_GROUP_ROLE} on {rg}");
        report.record(
            ensure_resource(
                ResourceKind::RoleAssignment,
                &name,
                dry_run,
                cloud.role_assignment_exists(&app.app_id, RESOURCE_GROUP_ROLE, &scope),
                cloud.role_assignment_create(&app.app_id, RESOURCE_GROUP_ROLE, &scope),
            )
            .await,
        );
    }

    Ok(())
}

fn record_dry_run_assignments(
    config: &DeploymentConfig,
    environments: &[Environment],
    report: &mut RunReport,
) {
    for &env in environments {
        let name = format!("{RESOURCE_GROUP_ROLE} on {}", config.resource_group(env));
        report.record(ResourceOutcome::skipped(
            ResourceKind::RoleAssignment,
            name,
            "dry run - would create",
        ));
    }
}

/// Provision DevOps artifacts: repository, then per environment a service
/// connection, a variable group and a deployment environment, then the
/// pipeline.
///
/// Requires the service principal to be configured already; its absence is
/// a fatal precondition failure.
pub async fn setup_devops(
    config: &DeploymentConfig,
    devops: &DevOpsClient,
    environments: &[Environment],
    dry_run: bool,
    report: &mut RunReport,
) -> Result<()> {
    let sp = config.service_principal.as_ref().ok_or_else(|| {
        Error::MissingPrecondition(
            "no service principal in configuration; run 'setup identity' first".to_string(),
        )
    })?;

    let repo = config.azure_dev_ops.repository_name().to_string();
    report.record(
        ensure_resource(
            ResourceKind::Repository,
            &repo,
            dry_run,
            devops.repository_show(&repo),
            devops.repository_create(&repo),
        )
        .await,
    );

    for &env in environments {
        info!(environment = %env, "provisioning devops artifacts");

        let sc = config.service_connection_name(env);
        report.record(
            ensure_resource(
                ResourceKind::ServiceConnection,
                &sc,
                dry_run,
                async {
                    Ok(match devops.service_endpoint_find(&sc).await? {
                        Some(_) => Existence::Found,
                        None => Existence::NotFound,
                    })
                },
                devops.service_endpoint_create(
                    &sc,
                    &config.azure.subscription_id,
                    &config.azure.tenant_id,
                    &sp.app_id,
                ),
            )
            .await,
        );

        let vg = config.variable_group_name(env);
        let variables = variable_group_seed(config, env, &sc);
        report.record(
            ensure_resource(
                ResourceKind::VariableGroup,
                &vg,
                dry_run,
                devops.variable_group_show(&vg),
                devops.variable_group_create(&vg, &variables),
            )
            .await,
        );

        let env_name = config.devops_environment_name(env);
        report.record(
            ensure_resource(
                ResourceKind::DevOpsEnvironment,
                &env_name,
                dry_run,
                devops.environment_show(&env_name),
                devops.environment_create(&env_name),
            )
            .await,
        );
    }

    let pipeline = config.pipeline_name();
    report.record(
        ensure_resource(
            ResourceKind::Pipeline,
            &pipeline,
            dry_run,
            devops.pipeline_show(&pipeline),
            devops.pipeline_create(&pipeline, &repo, "main", "azure-pipelines.yml"),
        )
        .await,
    );

    Ok(())
}

fn variable_group_seed(
    config: &DeploymentConfig,
    env: Environment,
    service_connection: &str,
) -> Vec<(String, String)> {
    let record = config.azure.environments.get(env);
    vec![
        (
            "AZURE_SUBSCRIPTION_ID".to_string(),
            config.azure.subscription_id.clone(),
        ),
        (
            "AI_PROJECT_ENDPOINT".to_string(),
            record.ai_project_endpoint.clone().unwrap_or_default(),
        ),
        (
            "SERVICE_CONNECTION".to_string(),
            service_connection.to_string(),
        ),
    ]
}

/// Run the three provisioning flows in order
pub async fn setup_all(
    config: &mut DeploymentConfig,
    cloud: &CloudClient,
    identity: &IdentityClient,
    devops: &DevOpsClient,
    environments: &[Environment],
    dry_run: bool,
    report: &mut RunReport,
) -> Result<()> {
    setup_azure(config, cloud, environments, dry_run, report).await?;
    setup_identity(config, cloud, identity, environments, dry_run, report).await?;
    setup_devops(config, devops, environments, dry_run, report).await?;
    Ok(())
}
