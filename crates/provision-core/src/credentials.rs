//! Federated-credential reconciliation.
//!
//! The trust relationship between a service connection and the federated
//! credential on the app registration breaks when either side is recreated.
//! The fix is always the same: fetch the authoritative issuer/subject pair
//! from the connection object, drop the stale credential, create a fresh
//! one from the fetched values. The pair is never reconstructed from a
//! naming convention; guessed formats are known to fail.

use crate::clients::{DevOpsClient, IdentityClient};
use crate::outcome::{ResourceKind, ResourceOutcome, RunReport};
use crate::{Error, Result};
use provision_config::{DeploymentConfig, Environment};
use tracing::info;

/// Reconcile the federated credential of every selected environment.
///
/// Each environment is handled independently: a failure is recorded and the
/// loop moves on to the next one. Returns the credential names present on
/// the app afterwards; listing them is the only verification step.
pub async fn fix_federated_credentials(
    config: &DeploymentConfig,
    identity: &IdentityClient,
    devops: &DevOpsClient,
    environments: &[Environment],
    report: &mut RunReport,
) -> Result<Vec<String>> {
    let sp = config.service_principal.as_ref().ok_or_else(|| {
        Error::MissingPrecondition(
            "no service principal in configuration; run 'setup identity' first".to_string(),
        )
    })?;

    for &env in environments {
        let sc_name = config.service_connection_name(env);
        let cred_name = config.federated_credential_name(env);

        let result = reconcile_one(identity, devops, &sp.app_id, &sc_name, &cred_name).await;
        match result {
            Ok(()) => {
                info!(environment = %env, credential = %cred_name, "credential recreated");
                report.record(
                    ResourceOutcome::created(ResourceKind::FederatedCredential, &cred_name)
                        .with_message(format!("issuer/subject fetched from '{sc_name}'")),
                );
            }
            Err(e) => {
                report.record(ResourceOutcome::failed(
                    ResourceKind::FederatedCredential,
                    &cred_name,
                    e.to_string(),
                ));
            }
        }
    }

    identity.federated_credential_names(&sp.app_id).await
}

/// Delete-then-recreate one credential from fetched values.
///
/// Never update-in-place: a recreate from the authoritative pair is the
/// only path, so the resulting record always equals what the connection
/// reports.
async fn reconcile_one(
    identity: &IdentityClient,
    devops: &DevOpsClient,
    app_id: &str,
    sc_name: &str,
    cred_name: &str,
) -> Result<()> {
    let endpoint = devops
        .service_endpoint_find(sc_name)
        .await?
        .ok_or_else(|| Error::MissingResource(format!("service connection '{sc_name}'")))?;

    let params = devops.federation_parameters(&endpoint.id).await?;

    let existing = identity.federated_credential_names(app_id).await?;
    if existing.iter().any(|name| name == cred_name) {
        identity.delete_federated_credential(app_id, cred_name).await?;
    }

    identity
        .create_federated_credential(app_id, cred_name, &params.issuer, &params.subject)
        .await?;
    Ok(())
}
