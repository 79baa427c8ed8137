//! Client for the identity provider CLI: app registrations, service
//! principals and federated credentials.

use super::{classify_lookup, expect_success};
use crate::ensure::Existence;
use crate::{Error, Result};
use command_runner::{Command, CommandRunner};
use std::sync::Arc;

/// Audience accepted by the token exchange for federated credentials
pub const TOKEN_EXCHANGE_AUDIENCE: &str = "api://AzureADTokenExchange";

/// An app registration as returned by the identity provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppRegistration {
    /// Application (client) id
    pub app_id: String,
    /// Object id of the app registration
    pub object_id: String,
}

/// Queries and mutates the identity provider
pub struct IdentityClient {
    runner: Arc<dyn CommandRunner>,
}

impl IdentityClient {
    /// Create a new identity client
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    fn az(&self) -> Command {
        Command::new("az")
    }

    fn parse_app(value: &serde_json::Value, context: &str) -> Result<AppRegistration> {
        match (value["appId"].as_str(), value["id"].as_str()) {
            (Some(app_id), Some(object_id)) => Ok(AppRegistration {
                app_id: app_id.to_string(),
                object_id: object_id.to_string(),
            }),
            _ => Err(Error::UnexpectedPayload {
                context: context.to_string(),
            }),
        }
    }

    /// Find an app registration by display name
    pub async fn find_app(&self, display_name: &str) -> Result<Option<AppRegistration>> {
        let cmd = self
            .az()
            .args(["ad", "app", "list", "--display-name", display_name])
            .args(["--output", "json"]);

        let output = expect_success(self.runner.run(cmd).await?, "list app registrations")?;
        let value = output.json()?;
        let apps = value.as_array().ok_or(Error::UnexpectedPayload {
            context: "app list".to_string(),
        })?;

        match apps.first() {
            Some(app) => Ok(Some(Self::parse_app(app, "app list")?)),
            None => Ok(None),
        }
    }

    /// Create an app registration
    pub async fn create_app(&self, display_name: &str) -> Result<AppRegistration> {
        let cmd = self
            .az()
            .args(["ad", "app", "create", "--display-name", display_name])
            .args(["--output", "json"]);

        let output = expect_success(self.runner.run(cmd).await?, "create app registration")?;
        Self::parse_app(&output.json()?, "app create")
    }

    /// Object id of the service principal for an app, if one exists
    pub async fn service_principal(&self, app_id: &str) -> Result<Option<String>> {
        let cmd = self
            .az()
            .args(["ad", "sp", "show", "--id", app_id])
            .args(["--output", "json"]);

        let output = self.runner.run(cmd).await?;
        match classify_lookup(&output, "show service principal")? {
            Existence::NotFound => Ok(None),
            Existence::Found => {
                let value = output.json()?;
                let object_id = value["id"].as_str().ok_or(Error::UnexpectedPayload {
                    context: "sp show".to_string(),
                })?;
                Ok(Some(object_id.to_string()))
            }
        }
    }

    /// Create the service principal for an app, returning its object id
    pub async fn create_service_principal(&self, app_id: &str) -> Result<String> {
        let cmd = self
            .az()
            .args(["ad", "sp", "create", "--id", app_id])
            .args(["--output", "json"]);

        let output = expect_success(self.runner.run(cmd).await?, "create service principal")?;
        let value = output.json()?;
        let object_id = value["id"].as_str().ok_or(Error::UnexpectedPayload {
            context: "sp create".to_string(),
        })?;
        Ok(object_id.to_string())
    }

    /// Names of the federated credentials on an app
    pub async fn federated_credential_names(&self, app_id: &str) -> Result<Vec<String>> {
        let cmd = self
            .az()
            .args(["ad", "app", "federated-credential", "list", "--id", app_id])
            .args(["--output", "json"]);

        let output = expect_success(self.runner.run(cmd).await?, "list federated credentials")?;
        let value = output.json()?;
        let credentials = value.as_array().ok_or(Error::UnexpectedPayload {
            context: "federated credential list".to_string(),
        })?;

        Ok(credentials
            .iter()
            .filter_map(|c| c["name"].as_str())
            .map(String::from)
            .collect())
    }

    /// Delete a federated credential by logical name
    pub async fn delete_federated_credential(&self, app_id: &str, name: &str) -> Result<()> {
        let cmd = self
            .az()
            .args(["ad", "app", "federated-credential", "delete"])
            .args(["--id", app_id, "--federated-credential-id", name]);

        expect_success(self.runner.run(cmd).await?, "delete federated credential")?;
        Ok(())
    }

    /// Create a federated credential.
    ///
    /// `issuer` and `subject` are opaque values fetched from the service
    /// connection and passed through verbatim.
    pub async fn create_federated_credential(
        &self,
        app_id: &str,
        name: &str,
        issuer: &str,
        subject: &str,
    ) -> Result<()> {
        let parameters = serde_json::json!({
            "name": name,
            "issuer": issuer,
            "subject": subject,
            "audiences": [TOKEN_EXCHANGE_AUDIENCE],
        });

        let cmd = self
            .az()
            .args(["ad", "app", "federated-credential", "create"])
            .args(["--id", app_id, "--parameters"])
            .arg(parameters.to_string());

        expect_success(self.runner.run(cmd).await?, "create federated credential")?;
        Ok(())
    }

    /// Delete an app registration. Synchronous, unlike resource group
    /// deletion.
    pub async fn delete_app(&self, app_id: &str) -> Result<()> {
        let cmd = self.az().args(["ad", "app", "delete", "--id", app_id]);

        expect_success(self.runner.run(cmd).await?, "delete app registration")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use command_runner::ScriptedRunner;

    #[smol_potat::test]
    async fn test_find_app_empty_list_is_none() {
        let runner = Arc::new(ScriptedRunner::new());
        runner.ok("ad app list", "[]");

        let identity = IdentityClient::new(runner);
        assert!(identity.find_app("rg-demo-automation").await.unwrap().is_none());
    }

    #[smol_potat::test]
    async fn test_find_app_parses_first_match() {
        let runner = Arc::new(ScriptedRunner::new());
        runner.ok(
            "ad app list",
            r#"[{"appId": "app-123", "id": "obj-456", "displayName": "rg-demo-automation"}]"#,
        );

        let identity = IdentityClient::new(runner);
        let app = identity.find_app("rg-demo-automation").await.unwrap().unwrap();
        assert_eq!(
            app,
            AppRegistration {
                app_id: "app-123".to_string(),
                object_id: "obj-456".to_string(),
            }
        );
    }

    #[smol_potat::test]
    async fn test_service_principal_not_found() {
        let runner = Arc::new(ScriptedRunner::new());
        runner.fail(
            "ad sp show",
            1,
            "ERROR: Resource 'app-123' does not exist or one of its queried reference-property objects are not present.",
        );

        let identity = IdentityClient::new(runner);
        assert!(identity.service_principal("app-123").await.unwrap().is_none());
    }

    #[smol_potat::test]
    async fn test_create_federated_credential_passes_values_verbatim() {
        let runner = Arc::new(ScriptedRunner::new());
        runner.ok("federated-credential create", "{}");

        let identity = IdentityClient::new(runner.clone());
        identity
            .create_federated_credential(
                "app-123",
                "devops-federation-dev",
                "https://vstoken.dev.azure.com/org-guid",
                "sc://contoso/starter/sc-rg-demo-dev",
            )
            .await
            .unwrap();

        let calls = runner.calls();
        assert!(calls[0].contains("https://vstoken.dev.azure.com/org-guid"));
        assert!(calls[0].contains("sc://contoso/starter/sc-rg-demo-dev"));
        assert!(calls[0].contains(TOKEN_EXCHANGE_AUDIENCE));
    }

    #[smol_potat::test]
    async fn test_malformed_app_payload() {
        let runner = Arc::new(ScriptedRunner::new());
        runner.ok("ad app create", r#"{"displayName": "x"}"#);

        let identity = IdentityClient::new(runner);
        let result = identity.create_app("x").await;
        assert!(matches!(result, Err(Error::UnexpectedPayload { .. })));
    }
}
