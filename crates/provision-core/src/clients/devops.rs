//! Client for the DevOps platform CLI.
//!
//! Repositories, service connections, variable groups and pipelines are
//! managed through the platform's own subcommands. The environments REST
//! surface has no dedicated subcommand and is reached through the CLI's
//! `invoke` passthrough, which also owns token handling.

use super::{classify_lookup, expect_success};
use crate::ensure::Existence;
use crate::{Error, Result};
use command_runner::{Command, CommandRunner};
use std::io::Write;
use std::sync::Arc;

/// A service connection as listed by the platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEndpoint {
    /// Endpoint id
    pub id: String,
    /// Endpoint display name
    pub name: String,
}

/// The authoritative trust parameters of a service connection.
///
/// These are fetched from the connection object and treated as opaque;
/// guessed formats are known to fail against the live platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FederationParameters {
    /// Token issuer
    pub issuer: String,
    /// Token subject
    pub subject: String,
}

/// Queries and mutates DevOps artifacts in one organization and project
pub struct DevOpsClient {
    runner: Arc<dyn CommandRunner>,
    organization_url: String,
    project: String,
}

impl DevOpsClient {
    /// Create a client bound to one organization and project
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        organization_url: impl Into<String>,
        project: impl Into<String>,
    ) -> Self {
        Self {
            runner,
            organization_url: organization_url.into(),
            project: project.into(),
        }
    }

    fn az(&self) -> Command {
        Command::new("az")
    }

    fn org_project_args(&self) -> [&str; 4] {
        [
            "--organization",
            &self.organization_url,
            "--project",
            &self.project,
        ]
    }

    /// Whether a repository exists
    pub async fn repository_show(&self, name: &str) -> Result<Existence> {
        let cmd = self
            .az()
            .args(["repos", "show", "--repository", name])
            .args(self.org_project_args());

        classify_lookup(&self.runner.run(cmd).await?, "show repository")
    }

    /// Create a repository
    pub async fn repository_create(&self, name: &str) -> Result<()> {
        let cmd = self
            .az()
            .args(["repos", "create", "--name", name])
            .args(self.org_project_args());

        expect_success(self.runner.run(cmd).await?, "create repository")?;
        Ok(())
    }

    /// Find a service connection by display name
    pub async fn service_endpoint_find(&self, name: &str) -> Result<Option<ServiceEndpoint>> {
        let cmd = self
            .az()
            .args(["devops", "service-endpoint", "list"])
            .args(self.org_project_args())
            .args(["--output", "json"]);

        let output = expect_success(self.runner.run(cmd).await?, "list service connections")?;
        let value = output.json()?;
        let endpoints = value.as_array().ok_or(Error::UnexpectedPayload {
            context: "service endpoint list".to_string(),
        })?;

        for endpoint in endpoints {
            if endpoint["name"].as_str() == Some(name) {
                let id = endpoint["id"].as_str().ok_or(Error::UnexpectedPayload {
                    context: "service endpoint list".to_string(),
                })?;
                return Ok(Some(ServiceEndpoint {
                    id: id.to_string(),
                    name: name.to_string(),
                }));
            }
        }
        Ok(None)
    }

    /// Fetch the authoritative federation issuer and subject of a service
    /// connection.
    ///
    /// The values are returned verbatim; nothing here constructs them from
    /// a naming convention.
    pub async fn federation_parameters(&self, endpoint_id: &str) -> Result<FederationParameters> {
        let cmd = self
            .az()
            .args(["devops", "service-endpoint", "show", "--id", endpoint_id])
            .args(self.org_project_args())
            .args(["--output", "json"]);

        let output = expect_success(self.runner.run(cmd).await?, "show service connection")?;
        let value = output.json()?;
        let parameters = &value["authorization"]["parameters"];

        match (
            parameters["workloadIdentityFederationIssuer"].as_str(),
            parameters["workloadIdentityFederationSubject"].as_str(),
        ) {
            (Some(issuer), Some(subject)) => Ok(FederationParameters {
                issuer: issuer.to_string(),
                subject: subject.to_string(),
            }),
            _ => Err(Error::UnexpectedPayload {
                context: format!("service connection {endpoint_id} federation parameters"),
            }),
        }
    }

    /// Create a workload-identity service connection to a subscription
    pub async fn service_endpoint_create(
        &self,
        name: &str,
        subscription_id: &str,
        tenant_id: &str,
        service_principal_id: &str,
    ) -> Result<()> {
        let cmd = self
            .az()
            .args(["devops", "service-endpoint", "azurerm", "create"])
            .args(["--name", name])
            .args(["--azure-rm-subscription-id", subscription_id])
            .args(["--azure-rm-subscription-name", subscription_id])
            .args(["--azure-rm-tenant-id", tenant_id])
            .args(["--azure-rm-service-principal-id", service_principal_id])
            .args(self.org_project_args());

        expect_success(self.runner.run(cmd).await?, "create service connection")?;
        Ok(())
    }

    /// Whether a variable group exists
    pub async fn variable_group_show(&self, name: &str) -> Result<Existence> {
        match self.variable_group_find(name).await? {
            Some(_) => Ok(Existence::Found),
            None => Ok(Existence::NotFound),
        }
    }

    /// Id of a variable group by name, if one exists
    pub async fn variable_group_find(&self, name: &str) -> Result<Option<i64>> {
        let cmd = self
            .az()
            .args(["pipelines", "variable-group", "list"])
            .args(self.org_project_args())
            .args(["--output", "json"]);

        let output = expect_success(self.runner.run(cmd).await?, "list variable groups")?;
        let value = output.json()?;
        let groups = value.as_array().ok_or(Error::UnexpectedPayload {
            context: "variable group list".to_string(),
        })?;

        Ok(groups
            .iter()
            .find(|g| g["name"].as_str() == Some(name))
            .and_then(|g| g["id"].as_i64()))
    }

    /// Create a variable group with initial variables
    pub async fn variable_group_create(
        &self,
        name: &str,
        variables: &[(String, String)],
    ) -> Result<()> {
        let mut cmd = self
            .az()
            .args(["pipelines", "variable-group", "create", "--name", name])
            .args(["--authorize", "true"])
            .args(self.org_project_args());

        if !variables.is_empty() {
            cmd = cmd.arg("--variables");
            for (key, value) in variables {
                cmd = cmd.arg(format!("{key}={value}"));
            }
        }

        expect_success(self.runner.run(cmd).await?, "create variable group")?;
        Ok(())
    }

    /// Whether a deployment environment exists
    pub async fn environment_show(&self, name: &str) -> Result<Existence> {
        let cmd = self
            .az()
            .args(["devops", "invoke"])
            .args(["--area", "distributedtask", "--resource", "environments"])
            .args(["--route-parameters"])
            .arg(format!("project={}", self.project))
            .args(["--http-method", "GET"])
            .args(["--organization", &self.organization_url])
            .args(["--api-version", "7.1"])
            .args(["--output", "json"]);

        let output = expect_success(self.runner.run(cmd).await?, "list environments")?;
        let value = output.json()?;
        let environments = value["value"].as_array().ok_or(Error::UnexpectedPayload {
            context: "environment list".to_string(),
        })?;

        let found = environments
            .iter()
            .any(|e| e["name"].as_str() == Some(name));
        Ok(if found {
            Existence::Found
        } else {
            Existence::NotFound
        })
    }

    /// Create a deployment environment.
    ///
    /// The REST payload goes through a temporary file because the CLI's
    /// `invoke` passthrough only reads request bodies from disk.
    pub async fn environment_create(&self, name: &str) -> Result<()> {
        let payload = serde_json::json!({
            "name": name,
            "description": format!("{name} environment"),
        });

        let mut file = tempfile::NamedTempFile::new()?;
        file.write_all(payload.to_string().as_bytes())?;

        let cmd = self
            .az()
            .args(["devops", "invoke"])
            .args(["--area", "distributedtask", "--resource", "environments"])
            .args(["--route-parameters"])
            .arg(format!("project={}", self.project))
            .args(["--http-method", "POST"])
            .args(["--in-file"])
            .arg(file.path().to_string_lossy().into_owned())
            .args(["--media-type", "application/json"])
            .args(["--organization", &self.organization_url])
            .args(["--api-version", "7.1"]);

        expect_success(self.runner.run(cmd).await?, "create environment")?;
        Ok(())
    }

    /// Whether a pipeline definition exists
    pub async fn pipeline_show(&self, name: &str) -> Result<Existence> {
        let cmd = self
            .az()
            .args(["pipelines", "show", "--name", name])
            .args(self.org_project_args());

        classify_lookup(&self.runner.run(cmd).await?, "show pipeline")
    }

    /// Create a pipeline definition from a YAML file in a repository
    pub async fn pipeline_create(
        &self,
        name: &str,
        repository: &str,
        branch: &str,
        yaml_path: &str,
    ) -> Result<()> {
        let cmd = self
            .az()
            .args(["pipelines", "create", "--name", name])
            .args(["--repository", repository, "--repository-type", "tfsgit"])
            .args(["--branch", branch, "--yml-path", yaml_path])
            .args(["--skip-first-run"])
            .args(self.org_project_args());

        expect_success(self.runner.run(cmd).await?, "create pipeline")?;
        Ok(())
    }
}
