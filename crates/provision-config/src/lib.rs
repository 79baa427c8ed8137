//! # Provision Configuration
//!
//! JSON configuration loader for provision-harness.
//!
//! This crate parses `starter-config.json` files into a typed
//! [`DeploymentConfig`], the single source of truth consumed by every
//! command. The configuration is loaded once per process invocation and
//! passed explicitly; nothing re-reads the file mid-run.

#![warn(missing_docs)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

pub mod loader;
pub mod resolver;

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file does not exist
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    /// Failed to read configuration file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse JSON
    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    /// Environment variable not found
    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),
}

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// The three fixed deployment environments.
///
/// The configuration always carries exactly these three; there is no
/// dynamic environment list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Development
    Dev,
    /// Test
    Test,
    /// Production
    Prod,
}

impl Environment {
    /// All environments, in promotion order
    pub const ALL: [Environment; 3] = [Environment::Dev, Environment::Test, Environment::Prod];

    /// The environment's canonical lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Dev => "dev",
            Environment::Test => "test",
            Environment::Prod => "prod",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "dev" => Ok(Environment::Dev),
            "test" => Ok(Environment::Test),
            "prod" => Ok(Environment::Prod),
            other => Err(ConfigError::ValidationError(format!(
                "Unknown environment '{other}', expected dev, test or prod"
            ))),
        }
    }
}

/// Root configuration structure, one per deployment
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentConfig {
    /// Schema version and modification timestamp
    pub metadata: Metadata,

    /// DevOps organization and project settings
    pub azure_dev_ops: DevOpsSettings,

    /// Cloud subscription and per-environment resource settings
    pub azure: CloudSettings,

    /// Automation identity, present once created and persisted back
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_principal: Option<ServicePrincipalIdentity>,

    /// Tunables with defaults
    #[serde(default, skip_serializing_if = "Settings::is_default")]
    pub settings: Settings,
}

/// Configuration document metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    /// Configuration schema version
    pub schema_version: String,

    /// When the file was last written by a tool
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
}

/// DevOps organization settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DevOpsSettings {
    /// Organization URL, e.g. `https://dev.azure.com/contoso`
    pub organization_url: String,

    /// Project name within the organization
    pub project: String,

    /// Repository name; defaults to the project name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
}

impl DevOpsSettings {
    /// The effective repository name
    pub fn repository_name(&self) -> &str {
        self.repository.as_deref().unwrap_or(&self.project)
    }
}

/// Cloud subscription settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CloudSettings {
    /// Target subscription id
    pub subscription_id: String,

    /// Tenant id of the subscription
    pub tenant_id: String,

    /// Region for all created resources
    pub location: String,

    /// Base name from which all resource names are derived
    pub resource_group_base: String,

    /// Per-environment resource names and endpoints
    pub environments: Environments,
}

/// The fixed set of per-environment records
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Environments {
    /// Development environment
    #[serde(default)]
    pub dev: EnvironmentRecord,
    /// Test environment
    #[serde(default)]
    pub test: EnvironmentRecord,
    /// Production environment
    #[serde(default)]
    pub prod: EnvironmentRecord,
}

impl Environments {
    /// The record for the given environment
    pub fn get(&self, env: Environment) -> &EnvironmentRecord {
        match env {
            Environment::Dev => &self.dev,
            Environment::Test => &self.test,
            Environment::Prod => &self.prod,
        }
    }

    /// Mutable record for the given environment
    pub fn get_mut(&mut self, env: Environment) -> &mut EnvironmentRecord {
        match env {
            Environment::Dev => &mut self.dev,
            Environment::Test => &mut self.test,
            Environment::Prod => &mut self.prod,
        }
    }
}

/// Environment-scoped resource names and endpoints.
///
/// Unset names are derived from the resource group base name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentRecord {
    /// Endpoint of the environment's AI project, written back on creation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_project_endpoint: Option<String>,

    /// AI Services account name override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_services_name: Option<String>,

    /// Service connection name override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_connection: Option<String>,
}

/// The automation identity created by `setup identity`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServicePrincipalIdentity {
    /// Application (client) id
    pub app_id: String,

    /// Service principal object id
    pub object_id: String,

    /// Tenant the identity lives in
    pub tenant_id: String,

    /// Display name of the app registration
    pub display_name: String,
}

/// Tunables with defaults
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Fixed sleep between dependent creations, in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub propagation_delay_secs: Option<u64>,

    /// Tags applied to every created cloud resource
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

impl Settings {
    /// Check if settings are default
    fn is_default(&self) -> bool {
        self == &Settings::default()
    }

    /// The effective propagation delay
    pub fn propagation_delay_secs(&self) -> u64 {
        self.propagation_delay_secs.unwrap_or(20)
    }
}

impl DeploymentConfig {
    /// Resource group name for an environment
    pub fn resource_group(&self, env: Environment) -> String {
        format!("{}-{}", self.azure.resource_group_base, env)
    }

    /// AI Services account name for an environment
    pub fn ai_services_name(&self, env: Environment) -> String {
        self.azure
            .environments
            .get(env)
            .ai_services_name
            .clone()
            .unwrap_or_else(|| format!("{}-ai-{}", self.azure.resource_group_base, env))
    }

    /// AI project name for an environment
    pub fn ai_project_name(&self, env: Environment) -> String {
        format!("{}-project-{}", self.azure.resource_group_base, env)
    }

    /// Service connection name for an environment
    pub fn service_connection_name(&self, env: Environment) -> String {
        self.azure
            .environments
            .get(env)
            .service_connection
            .clone()
            .unwrap_or_else(|| format!("sc-{}-{}", self.azure.resource_group_base, env))
    }

    /// Variable group name for an environment
    pub fn variable_group_name(&self, env: Environment) -> String {
        format!("vg-{}-{}", self.azure.resource_group_base, env)
    }

    /// Logical federated credential name for an environment.
    ///
    /// This names the credential record; the issuer and subject inside it
    /// are always fetched from the service connection, never derived.
    pub fn federated_credential_name(&self, env: Environment) -> String {
        format!("devops-federation-{env}")
    }

    /// DevOps environment name for an environment
    pub fn devops_environment_name(&self, env: Environment) -> String {
        env.as_str().to_string()
    }

    /// CI pipeline name
    pub fn pipeline_name(&self) -> String {
        format!("{}-ci", self.azure_dev_ops.repository_name())
    }

    /// Display name used when the app registration is first created
    pub fn service_principal_display_name(&self) -> String {
        match &self.service_principal {
            Some(identity) => identity.display_name.clone(),
            None => format!("{}-automation", self.azure.resource_group_base),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> DeploymentConfig {
        loader::load_str(
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

    #[test]
    fn test_derived_names() {
        let config = minimal();
        assert_eq!(config.resource_group(Environment::Dev), "rg-demo-dev");
        assert_eq!(config.ai_services_name(Environment::Test), "rg-demo-ai-test");
        assert_eq!(
            config.service_connection_name(Environment::Prod),
            "sc-rg-demo-prod"
        );
        assert_eq!(config.variable_group_name(Environment::Dev), "vg-rg-demo-dev");
        assert_eq!(
            config.federated_credential_name(Environment::Dev),
            "devops-federation-dev"
        );
        assert_eq!(config.pipeline_name(), "starter-ci");
    }

    #[test]
    fn test_name_overrides_win() {
        let mut config = minimal();
        config.azure.environments.dev.ai_services_name = Some("custom-ai".to_string());
        config.azure.environments.dev.service_connection = Some("sc-custom".to_string());

        assert_eq!(config.ai_services_name(Environment::Dev), "custom-ai");
        assert_eq!(config.service_connection_name(Environment::Dev), "sc-custom");
    }

    #[test]
    fn test_repository_defaults_to_project() {
        let mut config = minimal();
        assert_eq!(config.azure_dev_ops.repository_name(), "starter");

        config.azure_dev_ops.repository = Some("starter-app".to_string());
        assert_eq!(config.azure_dev_ops.repository_name(), "starter-app");
    }

    #[test]
    fn test_environment_parsing() {
        assert_eq!("dev".parse::<Environment>().unwrap(), Environment::Dev);
        assert_eq!("prod".parse::<Environment>().unwrap(), Environment::Prod);
        assert!("staging".parse::<Environment>().is_err());
    }

    #[test]
    fn test_propagation_delay_default() {
        let config = minimal();
        assert_eq!(config.settings.propagation_delay_secs(), 20);
    }
}
