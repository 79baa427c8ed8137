//! Configuration load, validation and write-back.
//!
//! Loading parses the JSON document, resolves `${VAR}` placeholders and
//! validates the result. Writing is read-modify-write: the previous file is
//! kept as a `.backup` sibling and the modification timestamp is refreshed.

use crate::{ConfigError, DeploymentConfig, Result, resolver};
use chrono::Utc;
use regex::Regex;
use std::path::Path;

/// Load a configuration file.
///
/// A missing file is a distinct [`ConfigError::NotFound`], so callers can
/// tell "no configuration yet" apart from a broken one.
pub fn load(path: impl AsRef<Path>) -> Result<DeploymentConfig> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path)?;
    load_str(&content)
}

/// Parse configuration from a JSON string
pub fn load_str(content: &str) -> Result<DeploymentConfig> {
    let mut config: DeploymentConfig = serde_json::from_str(content)?;
    resolver::resolve_placeholders(&mut config)?;
    validate_config(&config)?;
    Ok(config)
}

/// Write the configuration back to disk.
///
/// The existing file, if any, is first copied to a `.backup` sibling, and
/// `metadata.lastModified` is set to now. The whole document is rewritten;
/// there is no partial update.
pub fn save(config: &mut DeploymentConfig, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();

    if path.exists() {
        let backup = backup_path(path);
        std::fs::copy(path, &backup)?;
    }

    config.metadata.last_modified = Some(Utc::now());

    let mut rendered = serde_json::to_string_pretty(config)?;
    rendered.push('\n');
    std::fs::write(path, rendered)?;
    Ok(())
}

/// The `.backup` sibling path for a configuration file
pub fn backup_path(path: &Path) -> std::path::PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.push_str(".backup");
    path.with_file_name(name)
}

/// Validate configuration
fn validate_config(config: &DeploymentConfig) -> Result<()> {
    if config.metadata.schema_version != "1.0" {
        return Err(ConfigError::ValidationError(format!(
            "Unsupported schema version: {}, expected 1.0",
            config.metadata.schema_version
        )));
    }

    for (field, value) in [
        ("azure.subscriptionId", &config.azure.subscription_id),
        ("azure.tenantId", &config.azure.tenant_id),
        ("azure.location", &config.azure.location),
        ("azureDevOps.project", &config.azure_dev_ops.project),
    ] {
        if value.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "Field '{field}' must not be empty"
            )));
        }
    }

    if !config
        .azure_dev_ops
        .organization_url
        .starts_with("https://")
    {
        return Err(ConfigError::ValidationError(format!(
            "azureDevOps.organizationUrl must be an https URL, got '{}'",
            config.azure_dev_ops.organization_url
        )));
    }

    // Resource names are derived from the base with '-<env>' suffixes, so
    // the base itself must already be a valid resource name.
    let name_re = Regex::new(r"^[a-z][a-z0-9-]{1,40}$").unwrap();
    if !name_re.is_match(&config.azure.resource_group_base) {
        return Err(ConfigError::ValidationError(format!(
            "azure.resourceGroupBase '{}' must be lowercase alphanumeric with dashes",
            config.azure.resource_group_base
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{
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
            "environments": {
                "dev": { "aiProjectEndpoint": "https://dev.example/api" }
            }
        }
    }"#;

    #[test]
    fn test_load_str_minimal() {
        let config = load_str(VALID).unwrap();
        assert_eq!(config.metadata.schema_version, "1.0");
        assert_eq!(config.azure.resource_group_base, "rg-demo");
        assert_eq!(
            config.azure.environments.dev.ai_project_endpoint.as_deref(),
            Some("https://dev.example/api")
        );
        assert!(config.service_principal.is_none());
    }

    #[test]
    fn test_load_missing_file_is_not_found() {
        let result = load("/definitely/not/here/starter-config.json");
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_unsupported_schema_version() {
        let content = VALID.replace("\"1.0\"", "\"2.0\"");
        let result = load_str(&content);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_bad_resource_group_base() {
        let content = VALID.replace("rg-demo", "RG_Demo!");
        let result = load_str(&content);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_plain_http_org_url_rejected() {
        let content = VALID.replace("https://dev.azure.com", "http://dev.azure.com");
        let result = load_str(&content);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_save_creates_backup_and_stamps() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("starter-config.json");
        std::fs::write(&path, VALID).unwrap();

        let mut config = load(&path).unwrap();
        assert!(config.metadata.last_modified.is_none());

        save(&mut config, &path).unwrap();
        assert!(config.metadata.last_modified.is_some());
        assert!(backup_path(&path).exists());

        let backup = std::fs::read_to_string(backup_path(&path)).unwrap();
        assert_eq!(backup, VALID);

        let reloaded = load(&path).unwrap();
        assert_eq!(reloaded, config);
    }
}
