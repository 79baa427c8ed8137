//! Environment variable placeholder resolution.
//!
//! String fields in the configuration may reference environment variables
//! as `${VAR}` or `${VAR:-default}`. Resolution happens once, at load time;
//! a reference without a default to an unset variable is a load error.

use crate::{ConfigError, DeploymentConfig, Result};
use regex::Regex;

fn placeholder_re() -> Regex {
    Regex::new(r"\$\{([^}]+)\}").unwrap()
}

/// Split a placeholder expression into the variable name and its default
fn split_expr(expr: &str) -> (&str, Option<&str>) {
    match expr.find(":-") {
        Some(pos) => (&expr[..pos], Some(&expr[pos + 2..])),
        None => (expr, None),
    }
}

/// Resolve all placeholders in a string
pub fn resolve_string(input: &str) -> Result<String> {
    let re = placeholder_re();
    let mut result = input.to_string();
    let mut errors = Vec::new();

    for cap in re.captures_iter(input) {
        let full_match = &cap[0];
        let (var_name, default_value) = split_expr(&cap[1]);

        match std::env::var(var_name) {
            Ok(value) => {
                result = result.replace(full_match, &value);
            }
            Err(_) => {
                if let Some(default) = default_value {
                    result = result.replace(full_match, default);
                } else {
                    errors.push(var_name.to_string());
                }
            }
        }
    }

    if !errors.is_empty() {
        return Err(ConfigError::EnvVarNotFound(errors.join(", ")));
    }

    Ok(result)
}

fn resolve_in_place(value: &mut String) -> Result<()> {
    if value.contains("${") {
        *value = resolve_string(value)?;
    }
    Ok(())
}

fn resolve_opt(value: &mut Option<String>) -> Result<()> {
    if let Some(inner) = value {
        resolve_in_place(inner)?;
    }
    Ok(())
}

/// Resolve placeholders across every string field of the configuration
pub fn resolve_placeholders(config: &mut DeploymentConfig) -> Result<()> {
    resolve_in_place(&mut config.azure_dev_ops.organization_url)?;
    resolve_in_place(&mut config.azure_dev_ops.project)?;
    resolve_opt(&mut config.azure_dev_ops.repository)?;

    resolve_in_place(&mut config.azure.subscription_id)?;
    resolve_in_place(&mut config.azure.tenant_id)?;
    resolve_in_place(&mut config.azure.location)?;

    for env in crate::Environment::ALL {
        let record = config.azure.environments.get_mut(env);
        resolve_opt(&mut record.ai_project_endpoint)?;
        resolve_opt(&mut record.ai_services_name)?;
        resolve_opt(&mut record.service_connection)?;
    }

    for value in config.settings.tags.values_mut() {
        resolve_in_place(value)?;
    }

    Ok(())
}

/// A variable reference found in a raw configuration document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// Variable name
    pub name: String,
    /// Whether the reference carries a `:-` default
    pub has_default: bool,
}

/// Scan a raw configuration document for variable references.
///
/// Used by `validate` to warn about referenced-but-unset variables without
/// failing the load.
pub fn find_references(content: &str) -> Vec<Reference> {
    let re = placeholder_re();
    let mut refs = Vec::new();

    for cap in re.captures_iter(content) {
        let (name, default) = split_expr(&cap[1]);
        let reference = Reference {
            name: name.to_string(),
            has_default: default.is_some(),
        };
        if !refs.contains(&reference) {
            refs.push(reference);
        }
    }

    refs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_with_default() {
        let result = resolve_string("${MISSING_VAR_UNLIKELY_TO_EXIST:-fallback}").unwrap();
        assert_eq!(result, "fallback");
    }

    #[test]
    fn test_resolve_missing_without_default() {
        let result = resolve_string("${MISSING_VAR_UNLIKELY_TO_EXIST}");
        assert!(matches!(result, Err(ConfigError::EnvVarNotFound(_))));
    }

    #[test]
    fn test_resolve_existing_variable() {
        // PATH is set in any realistic test environment
        if let Ok(path) = std::env::var("PATH") {
            let result = resolve_string("prefix-${PATH}").unwrap();
            assert_eq!(result, format!("prefix-{path}"));
        }
    }

    #[test]
    fn test_find_references() {
        let content = r#"{
            "organizationUrl": "https://dev.azure.com/${DEVOPS_ORG}",
            "location": "${LOCATION:-westeurope}"
        }"#;

        let refs = find_references(content);
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].name, "DEVOPS_ORG");
        assert!(!refs[0].has_default);
        assert_eq!(refs[1].name, "LOCATION");
        assert!(refs[1].has_default);
    }

    #[test]
    fn test_resolve_placeholders_in_config() {
        let content = r#"{
            "metadata": { "schemaVersion": "1.0" },
            "azureDevOps": {
                "organizationUrl": "https://dev.azure.com/contoso",
                "project": "starter"
            },
            "azure": {
                "subscriptionId": "00000000-0000-0000-0000-000000000000",
                "tenantId": "11111111-1111-1111-1111-111111111111",
                "location": "${PROVISION_TEST_LOCATION:-westeurope}",
                "resourceGroupBase": "rg-demo",
                "environments": {}
            }
        }"#;

        let config = crate::loader::load_str(content).unwrap();
        assert_eq!(config.azure.location, "westeurope");
    }
}
