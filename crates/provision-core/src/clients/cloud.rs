//! Client for the cloud control plane CLI.

use super::{classify_lookup, expect_success};
use crate::ensure::Existence;
use crate::{Error, Result};
use command_runner::{Command, CommandRunner};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Queries and mutates subscription-level resources: resource groups,
/// AI Services accounts, AI projects and role assignments.
pub struct CloudClient {
    runner: Arc<dyn CommandRunner>,
    subscription_id: String,
}

impl CloudClient {
    /// Create a client bound to one subscription
    pub fn new(runner: Arc<dyn CommandRunner>, subscription_id: impl Into<String>) -> Self {
        Self {
            runner,
            subscription_id: subscription_id.into(),
        }
    }

    fn az(&self) -> Command {
        Command::new("az")
    }

    fn tag_args(tags: &BTreeMap<String, String>) -> Vec<String> {
        if tags.is_empty() {
            return Vec::new();
        }
        let mut args = vec!["--tags".to_string()];
        args.extend(tags.iter().map(|(k, v)| format!("{k}={v}")));
        args
    }

    /// Whether a resource group with this name exists.
    ///
    /// Uses the CLI's dedicated probe, which answers `true`/`false` instead
    /// of failing on absence.
    pub async fn resource_group_exists(&self, name: &str) -> Result<Existence> {
        let cmd = self
            .az()
            .args(["group", "exists", "--name", name, "--subscription"])
            .arg(&self.subscription_id);

        let output = expect_success(self.runner.run(cmd).await?, "check resource group")?;
        match output.stdout.trim() {
            "true" => Ok(Existence::Found),
            "false" => Ok(Existence::NotFound),
            _ => Err(Error::UnexpectedPayload {
                context: "group exists probe".to_string(),
            }),
        }
    }

    /// Create a resource group
    pub async fn resource_group_create(
        &self,
        name: &str,
        location: &str,
        tags: &BTreeMap<String, String>,
    ) -> Result<()> {
        let cmd = self
            .az()
            .args(["group", "create", "--name", name, "--location", location])
            .args(["--subscription", &self.subscription_id])
            .args(Self::tag_args(tags));

        expect_success(self.runner.run(cmd).await?, "create resource group")?;
        Ok(())
    }

    /// Request asynchronous deletion of a resource group.
    ///
    /// Fire and forget: the call returns once the deletion is accepted.
    pub async fn resource_group_delete_nowait(&self, name: &str) -> Result<()> {
        let cmd = self
            .az()
            .args(["group", "delete", "--name", name, "--yes", "--no-wait"])
            .args(["--subscription", &self.subscription_id]);

        expect_success(self.runner.run(cmd).await?, "delete resource group")?;
        Ok(())
    }

    /// Names of resource groups whose name starts with `prefix`
    pub async fn resource_groups_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let cmd = self
            .az()
            .args(["group", "list", "--subscription", &self.subscription_id])
            .args(["--output", "json"]);

        let output = expect_success(self.runner.run(cmd).await?, "list resource groups")?;
        let value = output.json()?;
        let groups = value.as_array().ok_or(Error::UnexpectedPayload {
            context: "group list".to_string(),
        })?;

        let names = groups
            .iter()
            .filter_map(|g| g["name"].as_str())
            .filter(|name| name.starts_with(prefix))
            .map(String::from)
            .collect();
        Ok(names)
    }

    /// Whether an AI Services account exists
    pub async fn ai_services_show(&self, resource_group: &str, name: &str) -> Result<Existence> {
        let cmd = self
            .az()
            .args(["cognitiveservices", "account", "show", "--name", name])
            .args(["--resource-group", resource_group])
            .args(["--subscription", &self.subscription_id])
            .args(["--output", "json"]);

        classify_lookup(&self.runner.run(cmd).await?, "show ai services account")
    }

    /// Create an AI Services account
    pub async fn ai_services_create(
        &self,
        resource_group: &str,
        name: &str,
        location: &str,
        tags: &BTreeMap<String, String>,
    ) -> Result<()> {
        let cmd = self
            .az()
            .args(["cognitiveservices", "account", "create", "--name", name])
            .args(["--resource-group", resource_group])
            .args(["--subscription", &self.subscription_id])
            .args(["--location", location])
            .args(["--kind", "AIServices", "--sku", "S0", "--yes"])
            .args(Self::tag_args(tags));

        expect_success(self.runner.run(cmd).await?, "create ai services account")?;
        Ok(())
    }

    /// Whether an AI project exists inside an account
    pub async fn ai_project_show(
        &self,
        resource_group: &str,
        account: &str,
        project: &str,
    ) -> Result<Existence> {
        let cmd = self.ai_project_show_command(resource_group, account, project);
        classify_lookup(&self.runner.run(cmd).await?, "show ai project")
    }

    /// Create an AI project inside an account
    pub async fn ai_project_create(
        &self,
        resource_group: &str,
        account: &str,
        project: &str,
        location: &str,
    ) -> Result<()> {
        let cmd = self
            .az()
            .args(["cognitiveservices", "account", "project", "create"])
            .args(["--project-name", project, "--account-name", account])
            .args(["--resource-group", resource_group])
            .args(["--subscription", &self.subscription_id])
            .args(["--location", location]);

        expect_success(self.runner.run(cmd).await?, "create ai project")?;
        Ok(())
    }

    /// Endpoint of an existing AI project, if the payload carries one
    pub async fn ai_project_endpoint(
        &self,
        resource_group: &str,
        account: &str,
        project: &str,
    ) -> Result<Option<String>> {
        let cmd = self.ai_project_show_command(resource_group, account, project);
        let output = expect_success(self.runner.run(cmd).await?, "show ai project")?;
        let value = output.json()?;

        let endpoint = value["properties"]["endpoint"].as_str().map(String::from);
        if endpoint.is_none() {
            debug!(project, "ai project payload has no endpoint");
        }
        Ok(endpoint)
    }

    fn ai_project_show_command(&self, resource_group: &str, account: &str, project: &str) -> Command {
        self.az()
            .args(["cognitiveservices", "account", "project", "show"])
            .args(["--project-name", project, "--account-name", account])
            .args(["--resource-group", resource_group])
            .args(["--subscription", &self.subscription_id])
            .args(["--output", "json"])
    }

    /// Whether a role assignment exists for an assignee on a scope
    pub async fn role_assignment_exists(
        &self,
        assignee: &str,
        role: &str,
        scope: &str,
    ) -> Result<Existence> {
        let cmd = self
            .az()
            .args(["role", "assignment", "list", "--assignee", assignee])
            .args(["--role", role, "--scope", scope])
            .args(["--output", "json"]);

        let output = expect_success(self.runner.run(cmd).await?, "list role assignments")?;
        let value = output.json()?;
        match value.as_array() {
            Some(assignments) if !assignments.is_empty() => Ok(Existence::Found),
            Some(_) => Ok(Existence::NotFound),
            None => Err(Error::UnexpectedPayload {
                context: "role assignment list".to_string(),
            }),
        }
    }

    /// Create a role assignment
    pub async fn role_assignment_create(
        &self,
        assignee: &str,
        role: &str,
        scope: &str,
    ) -> Result<()> {
        let cmd = self
            .az()
            .args(["role", "assignment", "create", "--assignee", assignee])
            .args(["--role", role, "--scope", scope]);

        expect_success(self.runner.run(cmd).await?, "create role assignment")?;
        Ok(())
    }

    /// RBAC scope of a resource group
    pub fn resource_group_scope(&self, resource_group: &str) -> String {
        format!(
            "/subscriptions/{}/resourceGroups/{}",
            self.subscription_id, resource_group
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use command_runner::ScriptedRunner;

    fn client(runner: Arc<ScriptedRunner>) -> CloudClient {
        CloudClient::new(runner, "00000000-0000-0000-0000-000000000000")
    }

    #[smol_potat::test]
    async fn test_resource_group_exists_probe() {
        let runner = Arc::new(ScriptedRunner::new());
        runner.ok("group exists", "false\n");
        runner.ok("group exists", "true\n");

        let cloud = client(runner.clone());
        assert_eq!(
            cloud.resource_group_exists("rg-demo-dev").await.unwrap(),
            Existence::NotFound
        );
        assert_eq!(
            cloud.resource_group_exists("rg-demo-dev").await.unwrap(),
            Existence::Found
        );
    }

    #[smol_potat::test]
    async fn test_group_list_filters_by_prefix() {
        let runner = Arc::new(ScriptedRunner::new());
        runner.ok(
            "group list",
            r#"[{"name": "rg-demo-dev"}, {"name": "rg-demo-test"}, {"name": "other-rg"}]"#,
        );

        let cloud = client(runner);
        let names = cloud.resource_groups_with_prefix("rg-demo-").await.unwrap();
        assert_eq!(names, vec!["rg-demo-dev", "rg-demo-test"]);
    }

    #[smol_potat::test]
    async fn test_tags_are_passed_to_create() {
        let runner = Arc::new(ScriptedRunner::new());
        runner.ok("group create", "{}");

        let cloud = client(runner.clone());
        let mut tags = BTreeMap::new();
        tags.insert("owner".to_string(), "platform-team".to_string());
        cloud
            .resource_group_create("rg-demo-dev", "westeurope", &tags)
            .await
            .unwrap();

        let calls = runner.calls();
        assert!(calls[0].contains("--tags owner=platform-team"));
    }

    #[smol_potat::test]
    async fn test_role_assignment_empty_list_is_not_found() {
        let runner = Arc::new(ScriptedRunner::new());
        runner.ok("role assignment list", "[]");

        let cloud = client(runner);
        let existence = cloud
            .role_assignment_exists("app-id", "Contributor", "/subscriptions/s/resourceGroups/rg")
            .await
            .unwrap();
        assert_eq!(existence, Existence::NotFound);
    }
}
