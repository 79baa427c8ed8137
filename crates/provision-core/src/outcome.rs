//! Per-resource outcomes and run-level aggregation.
//!
//! Outcomes are ephemeral: they exist for the duration of one run,
//! are rendered into the summary, and are never persisted.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

/// What happened to a single resource during a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    /// The resource was created by this run
    Created,
    /// The resource already existed (by name) and was left unchanged
    Skipped,
    /// Lookup or creation failed; the run continued
    Failed,
}

impl OutcomeStatus {
    /// Whether this outcome is `Created`
    pub fn is_created(&self) -> bool {
        matches!(self, OutcomeStatus::Created)
    }

    /// Whether this outcome is `Failed`
    pub fn is_failed(&self) -> bool {
        matches!(self, OutcomeStatus::Failed)
    }
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OutcomeStatus::Created => "created",
            OutcomeStatus::Skipped => "skipped",
            OutcomeStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// The kinds of resources the harness manages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    /// Cloud resource group
    ResourceGroup,
    /// AI Services account
    AiServices,
    /// AI project inside an AI Services account
    AiProject,
    /// App registration plus service principal
    ServicePrincipal,
    /// RBAC role assignment
    RoleAssignment,
    /// Federated credential on the app registration
    FederatedCredential,
    /// DevOps git repository
    Repository,
    /// DevOps service connection
    ServiceConnection,
    /// DevOps variable group
    VariableGroup,
    /// DevOps deployment environment
    DevOpsEnvironment,
    /// DevOps pipeline definition
    Pipeline,
}

impl ResourceKind {
    /// Kebab-case name of the kind
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::ResourceGroup => "resource-group",
            ResourceKind::AiServices => "ai-services",
            ResourceKind::AiProject => "ai-project",
            ResourceKind::ServicePrincipal => "service-principal",
            ResourceKind::RoleAssignment => "role-assignment",
            ResourceKind::FederatedCredential => "federated-credential",
            ResourceKind::Repository => "repository",
            ResourceKind::ServiceConnection => "service-connection",
            ResourceKind::VariableGroup => "variable-group",
            ResourceKind::DevOpsEnvironment => "devops-environment",
            ResourceKind::Pipeline => "pipeline",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The recorded result of one provisioning step
#[derive(Debug, Clone, Serialize)]
pub struct ResourceOutcome {
    /// What kind of resource
    pub kind: ResourceKind,
    /// Resource name
    pub name: String,
    /// What happened
    pub status: OutcomeStatus,
    /// Detail, e.g. the raw error text for failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ResourceOutcome {
    /// A `Created` outcome
    pub fn created(kind: ResourceKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            status: OutcomeStatus::Created,
            message: None,
        }
    }

    /// A `Skipped` outcome with a reason
    pub fn skipped(kind: ResourceKind, name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            status: OutcomeStatus::Skipped,
            message: Some(message.into()),
        }
    }

    /// A `Failed` outcome carrying the raw error text
    pub fn failed(kind: ResourceKind, name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            status: OutcomeStatus::Failed,
            message: Some(message.into()),
        }
    }

    /// Attach or replace the detail message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Accumulated outcomes of a single run
#[derive(Debug, Serialize)]
pub struct RunReport {
    /// Unique id of this run
    pub run_id: Uuid,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// When the run finished, if it has
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    /// Per-resource outcomes, in execution order
    pub outcomes: Vec<ResourceOutcome>,
}

impl RunReport {
    /// Start an empty report
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            outcomes: Vec::new(),
        }
    }

    /// Record one outcome
    pub fn record(&mut self, outcome: ResourceOutcome) {
        match outcome.status {
            OutcomeStatus::Failed => tracing::warn!(
                kind = %outcome.kind,
                name = %outcome.name,
                message = outcome.message.as_deref().unwrap_or(""),
                "step failed"
            ),
            _ => tracing::info!(
                kind = %outcome.kind,
                name = %outcome.name,
                status = %outcome.status,
                "step done"
            ),
        }
        self.outcomes.push(outcome);
    }

    /// Mark the run finished
    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Number of `Created` outcomes
    pub fn created(&self) -> usize {
        self.count(OutcomeStatus::Created)
    }

    /// Number of `Skipped` outcomes
    pub fn skipped(&self) -> usize {
        self.count(OutcomeStatus::Skipped)
    }

    /// Number of `Failed` outcomes
    pub fn failed(&self) -> usize {
        self.count(OutcomeStatus::Failed)
    }

    fn count(&self, status: OutcomeStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }

    /// Whether any outcome failed
    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }

    /// Process exit code for this run.
    ///
    /// `0` when nothing failed, including the all-skipped "nothing to do"
    /// run; `1` when at least one step failed.
    pub fn exit_code(&self) -> u8 {
        if self.has_failures() { 1 } else { 0 }
    }

    /// One-line counter summary
    pub fn summary_line(&self) -> String {
        format!(
            "Created={} Skipped={} Failed={}",
            self.created(),
            self.skipped(),
            self.failed()
        )
    }
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}
