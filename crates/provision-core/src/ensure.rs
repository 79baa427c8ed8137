//! The check-then-create idempotency primitive.

use crate::outcome::{ResourceKind, ResourceOutcome};
use crate::Result;
use std::future::Future;

/// Explicit result of an existence lookup.
///
/// "Not found" is a normal answer, never an error; errors are reserved for
/// the lookup itself going wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Existence {
    /// A resource with the requested name exists
    Found,
    /// No resource with the requested name exists
    NotFound,
}

/// Ensure a resource exists, creating it when absent.
///
/// Existence is decided by name lookup only: a resource that exists with
/// different settings than desired is left unchanged and reported
/// `Skipped`. A failure in either step becomes a `Failed` outcome with the
/// raw error text; the caller is expected to keep going. With `dry_run`
/// set the mutation is suppressed and the step reports `Skipped`.
///
/// There is no rollback anywhere: on partial failure, already-created
/// resources stay, and re-running converges because of the lookup.
pub async fn ensure_resource<L, C>(
    kind: ResourceKind,
    name: &str,
    dry_run: bool,
    lookup: L,
    create: C,
) -> ResourceOutcome
where
    L: Future<Output = Result<Existence>>,
    C: Future<Output = Result<()>>,
{
    match lookup.await {
        Ok(Existence::Found) => ResourceOutcome::skipped(kind, name, "already exists"),
        Ok(Existence::NotFound) if dry_run => {
            ResourceOutcome::skipped(kind, name, "dry run - would create")
        }
        Ok(Existence::NotFound) => match create.await {
            Ok(()) => ResourceOutcome::created(kind, name),
            Err(e) => ResourceOutcome::failed(kind, name, e.to_string()),
        },
        Err(e) => ResourceOutcome::failed(kind, name, format!("lookup failed: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::OutcomeStatus;
    use std::cell::Cell;

    #[smol_potat::test]
    async fn test_absent_resource_is_created() {
        let created = Cell::new(false);
        let outcome = ensure_resource(
            ResourceKind::ResourceGroup,
            "rg-demo-dev",
            false,
            async { Ok(Existence::NotFound) },
            async {
                created.set(true);
                Ok(())
            },
        )
        .await;

        assert_eq!(outcome.status, OutcomeStatus::Created);
        assert!(created.get());
    }

    #[smol_potat::test]
    async fn test_existing_resource_is_skipped() {
        let outcome = ensure_resource(
            ResourceKind::ResourceGroup,
            "rg-demo-dev",
            false,
            async { Ok(Existence::Found) },
            async {
                panic!("create must not run for an existing resource");
            },
        )
        .await;

        assert_eq!(outcome.status, OutcomeStatus::Skipped);
        assert_eq!(outcome.message.as_deref(), Some("already exists"));
    }

    #[smol_potat::test]
    async fn test_dry_run_suppresses_creation() {
        let outcome = ensure_resource(
            ResourceKind::AiServices,
            "rg-demo-ai-dev",
            true,
            async { Ok(Existence::NotFound) },
            async {
                panic!("create must not run in dry-run mode");
            },
        )
        .await;

        assert_eq!(outcome.status, OutcomeStatus::Skipped);
        assert_eq!(outcome.message.as_deref(), Some("dry run - would create"));
    }

    #[smol_potat::test]
    async fn test_create_failure_carries_error_text() {
        let outcome = ensure_resource(
            ResourceKind::AiProject,
            "rg-demo-project-dev",
            false,
            async { Ok(Existence::NotFound) },
            async {
                Err(crate::Error::CliFailed {
                    action: "create ai project".to_string(),
                    detail: "quota exceeded".to_string(),
                })
            },
        )
        .await;

        assert_eq!(outcome.status, OutcomeStatus::Failed);
        assert!(outcome.message.unwrap().contains("quota exceeded"));
    }

    #[smol_potat::test]
    async fn test_lookup_failure_is_a_failed_outcome() {
        let outcome = ensure_resource(
            ResourceKind::ResourceGroup,
            "rg-demo-dev",
            false,
            async {
                Err(crate::Error::CliFailed {
                    action: "check resource group".to_string(),
                    detail: "network unreachable".to_string(),
                })
            },
            async { Ok(()) },
        )
        .await;

        assert_eq!(outcome.status, OutcomeStatus::Failed);
        assert!(outcome.message.unwrap().starts_with("lookup failed:"));
    }
}
