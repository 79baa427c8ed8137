//! # Provision Core
//!
//! Idempotent resource provisioning against external control planes.
//!
//! The engine is a sequential wrapper around platform CLI calls: for each
//! declared resource, check existence, create if absent, record the
//! outcome. Each resource is provisioned independently; a partial failure
//! leaves whatever was already created in place, and re-running the same
//! command is the recovery mechanism.
//!
//! ## Example
//!
//! ```rust
//! use provision_core::{Existence, ResourceKind, ensure_resource};
//!
//! # async fn example() {
//! let outcome = ensure_resource(
//!     ResourceKind::ResourceGroup,
//!     "rg-demo-dev",
//!     false,
//!     async { Ok(Existence::NotFound) },
//!     async { Ok(()) },
//! )
//! .await;
//!
//! assert!(outcome.status.is_created());
//! # }
//! ```

#![warn(missing_docs)]

mod cleanup;
mod clients;
mod credentials;
mod ensure;
mod outcome;
mod provision;

pub use cleanup::{CleanupPlan, CleanupSummary, discover_cleanup, execute_cleanup};
pub use clients::{
    AppRegistration, CloudClient, DevOpsClient, FederationParameters, IdentityClient,
    ServiceEndpoint, TOKEN_EXCHANGE_AUDIENCE,
};
pub use credentials::fix_federated_credentials;
pub use ensure::{Existence, ensure_resource};
pub use outcome::{OutcomeStatus, ResourceKind, ResourceOutcome, RunReport};
pub use provision::{setup_all, setup_azure, setup_devops, setup_identity};

/// Error types for provisioning operations
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Command runner errors
    #[error("Command execution error: {0}")]
    Runner(#[from] command_runner::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] provision_config::ConfigError),

    /// An external CLI call returned a non-zero exit code
    #[error("Failed to {action}: {detail}")]
    CliFailed {
        /// What the call was trying to do
        action: String,
        /// First line of the captured stderr
        detail: String,
    },

    /// An external CLI call returned a payload with an unexpected shape
    #[error("Unexpected payload from {context}")]
    UnexpectedPayload {
        /// Which call produced the payload
        context: String,
    },

    /// A required input is missing; always fatal
    #[error("Missing precondition: {0}")]
    MissingPrecondition(String),

    /// A referenced external resource does not exist
    #[error("Resource not found: {0}")]
    MissingResource(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build a [`Error::CliFailed`] from a captured command output
    pub(crate) fn cli_failed(
        action: impl Into<String>,
        output: &command_runner::CommandOutput,
    ) -> Self {
        let mut detail = output.error_line().to_string();
        if detail.is_empty() {
            detail = format!("exit code {:?}", output.status.code);
        }
        Self::CliFailed {
            action: action.into(),
            detail,
        }
    }
}

/// Result type for provisioning operations
pub type Result<T> = std::result::Result<T, Error>;
