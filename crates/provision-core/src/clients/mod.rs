//! Typed clients over the platform CLIs.
//!
//! The control planes are opaque oracles: they are queried (show/list) and
//! mutated (create/delete) by name, and answer with a JSON payload or a
//! non-zero exit. Every call goes through the [`command_runner`] seam so
//! tests can script the oracle.

mod cloud;
mod devops;
mod identity;

pub use cloud::CloudClient;
pub use devops::{DevOpsClient, FederationParameters, ServiceEndpoint};
pub use identity::{AppRegistration, IdentityClient, TOKEN_EXCHANGE_AUDIENCE};

use crate::ensure::Existence;
use crate::{Error, Result};
use command_runner::CommandOutput;

/// Interpret a `show`-style lookup: success means found, a "not found"
/// complaint means absent, anything else is a real failure.
pub(crate) fn classify_lookup(output: &CommandOutput, action: &str) -> Result<Existence> {
    if output.success() {
        return Ok(Existence::Found);
    }

    let stderr = output.stderr.to_lowercase();
    let absent = ["notfound", "not found", "does not exist", "doesnotexist"]
        .iter()
        .any(|needle| stderr.contains(needle));

    if absent {
        Ok(Existence::NotFound)
    } else {
        Err(Error::cli_failed(action, output))
    }
}

/// Require a zero exit code, converting failures into [`Error::CliFailed`]
pub(crate) fn expect_success(output: CommandOutput, action: &str) -> Result<CommandOutput> {
    if output.success() {
        Ok(output)
    } else {
        Err(Error::cli_failed(action, &output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_lookup_found() {
        let output = CommandOutput::ok("{\"name\": \"rg-demo-dev\"}");
        assert_eq!(
            classify_lookup(&output, "show resource group").unwrap(),
            Existence::Found
        );
    }

    #[test]
    fn test_classify_lookup_not_found_variants() {
        for stderr in [
            "ERROR: (ResourceGroupNotFound) Resource group 'x' could not be found.",
            "ERROR: the resource does not exist",
            "ERROR: Pipeline was not found",
        ] {
            let output = CommandOutput::failed(1, stderr);
            assert_eq!(
                classify_lookup(&output, "lookup").unwrap(),
                Existence::NotFound,
                "stderr: {stderr}"
            );
        }
    }

    #[test]
    fn test_classify_lookup_real_failure() {
        let output = CommandOutput::failed(1, "ERROR: AADSTS700016 authentication failed");
        assert!(classify_lookup(&output, "lookup").is_err());
    }

    #[test]
    fn test_expect_success() {
        assert!(expect_success(CommandOutput::ok("{}"), "create").is_ok());

        let err = expect_success(CommandOutput::failed(2, "ERROR: boom"), "create").unwrap_err();
        assert!(err.to_string().contains("Failed to create"));
        assert!(err.to_string().contains("ERROR: boom"));
    }
}
