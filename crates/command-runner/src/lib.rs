//! # Command Runner
//!
//! Async invocation of external platform CLIs with captured output.
//!
//! Every interaction with a cloud control plane in this workspace goes
//! through one seam: build a [`Command`], hand it to a [`CommandRunner`],
//! get back a [`CommandOutput`] with the exit code and captured streams.
//! Commands run to completion; there is no streaming, no timeout wrapper
//! and no retry at this layer.

#![warn(missing_docs)]

mod command;
mod error;
mod output;
mod runner;

#[cfg(any(test, feature = "test-utils"))]
pub mod scripted;

pub use command::Command;
pub use error::{Error, Result};
pub use output::{CommandOutput, ExitStatus};
pub use runner::{CommandRunner, ProcessRunner};

#[cfg(any(test, feature = "test-utils"))]
pub use scripted::ScriptedRunner;
