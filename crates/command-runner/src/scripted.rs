//! Scripted runner for tests.
//!
//! Responses are matched against the rendered invocation line by substring.
//! One-shot responses are consumed in FIFO order among rules whose needle
//! matches, so the same lookup can answer "not found" on the first call and
//! "found" on the second. Sticky responses answer every time. A command with
//! no matching rule is an error, which makes "the mutator must not be
//! reached" assertions fall out for free.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::command::Command;
use crate::error::{Error, Result};
use crate::output::CommandOutput;

struct Rule {
    needle: String,
    output: CommandOutput,
    sticky: bool,
}

/// A [`crate::CommandRunner`] that replays canned responses and records
/// every invocation it sees.
#[derive(Default)]
pub struct ScriptedRunner {
    rules: Mutex<VecDeque<Rule>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    /// Create an empty scripted runner
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a one-shot response for the first invocation containing `needle`
    pub fn respond(&self, needle: impl Into<String>, output: CommandOutput) {
        self.rules.lock().unwrap().push_back(Rule {
            needle: needle.into(),
            output,
            sticky: false,
        });
    }

    /// Register a sticky response for every invocation containing `needle`
    pub fn respond_always(&self, needle: impl Into<String>, output: CommandOutput) {
        self.rules.lock().unwrap().push_back(Rule {
            needle: needle.into(),
            output,
            sticky: true,
        });
    }

    /// Queue a one-shot successful response with the given stdout
    pub fn ok(&self, needle: impl Into<String>, stdout: impl Into<String>) {
        self.respond(needle, CommandOutput::ok(stdout));
    }

    /// Queue a one-shot failed response with the given exit code and stderr
    pub fn fail(&self, needle: impl Into<String>, code: i32, stderr: impl Into<String>) {
        self.respond(needle, CommandOutput::failed(code, stderr));
    }

    /// Every invocation line seen so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of invocations whose line contains `needle`
    pub fn call_count(&self, needle: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|line| line.contains(needle))
            .count()
    }
}

#[async_trait]
impl crate::CommandRunner for ScriptedRunner {
    async fn run(&self, command: Command) -> Result<CommandOutput> {
        let line = command.display();
        self.calls.lock().unwrap().push(line.clone());

        let mut rules = self.rules.lock().unwrap();
        let position = rules.iter().position(|rule| line.contains(&rule.needle));

        match position {
            Some(idx) => {
                if rules[idx].sticky {
                    Ok(rules[idx].output.clone())
                } else {
                    let rule = rules.remove(idx).unwrap();
                    Ok(rule.output)
                }
            }
            None => Err(Error::spawn_failed(format!(
                "no scripted response for: {line}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CommandRunner;

    #[smol_potat::test]
    async fn test_one_shot_responses_consumed_in_order() {
        let runner = ScriptedRunner::new();
        runner.ok("group exists", "false");
        runner.ok("group exists", "true");

        let cmd = Command::new("az").args(["group", "exists", "--name", "rg-demo-dev"]);
        let first = runner.run(cmd.clone()).await.unwrap();
        let second = runner.run(cmd.clone()).await.unwrap();

        assert_eq!(first.stdout, "false");
        assert_eq!(second.stdout, "true");
        assert!(runner.run(cmd).await.is_err());
    }

    #[smol_potat::test]
    async fn test_sticky_response() {
        let runner = ScriptedRunner::new();
        runner.respond_always("account show", CommandOutput::ok("{}"));

        let cmd = Command::new("az").args(["cognitiveservices", "account", "show"]);
        assert!(runner.run(cmd.clone()).await.unwrap().success());
        assert!(runner.run(cmd).await.unwrap().success());
    }

    #[smol_potat::test]
    async fn test_calls_are_recorded() {
        let runner = ScriptedRunner::new();
        runner.ok("echo", "hi");

        runner.run(Command::new("echo").arg("hi")).await.unwrap();
        assert_eq!(runner.calls(), vec!["echo hi".to_string()]);
        assert_eq!(runner.call_count("echo"), 1);
    }
}
