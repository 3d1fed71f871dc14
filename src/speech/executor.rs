//! Testable command execution for speech tools.
//!
//! Every command-line engine (espeak, spd-say, the remote tier's audio
//! player) goes through `CommandExecutor`, so the whole speech path can
//! be exercised without synthesis tools installed.

use crate::error::{RacecallError, Result};
use std::process::Command;

/// Trait for executing system commands.
///
/// Object-safe, Send + Sync for use in concurrent contexts.
/// Enables testability by allowing mock implementations.
pub trait CommandExecutor: Send + Sync {
    /// Execute a command with arguments.
    ///
    /// Returns the stdout of the command on success.
    /// Returns an error if the command fails or is not found.
    fn execute(&self, command: &str, args: &[&str]) -> Result<String>;
}

/// Production command executor using std::process::Command.
#[derive(Debug, Clone, Default)]
pub struct SystemCommandExecutor;

impl SystemCommandExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl CommandExecutor for SystemCommandExecutor {
    fn execute(&self, command: &str, args: &[&str]) -> Result<String> {
        let output = Command::new(command).args(args).output().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                RacecallError::SpeechToolNotFound {
                    tool: command.to_string(),
                }
            } else {
                RacecallError::SpeechSynthesis {
                    engine: command.to_string(),
                    message: e.to_string(),
                }
            }
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RacecallError::SpeechSynthesis {
                engine: command.to_string(),
                message: format!("exited with {:?}: {}", output.status.code(), stderr.trim()),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Mock command executor for testing.
    ///
    /// Records all command executions and returns configured responses;
    /// once responses run out it keeps succeeding with empty output.
    #[derive(Debug, Default)]
    pub struct MockCommandExecutor {
        calls: Mutex<Vec<(String, Vec<String>)>>,
        responses: Mutex<VecDeque<Result<String>>>,
    }

    impl MockCommandExecutor {
        pub fn new() -> Self {
            Self::default()
        }

        /// Add a successful response to the queue.
        pub fn with_response(self, response: &str) -> Self {
            self.responses
                .lock()
                .unwrap()
                .push_back(Ok(response.to_string()));
            self
        }

        /// Add an error response to the queue.
        pub fn with_error(self, error: RacecallError) -> Self {
            self.responses.lock().unwrap().push_back(Err(error));
            self
        }

        /// Get all recorded calls.
        pub fn calls(&self) -> Vec<(String, Vec<String>)> {
            self.calls.lock().unwrap().clone()
        }

        /// Get the number of recorded calls.
        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    impl CommandExecutor for MockCommandExecutor {
        fn execute(&self, command: &str, args: &[&str]) -> Result<String> {
            self.calls.lock().unwrap().push((
                command.to_string(),
                args.iter().map(|s| s.to_string()).collect(),
            ));

            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(String::new()))
        }
    }
}
