//! External command execution.
//!
//! Commands are built as an explicit argument vector and never pass through
//! a shell. The child inherits the current environment plus any variables
//! added with [`Command::env`].

use std::ffi::{OsStr, OsString};
use std::process::{self, ExitStatus};
use thiserror::Error;
use tracing::debug;

/// Error types for command execution
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Failed to execute `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{program}` exited with {status}: {stderr}")]
    Failed { program: String, status: ExitStatus, stderr: String },
}

/// Command builder for external process execution
#[derive(Debug, Default, Clone)]
pub struct Command {
    program: OsString,
    args: Vec<OsString>,
    envs: Vec<(String, String)>,
}

impl Command {
    pub fn new<S: AsRef<OsStr>>(program: S) -> Self {
        Self { program: program.as_ref().to_owned(), ..Default::default() }
    }

    pub fn arg<S: AsRef<OsStr>>(mut self, arg: S) -> Self {
        self.args.push(arg.as_ref().to_owned());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(args.into_iter().map(|a| a.as_ref().to_owned()));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    pub fn envs<K, V, I>(mut self, vars: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        self.envs.extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn program_name(&self) -> String {
        self.program.to_string_lossy().to_string()
    }

    pub fn arg_list(&self) -> &[OsString] {
        &self.args
    }

    /// Run to completion and return stdout.
    ///
    /// A non-zero exit is a [`CommandError::Failed`] carrying the trimmed
    /// stderr, or stdout when the tool wrote nothing to stderr.
    pub fn run(self) -> Result<Vec<u8>, CommandError> {
        let name = self.program_name();
        debug!(program = %name, args = ?self.args, "running command");

        let mut cmd = process::Command::new(&self.program);
        cmd.args(&self.args).envs(self.envs.iter().cloned());

        let output =
            cmd.output().map_err(|source| CommandError::Spawn { program: name.clone(), source })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr = if stderr.trim().is_empty() {
                String::from_utf8_lossy(&output.stdout).trim().to_string()
            } else {
                stderr.trim().to_string()
            };
            return Err(CommandError::Failed { program: name, status: output.status, stderr });
        }

        Ok(output.stdout)
    }
}

/// `--name` for an option name written with underscores
pub fn option_name(name: &str) -> String {
    format!("--{}", name.replace('_', "-"))
}

/// Append `--name value` to an argument vector
pub fn push_option(args: &mut Vec<String>, name: &str, value: impl ToString) {
    args.push(option_name(name));
    args.push(value.to_string());
}

/// Append `--name value` once per value
pub fn push_option_array<I, V>(args: &mut Vec<String>, name: &str, values: I)
where
    I: IntoIterator<Item = V>,
    V: ToString,
{
    for value in values {
        push_option(args, name, value);
    }
}
