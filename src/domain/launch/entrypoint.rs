use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchMode {
    /// Wait for the process to exit and report its status.
    Blocking,
    /// Return as soon as the process is started. Nobody observes its exit;
    /// the process is killed when the launcher's runtime shuts down.
    Detached,
}

/// Everything the entry point needs to start one process. `env_vars` is
/// applied to the child only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRequest {
    pub location: String,
    pub entry_point: String,
    pub args: Vec<String>,
    pub env_vars: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchOutcome {
    Completed { exit_code: i32 },
    Detached,
}

#[async_trait]
pub trait Entrypoint: Send + Sync {
    async fn run(&self, request: LaunchRequest, mode: LaunchMode) -> Result<LaunchOutcome>;
}

/// Starts the user entry point as a local OS process.
#[derive(Debug, Clone)]
pub struct ProcessEntrypoint {
    pub python_interpreter: String,
    pub shell: String,
}

impl Default for ProcessEntrypoint {
    fn default() -> Self {
        ProcessEntrypoint { python_interpreter: "python3".to_string(), shell: "/bin/sh".to_string() }
    }
}

impl ProcessEntrypoint {
    pub fn new() -> Self {
        Self::default()
    }

    /// Program and leading arguments used to run the script at `path`.
    pub fn command_line(&self, path: &Path) -> (String, Vec<String>) {
        let script = path.to_string_lossy().to_string();
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("py") => (self.python_interpreter.clone(), vec![script]),
            Some("sh") => (self.shell.clone(), vec![script]),
            _ => (script, Vec::new()),
        }
    }

    /// Detached children are killed when their reaper task is dropped, so a
    /// parameter server does not outlive the launcher.
    fn build_command(&self, request: &LaunchRequest, mode: LaunchMode) -> Command {
        let location = PathBuf::from(&request.location);
        let (program, mut args) = self.command_line(&location.join(&request.entry_point));
        args.extend(request.args.iter().cloned());

        let mut command = Command::new(program);
        command.args(args).envs(&request.env_vars).stdin(Stdio::null()).kill_on_drop(mode == LaunchMode::Detached);
        if location.is_dir() {
            command.current_dir(&location);
        }
        command
    }
}

#[async_trait]
impl Entrypoint for ProcessEntrypoint {
    async fn run(&self, request: LaunchRequest, mode: LaunchMode) -> Result<LaunchOutcome> {
        let mut command = self.build_command(&request, mode);

        log::info!("Starting entry point '{}' in '{}' ({:?}) with args {:?}", request.entry_point, request.location, mode, request.args);

        let mut child = command.spawn().map_err(|e| Error::LaunchFailure {
            entry_point: request.entry_point.clone(),
            exit_code: None,
            reason: format!("failed to spawn process: {}", e),
        })?;

        match mode {
            LaunchMode::Detached => {
                let entry_point = request.entry_point.clone();
                tokio::spawn(async move {
                    match child.wait().await {
                        Ok(status) if status.success() => log::debug!("Detached process '{}' exited cleanly", entry_point),
                        Ok(status) => log::debug!("Detached process '{}' exited with {}", entry_point, status),
                        Err(e) => log::debug!("Error waiting for detached process '{}': {}", entry_point, e),
                    }
                });
                Ok(LaunchOutcome::Detached)
            }
            LaunchMode::Blocking => {
                let status = child.wait().await.map_err(|e| Error::LaunchFailure {
                    entry_point: request.entry_point.clone(),
                    exit_code: None,
                    reason: format!("failed to wait for process: {}", e),
                })?;

                match status.code() {
                    Some(0) => Ok(LaunchOutcome::Completed { exit_code: 0 }),
                    code => Err(Error::LaunchFailure {
                        entry_point: request.entry_point,
                        exit_code: code,
                        reason: format!("process exited with {}", status),
                    }),
                }
            }
        }
    }
}
