use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::domain::launch::entrypoint::{Entrypoint, LaunchMode, LaunchOutcome, LaunchRequest};
use crate::error::{Error, Result};

/// Entry point that records every call instead of starting processes.
#[derive(Debug, Clone, Default)]
pub struct RecordingEntrypoint {
    pub calls: Arc<Mutex<Vec<(LaunchRequest, LaunchMode)>>>,
    pub fail_detached: bool,
    pub blocking_exit_code: i32,
}

impl RecordingEntrypoint {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every detached launch fails to start.
    pub fn failing_detached() -> Self {
        RecordingEntrypoint { fail_detached: true, ..Self::default() }
    }

    /// Every blocking launch exits with `exit_code`.
    pub fn with_blocking_exit_code(exit_code: i32) -> Self {
        RecordingEntrypoint { blocking_exit_code: exit_code, ..Self::default() }
    }

    pub fn calls(&self) -> Vec<(LaunchRequest, LaunchMode)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Entrypoint for RecordingEntrypoint {
    async fn run(&self, request: LaunchRequest, mode: LaunchMode) -> Result<LaunchOutcome> {
        let entry_point = request.entry_point.clone();
        self.calls.lock().unwrap().push((request, mode));

        match mode {
            LaunchMode::Detached if self.fail_detached => {
                Err(Error::LaunchFailure { entry_point, exit_code: None, reason: "scripted detached failure".to_string() })
            }
            LaunchMode::Detached => Ok(LaunchOutcome::Detached),
            LaunchMode::Blocking if self.blocking_exit_code != 0 => Err(Error::LaunchFailure {
                entry_point,
                exit_code: Some(self.blocking_exit_code),
                reason: format!("process exited with code {}", self.blocking_exit_code),
            }),
            LaunchMode::Blocking => Ok(LaunchOutcome::Completed { exit_code: 0 }),
        }
    }
}
