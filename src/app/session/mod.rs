//! Device session manager.
//!
//! Wraps the control tool, tracks whether a device is attached, and turns every
//! outcome (including spawn failures and rejected input) into a [`CommandResult`].

use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::app::adb::locator::{resolve_adb_program, validate_adb_program};
use crate::app::adb::parse::{find_attached_peer, parse_adb_devices};
use crate::app::adb::runner::{CommandRunner, Invocation, SystemRunner};
use crate::app::config::AppConfig;
use crate::app::error::AppError;
use crate::app::models::{CommandResult, DeviceSummary, KeyCode, SessionState, ToolInfo};

pub const EMPTY_ADDRESS_MESSAGE: &str = "address is required";

pub struct SessionManager<R = SystemRunner> {
    program: String,
    runner: R,
    state: Mutex<SessionState>,
}

impl SessionManager<SystemRunner> {
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            resolve_adb_program(&config.adb.command_path),
            SystemRunner::new(config.command.timeout()),
        )
    }
}

impl<R: CommandRunner> SessionManager<R> {
    pub fn new(program: impl Into<String>, runner: R) -> Self {
        Self {
            program: program.into(),
            runner,
            state: Mutex::new(SessionState::Disconnected),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn state(&self) -> SessionState {
        self.lock_state().clone()
    }

    pub fn peer_address(&self) -> Option<String> {
        self.lock_state().peer_address().map(str::to_string)
    }

    pub fn is_connected(&self) -> bool {
        self.lock_state().is_connected()
    }

    /// Runs `<tool> devices` and updates the session from its output.
    pub fn refresh_status(&self) -> CommandResult {
        let trace_id = new_trace_id();
        // Held across the spawn so concurrent refreshes cannot interleave writes.
        let mut state = self.lock_state();
        let result = self.execute(self.tool(["devices"]), &trace_id);

        *state = match find_attached_peer(&result.stdout) {
            Some(peer_address) => SessionState::Connected { peer_address },
            None => SessionState::Disconnected,
        };
        info!(
            trace_id = %trace_id,
            connected = state.is_connected(),
            peer = state.peer_address().unwrap_or(""),
            "refresh_status"
        );
        result
    }

    pub fn connect(&self, address: &str) -> CommandResult {
        let trace_id = new_trace_id();
        if address.is_empty() {
            let err = AppError::validation(EMPTY_ADDRESS_MESSAGE, &trace_id);
            warn!(trace_id = %trace_id, code = %err.code, "connect rejected");
            return CommandResult::rejected(err.error);
        }
        let result = self.execute(self.tool(["connect", address]), &trace_id);
        self.refresh_status();
        result
    }

    pub fn send_key_event(&self, code: &str) -> CommandResult {
        let trace_id = new_trace_id();
        self.execute(self.tool(["shell", "input", "keyevent", code]), &trace_id)
    }

    pub fn send_key(&self, key: KeyCode) -> CommandResult {
        self.send_key_event(&key.code().to_string())
    }

    pub fn push_file(&self, local_path: &str, remote_path: &str) -> CommandResult {
        let trace_id = new_trace_id();
        self.execute(self.tool(["push", local_path, remote_path]), &trace_id)
    }

    pub fn pull_file(&self, remote_path: &str, local_path: &str) -> CommandResult {
        let trace_id = new_trace_id();
        self.execute(self.tool(["pull", remote_path, local_path]), &trace_id)
    }

    /// Hands `raw` to the platform shell as-is. No allow-list.
    pub fn run_custom_command(&self, raw: &str) -> CommandResult {
        let trace_id = new_trace_id();
        self.execute(Invocation::shell(raw), &trace_id)
    }

    /// Lists every device row without touching the session state.
    pub fn list_devices(&self) -> (CommandResult, Vec<DeviceSummary>) {
        let trace_id = new_trace_id();
        let result = self.execute(self.tool(["devices"]), &trace_id);
        let devices = parse_adb_devices(&result.stdout);
        debug!(trace_id = %trace_id, count = devices.len(), "list_devices");
        (result, devices)
    }

    pub fn check_tool(&self) -> ToolInfo {
        let trace_id = new_trace_id();
        if let Err(message) = validate_adb_program(&self.program) {
            warn!(trace_id = %trace_id, error = %message, "adb validation failed");
            return ToolInfo {
                available: false,
                version_output: String::new(),
                command_path: self.program.clone(),
                error: Some(message),
            };
        }

        let result = self.execute(self.tool(["version"]), &trace_id);
        let error = if result.succeeded {
            None
        } else if result.stderr.trim().is_empty() {
            Some("ADB command returned a non-zero exit code".to_string())
        } else {
            Some(result.stderr.trim().to_string())
        };
        ToolInfo {
            available: result.succeeded,
            version_output: result.combined_output(),
            command_path: self.program.clone(),
            error,
        }
    }

    fn tool<'a>(&self, args: impl IntoIterator<Item = &'a str>) -> Invocation {
        Invocation::program(&self.program, args)
    }

    fn execute(&self, invocation: Invocation, trace_id: &str) -> CommandResult {
        let command = invocation.to_string();
        info!(trace_id = %trace_id, command = %command, "run");
        match self.runner.run(&invocation, trace_id) {
            Ok(output) => {
                info!(trace_id = %trace_id, exit_code = ?output.exit_code, "finished");
                CommandResult::from_exit(command, output.stdout, output.stderr, output.exit_code)
            }
            Err(err) => {
                warn!(trace_id = %trace_id, code = %err.code, error = %err.error, "command failed");
                CommandResult::spawn_failure(command, err.error)
            }
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn new_trace_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests;
