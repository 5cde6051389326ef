use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Outcome of one operation against the control tool.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommandResult {
    pub succeeded: bool,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    /// Rendered command line; empty when nothing was spawned.
    pub command: String,
}

impl CommandResult {
    pub fn from_exit(
        command: impl Into<String>,
        stdout: String,
        stderr: String,
        exit_code: Option<i32>,
    ) -> Self {
        Self {
            succeeded: exit_code == Some(0),
            stdout,
            stderr,
            exit_code,
            command: command.into(),
        }
    }

    /// A process that could not be started or waited on.
    pub fn spawn_failure(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            stdout: String::new(),
            stderr: message.into(),
            exit_code: None,
            command: command.into(),
        }
    }

    /// Input rejected before anything was spawned.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::spawn_failure(String::new(), message)
    }

    /// stdout and stderr joined for display, trimmed.
    pub fn combined_output(&self) -> String {
        let stdout = self.stdout.trim();
        let stderr = self.stderr.trim();
        match (stdout.is_empty(), stderr.is_empty()) {
            (false, false) => format!("{stdout}\n{stderr}"),
            (false, true) => stdout.to_string(),
            (true, false) => stderr.to_string(),
            (true, true) => String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Disconnected,
    Connected { peer_address: String },
}

impl SessionState {
    pub fn peer_address(&self) -> Option<&str> {
        match self {
            SessionState::Connected { peer_address } => Some(peer_address),
            SessionState::Disconnected => None,
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, SessionState::Connected { .. })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceSummary {
    pub serial: String,
    pub state: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolInfo {
    pub available: bool,
    pub version_output: String,
    pub command_path: String,
    pub error: Option<String>,
}

/// Navigation keys of the remote pad.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum KeyCode {
    Home,
    Back,
    Up,
    Down,
    Left,
    Right,
    Center,
    Menu,
}

impl KeyCode {
    pub const ALL: [KeyCode; 8] = [
        KeyCode::Up,
        KeyCode::Down,
        KeyCode::Left,
        KeyCode::Right,
        KeyCode::Center,
        KeyCode::Home,
        KeyCode::Back,
        KeyCode::Menu,
    ];

    pub fn code(self) -> u16 {
        match self {
            KeyCode::Home => 3,
            KeyCode::Back => 4,
            KeyCode::Up => 19,
            KeyCode::Down => 20,
            KeyCode::Left => 21,
            KeyCode::Right => 22,
            KeyCode::Center => 23,
            KeyCode::Menu => 82,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            KeyCode::Home => "home",
            KeyCode::Back => "back",
            KeyCode::Up => "up",
            KeyCode::Down => "down",
            KeyCode::Left => "left",
            KeyCode::Right => "right",
            KeyCode::Center => "ok",
            KeyCode::Menu => "menu",
        }
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for KeyCode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "home" => Ok(KeyCode::Home),
            "back" => Ok(KeyCode::Back),
            "up" => Ok(KeyCode::Up),
            "down" => Ok(KeyCode::Down),
            "left" => Ok(KeyCode::Left),
            "right" => Ok(KeyCode::Right),
            "ok" | "center" | "enter" => Ok(KeyCode::Center),
            "menu" => Ok(KeyCode::Menu),
            other => Err(format!("unknown key name: {other}")),
        }
    }
}
