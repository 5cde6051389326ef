//! Line-oriented terminal front-end for a [`SessionManager`].

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use serde::Serialize;
use tracing::debug;

use crate::app::activity_log::{ActivityLog, EntryKind};
use crate::app::adb::runner::CommandRunner;
use crate::app::models::{CommandResult, KeyCode, SessionState};
use crate::app::session::SessionManager;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShellArgs {
    pub adb_path: Option<String>,
    pub config_path: Option<PathBuf>,
    pub json: bool,
    pub save_config: bool,
    pub help: bool,
}

impl ShellArgs {
    pub fn parse<I>(args: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = String>,
    {
        let mut parsed = ShellArgs::default();
        let mut it = args.into_iter();
        while let Some(arg) = it.next() {
            match arg.as_str() {
                "--adb" => {
                    let value = it
                        .next()
                        .map(|v| v.trim().to_string())
                        .filter(|v| !v.is_empty())
                        .ok_or_else(|| "--adb requires a value".to_string())?;
                    parsed.adb_path = Some(value);
                }
                "--config" => {
                    let value = it
                        .next()
                        .ok_or_else(|| "--config requires a value".to_string())?;
                    parsed.config_path = Some(PathBuf::from(value));
                }
                "--json" => parsed.json = true,
                "--save-config" => parsed.save_config = true,
                "-h" | "--help" => parsed.help = true,
                other => return Err(format!("unknown argument: {other}")),
            }
        }
        Ok(parsed)
    }

    pub fn usage() -> &'static str {
        "usage: adb-remote [--adb <path>] [--config <path>] [--json] [--save-config]"
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Status,
    Connect(String),
    Key(String),
    NamedKey(KeyCode),
    Push { local: String, remote: String },
    Pull { remote: String, local: String },
    Exec(String),
    Devices,
    Check,
    Log,
    Help,
    Quit,
    Empty,
}

pub fn parse_command(line: &str) -> Result<ShellCommand, String> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(ShellCommand::Empty);
    }
    if let Some(raw) = trimmed.strip_prefix('!') {
        return Ok(ShellCommand::Exec(raw.trim_start().to_string()));
    }

    let (verb, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (trimmed, ""),
    };
    let args: Vec<&str> = rest.split_whitespace().collect();

    match verb.to_lowercase().as_str() {
        "status" => Ok(ShellCommand::Status),
        "connect" => match args.as_slice() {
            [] => Ok(ShellCommand::Connect(String::new())),
            [address] => Ok(ShellCommand::Connect(address.to_string())),
            _ => Err("usage: connect <address>".to_string()),
        },
        "key" => match args.as_slice() {
            [code] => Ok(code
                .parse::<KeyCode>()
                .map(ShellCommand::NamedKey)
                .unwrap_or_else(|_| ShellCommand::Key(code.to_string()))),
            _ => Err("usage: key <code|name>".to_string()),
        },
        "push" => match args.as_slice() {
            [local, remote] => Ok(ShellCommand::Push {
                local: local.to_string(),
                remote: remote.to_string(),
            }),
            _ => Err("usage: push <local> <remote>".to_string()),
        },
        "pull" => match args.as_slice() {
            [remote, local] => Ok(ShellCommand::Pull {
                remote: remote.to_string(),
                local: local.to_string(),
            }),
            _ => Err("usage: pull <remote> <local>".to_string()),
        },
        "exec" => Ok(ShellCommand::Exec(rest.to_string())),
        "devices" => Ok(ShellCommand::Devices),
        "check" => Ok(ShellCommand::Check),
        "log" => Ok(ShellCommand::Log),
        "help" | "?" => Ok(ShellCommand::Help),
        "quit" | "exit" => Ok(ShellCommand::Quit),
        other => other
            .parse::<KeyCode>()
            .map(ShellCommand::NamedKey)
            .map_err(|_| format!("unknown command: {other} (try `help`)")),
    }
}

const HELP: &str = "\
status                     refresh connection status
connect <address>          connect over TCP/IP
key <code|name>            send a key event
up|down|left|right|ok      navigation keys
home|back|menu             system keys
push <local> <remote>      upload a file
pull <remote> <local>      download a file
exec <command> | !<cmd>    run a raw shell command
devices                    list attached devices
check                      probe the adb executable
log                        print the activity log
quit                       leave";

#[derive(Serialize)]
struct ShellEvent<'a> {
    kind: EntryKind,
    result: &'a CommandResult,
    session: &'a SessionState,
}

pub struct Shell<R: CommandRunner, W: Write> {
    session: SessionManager<R>,
    log: ActivityLog,
    out: W,
    json: bool,
    shown_state: Option<SessionState>,
}

impl<R: CommandRunner, W: Write> Shell<R, W> {
    pub fn new(session: SessionManager<R>, log: ActivityLog, out: W, json: bool) -> Self {
        Self {
            session,
            log,
            out,
            json,
            shown_state: None,
        }
    }

    pub fn session(&self) -> &SessionManager<R> {
        &self.session
    }

    pub fn log(&self) -> &ActivityLog {
        &self.log
    }

    /// Reads commands until `quit` or end of input.
    pub fn run<I: BufRead>(&mut self, input: I) -> io::Result<()> {
        self.execute(ShellCommand::Status)?;
        for line in input.lines() {
            let line = line?;
            match parse_command(&line) {
                Ok(ShellCommand::Quit) => break,
                Ok(command) => self.execute(command)?,
                Err(message) => writeln!(self.out, "{message}")?,
            }
        }
        self.out.flush()
    }

    pub fn execute(&mut self, command: ShellCommand) -> io::Result<()> {
        debug!(command = ?command, "shell command");
        match command {
            ShellCommand::Status => {
                let result = self.session.refresh_status();
                let text = match self.session.state() {
                    SessionState::Connected { peer_address } => format!("Connected ({peer_address})"),
                    SessionState::Disconnected => "Disconnected".to_string(),
                };
                self.record(EntryKind::Status, &result, text)?;
            }
            ShellCommand::Connect(address) => {
                let result = self.session.connect(&address);
                let text = result.combined_output();
                self.record(EntryKind::Connection, &result, text)?;
            }
            ShellCommand::Key(code) => {
                let result = self.session.send_key_event(&code);
                self.record(EntryKind::KeyEvent, &result, code)?;
            }
            ShellCommand::NamedKey(key) => {
                let result = self.session.send_key(key);
                let text = format!("{} ({})", key.code(), key.name());
                self.record(EntryKind::KeyEvent, &result, text)?;
            }
            ShellCommand::Push { local, remote } => {
                let result = self.session.push_file(&local, &remote);
                let text = result.combined_output();
                self.record(EntryKind::Upload, &result, text)?;
            }
            ShellCommand::Pull { remote, local } => {
                let result = self.session.pull_file(&remote, &local);
                let text = result.combined_output();
                self.record(EntryKind::Download, &result, text)?;
            }
            ShellCommand::Exec(raw) => {
                let result = self.session.run_custom_command(&raw);
                let text = result.combined_output();
                self.record(EntryKind::CustomCommand, &result, text)?;
            }
            ShellCommand::Devices => {
                let (result, devices) = self.session.list_devices();
                let text = if devices.is_empty() {
                    "none".to_string()
                } else {
                    devices
                        .iter()
                        .map(|device| format!("{} ({})", device.serial, device.state))
                        .collect::<Vec<_>>()
                        .join(", ")
                };
                self.record(EntryKind::Devices, &result, text)?;
            }
            ShellCommand::Check => {
                let info = self.session.check_tool();
                let text = match &info.error {
                    None => format!("{} -> {}", info.command_path, info.version_output),
                    Some(error) => format!("{} unavailable: {error}", info.command_path),
                };
                let entry = self.log.append(EntryKind::Tool, text).to_string();
                if self.json {
                    let payload = serde_json::to_string(&info).map_err(io::Error::other)?;
                    writeln!(self.out, "{payload}")?;
                } else {
                    writeln!(self.out, "{entry}")?;
                }
            }
            ShellCommand::Log => {
                let rendered = self.log.render();
                write!(self.out, "{rendered}")?;
            }
            ShellCommand::Help => writeln!(self.out, "{HELP}")?,
            ShellCommand::Quit | ShellCommand::Empty => {}
        }
        Ok(())
    }

    fn record(&mut self, kind: EntryKind, result: &CommandResult, text: String) -> io::Result<()> {
        let entry = self.log.append(kind, text).to_string();
        let state = self.session.state();
        if self.json {
            let event = ShellEvent {
                kind,
                result,
                session: &state,
            };
            let payload = serde_json::to_string(&event).map_err(io::Error::other)?;
            writeln!(self.out, "{payload}")?;
        } else {
            writeln!(self.out, "{entry}")?;
            if self.shown_state.as_ref() != Some(&state) {
                writeln!(self.out, "{}", status_label(&state))?;
                writeln!(self.out, "{}", peer_label(&state))?;
            }
        }
        self.shown_state = Some(state);
        Ok(())
    }
}

pub fn status_label(state: &SessionState) -> &'static str {
    if state.is_connected() {
        "ADB Status: Connected"
    } else {
        "ADB Status: Disconnected"
    }
}

pub fn peer_label(state: &SessionState) -> String {
    format!("Connected IP: {}", state.peer_address().unwrap_or("None"))
}
