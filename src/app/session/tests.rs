use super::*;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::app::adb::runner::CommandOutput;
use crate::app::error::AppError;

const HEADER: &str = "List of devices attached\n";

/// Replays canned outputs in order and records every invocation.
#[derive(Default)]
struct ScriptedRunner {
    outputs: Mutex<VecDeque<Result<CommandOutput, AppError>>>,
    calls: Mutex<Vec<Invocation>>,
}

impl ScriptedRunner {
    fn with(outputs: Vec<Result<CommandOutput, AppError>>) -> Self {
        Self {
            outputs: Mutex::new(outputs.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().expect("calls").clone()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, invocation: &Invocation, trace_id: &str) -> Result<CommandOutput, AppError> {
        self.calls.lock().expect("calls").push(invocation.clone());
        self.outputs
            .lock()
            .expect("outputs")
            .pop_front()
            .unwrap_or_else(|| Err(AppError::system("no scripted output", trace_id)))
    }
}

fn ok(stdout: &str) -> Result<CommandOutput, AppError> {
    Ok(CommandOutput {
        stdout: stdout.to_string(),
        stderr: String::new(),
        exit_code: Some(0),
    })
}

fn adb(args: &[&str]) -> Invocation {
    Invocation::program("adb", args.iter().copied())
}

fn runner_fn<F>(f: F) -> F
where
    F: Fn(&Invocation, &str) -> Result<CommandOutput, AppError>,
{
    f
}

#[test]
fn starts_disconnected() {
    let session = SessionManager::new("adb", ScriptedRunner::default());
    assert_eq!(session.state(), SessionState::Disconnected);
    assert_eq!(session.peer_address(), None);
    assert!(!session.is_connected());
}

#[test]
fn refresh_status_connects_to_listed_peer() {
    let session = SessionManager::new(
        "adb",
        ScriptedRunner::with(vec![ok("List of devices attached\n192.168.1.5:5555\tdevice\n")]),
    );

    let result = session.refresh_status();

    assert!(result.succeeded);
    assert_eq!(result.command, "adb devices");
    assert_eq!(
        session.state(),
        SessionState::Connected {
            peer_address: "192.168.1.5:5555".to_string()
        }
    );
    assert_eq!(session.runner.calls(), vec![adb(&["devices"])]);
}

#[test]
fn refresh_status_clears_peer_when_nothing_attached() {
    let session = SessionManager::new(
        "adb",
        ScriptedRunner::with(vec![
            ok("List of devices attached\nemulator-5554\tdevice\n"),
            ok(HEADER),
        ]),
    );

    session.refresh_status();
    assert!(session.is_connected());

    session.refresh_status();
    assert_eq!(session.state(), SessionState::Disconnected);
    assert_eq!(session.peer_address(), None);
}

#[test]
fn refresh_status_is_idempotent_for_same_topology() {
    let listing = "List of devices attached\nR58M123ABC\tdevice\n";
    let session = SessionManager::new("adb", ScriptedRunner::with(vec![ok(listing), ok(listing)]));

    session.refresh_status();
    let first = session.state();
    session.refresh_status();

    assert_eq!(session.state(), first);
    assert_eq!(session.peer_address().as_deref(), Some("R58M123ABC"));
}

#[test]
fn refresh_status_first_device_wins() {
    let session = SessionManager::new(
        "adb",
        ScriptedRunner::with(vec![ok(
            "List of devices attached\n10.0.0.7:5555\tdevice\n10.0.0.8:5555\tdevice\n",
        )]),
    );
    session.refresh_status();
    assert_eq!(session.peer_address().as_deref(), Some("10.0.0.7:5555"));
}

#[test]
fn refresh_status_spawn_failure_disconnects() {
    let session = SessionManager::new(
        "adb",
        ScriptedRunner::with(vec![
            ok("List of devices attached\nemulator-5554\tdevice\n"),
            Err(AppError::system("Failed to spawn command: not found", "t")),
        ]),
    );
    session.refresh_status();

    let result = session.refresh_status();

    assert!(!result.succeeded);
    assert_eq!(result.exit_code, None);
    assert!(result.stderr.contains("not found"));
    assert_eq!(session.state(), SessionState::Disconnected);
}

#[test]
fn connect_with_empty_address_never_spawns() {
    let spawned = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&spawned);
    let runner = runner_fn(move |_invocation: &Invocation, _trace_id: &str| {
        counter.fetch_add(1, Ordering::SeqCst);
        ok("")
    });
    let session = SessionManager::new("adb", runner);

    let result = session.connect("");
    assert!(!result.succeeded);
    assert_eq!(result.stderr, EMPTY_ADDRESS_MESSAGE);
    assert!(result.command.is_empty());

    assert_eq!(spawned.load(Ordering::SeqCst), 0);
    assert_eq!(session.state(), SessionState::Disconnected);
}

#[test]
fn connect_passes_blank_address_to_tool() {
    let session = SessionManager::new(
        "adb",
        ScriptedRunner::with(vec![
            Ok(CommandOutput {
                stdout: String::new(),
                stderr: "adb: usage: adb connect HOST[:PORT]\n".to_string(),
                exit_code: Some(1),
            }),
            ok(HEADER),
        ]),
    );

    let result = session.connect("   ");

    assert!(!result.succeeded);
    assert!(result.stderr.contains("usage"));
    assert_eq!(
        session.runner.calls(),
        vec![adb(&["connect", "   "]), adb(&["devices"])]
    );
    assert_eq!(session.state(), SessionState::Disconnected);
}

#[test]
fn connect_passes_address_verbatim_then_refreshes() {
    let session = SessionManager::new(
        "adb",
        ScriptedRunner::with(vec![
            ok("connected to 192.168.1.5:5555\n"),
            ok("List of devices attached\n192.168.1.5:5555\tdevice\n"),
        ]),
    );

    let result = session.connect("192.168.1.5:5555");

    assert!(result.succeeded);
    assert_eq!(result.stdout, "connected to 192.168.1.5:5555\n");
    assert_eq!(
        session.runner.calls(),
        vec![adb(&["connect", "192.168.1.5:5555"]), adb(&["devices"])]
    );
    assert_eq!(session.peer_address().as_deref(), Some("192.168.1.5:5555"));
}

#[test]
fn connect_surfaces_tool_reported_failure_unchanged() {
    // adb exits 0 here; the wording is not interpreted.
    let session = SessionManager::new(
        "adb",
        ScriptedRunner::with(vec![
            ok("failed to connect to 'not-an-address': Connection refused\n"),
            ok(HEADER),
        ]),
    );

    let result = session.connect("not-an-address");

    assert!(result.succeeded);
    assert!(result.stdout.contains("failed to connect"));
    assert_eq!(session.state(), SessionState::Disconnected);
}

#[test]
fn send_key_event_builds_input_command() {
    let session = SessionManager::new("adb", ScriptedRunner::with(vec![ok(""), ok("")]));

    session.send_key_event("19");
    session.send_key(KeyCode::Home);

    assert_eq!(
        session.runner.calls(),
        vec![
            adb(&["shell", "input", "keyevent", "19"]),
            adb(&["shell", "input", "keyevent", "3"]),
        ]
    );
}

#[test]
fn push_file_keeps_path_order_and_stdout() {
    let stdout = "/tmp/a.txt: 1 file pushed, 0 skipped. 0.1 MB/s (12 bytes in 0.001s)\n";
    let session = SessionManager::new("adb", ScriptedRunner::with(vec![ok(stdout)]));

    let result = session.push_file("/tmp/a.txt", "/sdcard/a.txt");

    assert_eq!(
        session.runner.calls(),
        vec![adb(&["push", "/tmp/a.txt", "/sdcard/a.txt"])]
    );
    assert_eq!(result.command, "adb push /tmp/a.txt /sdcard/a.txt");
    assert_eq!(result.stdout, stdout);
}

#[test]
fn pull_file_reverses_direction() {
    let session = SessionManager::new("adb", ScriptedRunner::with(vec![ok("")]));

    session.pull_file("/sdcard/a.txt", "/tmp/a.txt");

    assert_eq!(
        session.runner.calls(),
        vec![adb(&["pull", "/sdcard/a.txt", "/tmp/a.txt"])]
    );
}

#[test]
fn push_missing_local_file_reports_tool_error() {
    let session = SessionManager::new(
        "adb",
        ScriptedRunner::with(vec![Ok(CommandOutput {
            stdout: String::new(),
            stderr: "adb: error: cannot stat '/nope': No such file or directory\n".to_string(),
            exit_code: Some(1),
        })]),
    );

    let result = session.push_file("/nope", "/sdcard/nope");

    assert!(!result.succeeded);
    assert_eq!(result.exit_code, Some(1));
    assert!(result.stderr.contains("cannot stat"));
}

#[test]
fn run_custom_command_uses_shell_without_wrapping() {
    let session = SessionManager::new("adb", ScriptedRunner::with(vec![ok("")]));

    let result = session.run_custom_command("adb shell getprop | grep model");

    assert_eq!(
        session.runner.calls(),
        vec![Invocation::shell("adb shell getprop | grep model")]
    );
    assert_eq!(result.command, "adb shell getprop | grep model");
}

#[cfg(unix)]
#[test]
fn run_custom_command_echo_succeeds() {
    let session = SessionManager::new("adb", SystemRunner::default());

    let result = session.run_custom_command("echo hi");

    assert!(result.succeeded);
    assert!(result.stdout.contains("hi"));
    assert_eq!(result.exit_code, Some(0));
}

#[test]
fn missing_tool_is_captured_as_data() {
    let session = SessionManager::new("/this/path/should/not/exist/adb", SystemRunner::default());

    let result = session.refresh_status();
    assert!(!result.succeeded);
    assert!(result.stderr.contains("Failed to spawn command"));
    assert_eq!(session.state(), SessionState::Disconnected);

    let info = session.check_tool();
    assert!(!info.available);
    assert!(info.error.unwrap_or_default().contains("not found"));
}

#[test]
fn list_devices_leaves_state_alone() {
    let session = SessionManager::new(
        "adb",
        ScriptedRunner::with(vec![ok(
            "List of devices attached\nemulator-5554\tdevice\nZX1G22\tunauthorized\n",
        )]),
    );

    let (result, devices) = session.list_devices();

    assert!(result.succeeded);
    assert_eq!(devices.len(), 2);
    assert_eq!(devices[1].state, "unauthorized");
    assert_eq!(session.state(), SessionState::Disconnected);
}

#[test]
fn check_tool_reports_version() {
    let session = SessionManager::new(
        "adb",
        ScriptedRunner::with(vec![ok("Android Debug Bridge version 1.0.41\n")]),
    );

    let info = session.check_tool();

    assert!(info.available);
    assert_eq!(info.version_output, "Android Debug Bridge version 1.0.41");
    assert_eq!(info.command_path, "adb");
    assert_eq!(info.error, None);
    assert_eq!(session.runner.calls(), vec![adb(&["version"])]);
}

#[test]
fn concurrent_refreshes_never_overlap() {
    let in_flight = Arc::new(AtomicUsize::new(0));
    let overlapped = Arc::new(AtomicBool::new(false));
    let calls = Arc::new(AtomicUsize::new(0));
    let runner = {
        let in_flight = Arc::clone(&in_flight);
        let overlapped = Arc::clone(&overlapped);
        let calls = Arc::clone(&calls);
        runner_fn(move |_invocation: &Invocation, _trace_id: &str| {
            calls.fetch_add(1, Ordering::SeqCst);
            if in_flight.fetch_add(1, Ordering::SeqCst) > 0 {
                overlapped.store(true, Ordering::SeqCst);
            }
            std::thread::sleep(Duration::from_millis(20));
            in_flight.fetch_sub(1, Ordering::SeqCst);
            ok("List of devices attached\nemulator-5554\tdevice\n")
        })
    };
    let session = Arc::new(SessionManager::new("adb", runner));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let session = Arc::clone(&session);
            std::thread::spawn(move || session.refresh_status())
        })
        .collect();
    for handle in handles {
        assert!(handle.join().expect("refresh thread").succeeded);
    }

    assert!(!overlapped.load(Ordering::SeqCst), "refreshes ran concurrently");
    assert_eq!(calls.load(Ordering::SeqCst), 8);
    assert_eq!(session.peer_address().as_deref(), Some("emulator-5554"));
}

#[test]
fn from_config_resolves_program() {
    let mut config = AppConfig::default();
    assert_eq!(SessionManager::from_config(&config).program(), "adb");

    config.adb.command_path = "\"/opt/platform-tools/adb\"".to_string();
    assert_eq!(
        SessionManager::from_config(&config).program(),
        "/opt/platform-tools/adb"
    );
}
