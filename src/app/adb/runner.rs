use std::fmt;
use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::app::error::AppError;

#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

/// What to spawn: an argument vector, or a raw line for the platform shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    Program { program: String, args: Vec<String> },
    Shell(String),
}

impl Invocation {
    pub fn program<I, S>(program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Invocation::Program {
            program: program.to_string(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    pub fn shell(line: impl Into<String>) -> Self {
        Invocation::Shell(line.into())
    }

    /// Program and argument vector actually handed to the OS.
    pub fn argv(&self) -> (String, Vec<String>) {
        match self {
            Invocation::Program { program, args } => (program.clone(), args.clone()),
            Invocation::Shell(line) => {
                if cfg!(windows) {
                    ("cmd.exe".to_string(), vec!["/C".to_string(), line.clone()])
                } else {
                    ("sh".to_string(), vec!["-c".to_string(), line.clone()])
                }
            }
        }
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Invocation::Program { program, args } => {
                write!(f, "{program}")?;
                for arg in args {
                    write!(f, " {arg}")?;
                }
                Ok(())
            }
            Invocation::Shell(line) => write!(f, "{line}"),
        }
    }
}

/// Spawns one invocation and waits for it.
pub trait CommandRunner {
    fn run(&self, invocation: &Invocation, trace_id: &str) -> Result<CommandOutput, AppError>;
}

impl<F> CommandRunner for F
where
    F: Fn(&Invocation, &str) -> Result<CommandOutput, AppError>,
{
    fn run(&self, invocation: &Invocation, trace_id: &str) -> Result<CommandOutput, AppError> {
        self(invocation, trace_id)
    }
}

/// Runs real child processes. Without a timeout a hung child blocks the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner {
    pub timeout: Option<Duration>,
}

impl SystemRunner {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, invocation: &Invocation, trace_id: &str) -> Result<CommandOutput, AppError> {
        let (program, args) = invocation.argv();
        match self.timeout {
            Some(timeout) => run_command_with_timeout(&program, &args, timeout, trace_id),
            None => run_command(&program, &args, trace_id),
        }
    }
}

pub fn run_command(
    program: &str,
    args: &[String],
    trace_id: &str,
) -> Result<CommandOutput, AppError> {
    run_command_inner(program, args, None, trace_id)
}

pub fn run_command_with_timeout(
    program: &str,
    args: &[String],
    timeout: Duration,
    trace_id: &str,
) -> Result<CommandOutput, AppError> {
    run_command_inner(program, args, Some(timeout), trace_id)
}

fn run_command_inner(
    program: &str,
    args: &[String],
    timeout: Option<Duration>,
    trace_id: &str,
) -> Result<CommandOutput, AppError> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|err| AppError::system(format!("Failed to spawn command: {err}"), trace_id))?;

    // Drain stdout/stderr in parallel; otherwise, a chatty child process can block once the pipe
    // buffer fills and never exit.
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| AppError::system("Failed to capture stdout", trace_id))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| AppError::system("Failed to capture stderr", trace_id))?;

    let stdout_handle = drain(stdout);
    let stderr_handle = drain(stderr);

    let start = Instant::now();
    let exit_code = loop {
        let polled = match timeout {
            Some(_) => child.try_wait(),
            None => child.wait().map(Some),
        };
        match polled {
            Ok(Some(status)) => break status.code(),
            Ok(None) => {
                if timeout.is_some_and(|limit| start.elapsed() > limit) {
                    reap(&mut child, [stdout_handle, stderr_handle]);
                    return Err(AppError::timeout("Command timed out", trace_id));
                }
                std::thread::sleep(Duration::from_millis(50));
            }
            Err(err) => {
                reap(&mut child, [stdout_handle, stderr_handle]);
                return Err(AppError::system(
                    format!("Failed to wait for command: {err}"),
                    trace_id,
                ));
            }
        }
    };

    let stdout_bytes = stdout_handle.join().unwrap_or_default();
    let stderr_bytes = stderr_handle.join().unwrap_or_default();

    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&stdout_bytes).to_string(),
        stderr: String::from_utf8_lossy(&stderr_bytes).to_string(),
        exit_code,
    })
}

/// Kills and waits on `child` so no zombie is left, then joins the drain threads.
fn reap(child: &mut Child, drains: [JoinHandle<Vec<u8>>; 2]) {
    let _ = child.kill();
    let _ = child.wait();
    for handle in drains {
        let _ = handle.join();
    }
}

fn drain<R: Read + Send + 'static>(mut reader: R) -> JoinHandle<Vec<u8>> {
    std::thread::spawn(move || {
        let mut buffer = Vec::<u8>::new();
        let mut temp = [0u8; 4096];
        loop {
            match reader.read(&mut temp) {
                Ok(0) => break,
                Ok(count) => buffer.extend_from_slice(&temp[..count]),
                Err(_) => break,
            }
        }
        buffer
    })
}
