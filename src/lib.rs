pub mod app;

use std::io;
use std::process::ExitCode;

use tracing::{info, warn};

use app::activity_log::ActivityLog;
use app::config::{
    backup_config_path, config_path, load_config_from_path, save_config_to_path, AppConfig,
};
use app::logging::init_logging;
use app::session::SessionManager;
use app::shell::{Shell, ShellArgs};

pub fn run() -> ExitCode {
    let args = match ShellArgs::parse(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{message}\n{}", ShellArgs::usage());
            return ExitCode::from(2);
        }
    };
    if args.help {
        println!("{}", ShellArgs::usage());
        return ExitCode::SUCCESS;
    }

    let path = args.config_path.clone().unwrap_or_else(config_path);
    let loaded = load_config_from_path(&path);
    let mut config = match &loaded {
        Ok(config) => config.clone(),
        Err(_) => AppConfig::default(),
    };
    init_logging(&config.logging.log_level);
    if let Err(err) = loaded {
        warn!(path = %path.display(), error = %err.error, "falling back to default config");
    }

    if let Some(adb_path) = &args.adb_path {
        config.adb.command_path = adb_path.clone();
    }
    if args.save_config {
        if let Err(err) = save_config_to_path(&config, &path, &backup_config_path(&path)) {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
        info!(path = %path.display(), "config saved");
    }

    let session = SessionManager::from_config(&config);
    info!(program = %session.program(), "starting shell");
    let log = ActivityLog::with_capacity(config.shell.max_log_entries);
    let mut shell = Shell::new(session, log, io::stdout().lock(), args.json);
    match shell.run(io::stdin().lock()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("shell error: {err}");
            ExitCode::FAILURE
        }
    }
}
