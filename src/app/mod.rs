pub mod activity_log;
pub mod adb;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod session;
pub mod shell;
