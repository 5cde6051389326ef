fn main() -> std::process::ExitCode {
    adb_remote_lib::run()
}
