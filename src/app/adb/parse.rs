use crate::app::models::DeviceSummary;

/// Substring that marks a listing row as an attached device.
pub const ATTACHED_TOKEN: &str = "device";
/// Leading word of the listing header.
pub const HEADER_KEYWORD: &str = "List";

/// First attached device's address in `adb devices` output.
///
/// Matching is a plain substring check on [`ATTACHED_TOKEN`], so a row such as
/// `error: no devices/emulators found` also matches. Callers depend on that.
pub fn find_attached_peer(output: &str) -> Option<String> {
    output
        .lines()
        .filter(|line| !line.starts_with(HEADER_KEYWORD))
        .filter(|line| line.contains(ATTACHED_TOKEN))
        .find_map(|line| line.split_whitespace().next())
        .map(str::to_string)
}

pub fn parse_adb_devices(output: &str) -> Vec<DeviceSummary> {
    output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter(|line| !line.trim_start().starts_with('*'))
        .filter(|line| !line.to_lowercase().contains("list of devices"))
        .filter_map(|line| {
            let mut tokens = line.split_whitespace();
            let serial = tokens.next()?;
            let state = tokens.next()?;
            Some(DeviceSummary {
                serial: serial.to_string(),
                state: state.to_string(),
            })
        })
        .collect()
}
