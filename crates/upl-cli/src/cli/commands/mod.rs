//! CLI command handlers, one file per command.

mod checksum;
mod completions;
mod purge;
mod status;
mod upload;

pub use checksum::run_checksum;
pub use completions::run_completions;
pub use purge::run_purge;
pub use status::run_status;
pub use upload::run_upload;

/// `1536` -> `1.5 KiB`.
pub(crate) fn format_bytes(n: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = n as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", n)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}
