//! Human-facing formatting for progress lines.

use std::time::Duration;

use humansize::{format_size, FormatSizeOptions, WINDOWS};

/// Byte count with 1024-based units and up to three decimals, e.g. `4.768 MB`
pub fn human_bytes(bytes: u64) -> String {
    format_size(bytes, FormatSizeOptions::from(WINDOWS).decimal_places(3))
}

/// Elapsed time as `HH:MM:SS`
pub fn human_clock(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!(
        "{:02}:{:02}:{:02}",
        secs / 3600,
        (secs % 3600) / 60,
        secs % 60
    )
}
