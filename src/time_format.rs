pub const NO_TIME: &str = "N/A";

/// Formats a run duration as `m:ss` or `h:mm:ss`, with a `.mmm` suffix when the
/// duration carries milliseconds.
pub fn format_time(seconds: Option<f64>) -> String {
    let Some(seconds) = seconds.filter(|s| s.is_finite() && *s >= 0.0) else {
        return NO_TIME.to_string();
    };

    let total_ms = (seconds * 1000.0).round() as u64;
    let millis = total_ms % 1000;
    let total_secs = total_ms / 1000;
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let secs = total_secs % 60;

    let mut out = if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes}:{secs:02}")
    };
    if millis > 0 {
        out.push_str(&format!(".{millis:03}"));
    }
    out
}
