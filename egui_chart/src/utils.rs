//! Small helpers shared by the editor and its hosts.

/// Formats seconds as `"MM:SS.mmm"`. Negative and non-finite times show as zero.
///
/// ```
/// use egui_chart::utils::format_time;
///
/// assert_eq!(format_time(125.5), "02:05.500");
/// ```
pub fn format_time(time_seconds: f64) -> String {
    let total_ms = if time_seconds.is_finite() && time_seconds > 0.0 {
        (time_seconds * 1000.0).round() as u64
    } else {
        0
    };
    let minutes = total_ms / 60_000;
    let seconds = (total_ms / 1000) % 60;
    let milliseconds = total_ms % 1000;
    format!("{:02}:{:02}.{:03}", minutes, seconds, milliseconds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case(0.0, "00:00.000")]
    #[test_case(0.25, "00:00.250")]
    #[test_case(59.9999, "01:00.000")]
    #[test_case(61.007, "01:01.007")]
    #[test_case(-3.0, "00:00.000")]
    #[test_case(f64::NAN, "00:00.000")]
    fn formats(seconds: f64, expected: &str) {
        assert_eq!(format_time(seconds), expected);
    }
}
