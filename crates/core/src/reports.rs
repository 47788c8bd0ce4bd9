//! Attendance arithmetic used by reports and analytics.

/// Attendance rate as a percentage rounded to one decimal place.
/// Returns `0.0` when nothing was recorded.
pub fn attendance_rate(present: i64, absent: i64) -> f64 {
    let total = present + absent;
    if total <= 0 {
        return 0.0;
    }
    round_to(present as f64 / total as f64 * 100.0, 1)
}

/// Average per day over `days`, rounded to two decimals.
pub fn average_daily(total: i64, days: i64) -> f64 {
    if days <= 0 {
        return 0.0;
    }
    round_to(total as f64 / days as f64, 2)
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Quote a CSV field when it contains a delimiter, quote or newline.
pub fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Render one CSV row.
pub fn csv_row<S: AsRef<str>>(fields: &[S]) -> String {
    fields
        .iter()
        .map(|f| csv_field(f.as_ref()))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_handles_empty_and_normal_days() {
        assert_eq!(attendance_rate(0, 0), 0.0);
        assert_eq!(attendance_rate(15, 5), 75.0);
        assert_eq!(attendance_rate(1, 2), 33.3);
        assert_eq!(attendance_rate(10, 0), 100.0);
    }

    #[test]
    fn average_over_window() {
        assert_eq!(average_daily(90, 30), 3.0);
        assert_eq!(average_daily(10, 30), 0.33);
        assert_eq!(average_daily(5, 0), 0.0);
    }

    #[test]
    fn csv_quoting() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(csv_row(&["Juniors", "2026-03-08", "12"]), "Juniors,2026-03-08,12");
    }
}
