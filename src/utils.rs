/// Returns the calendar quarter (1-4) a month falls in.
pub fn quarter_of_month(month: u32) -> u32 {
    (month.saturating_sub(1)) / 3 + 1
}

/// Lenient numeric coercion for spreadsheet cell text.
///
/// Strips everything except digits, `.` and `-` before parsing, so values
/// like `"$45,000.50"` or `"38000 CAD"` coerce cleanly. Returns `None` when
/// nothing parseable remains (e.g. `"N/A"`, `"-"`, `""`).
pub fn coerce_numeric(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();

    if cleaned.is_empty() {
        return None;
    }

    cleaned.parse::<f64>().ok()
}
