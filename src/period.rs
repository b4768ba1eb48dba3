use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::report::{IssueKind, QualityIssue, QualityReport};
use crate::utils::quarter_of_month;

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

// %B also accepts the three-letter abbreviation when parsing, so
// "Oct 2022" and "October 2022" both land on the same entry.
const MONTH_FORMATS: &[&str] = &["%b-%y", "%B %Y", "%m/%Y", "%Y-%m"];

/// Whether a period falls on or before the forecast cutoff (historical
/// actuals) or after it (forward-looking forecast).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ForecastType {
    Actual,
    Forecast,
}

impl ForecastType {
    /// Periods dated exactly on the cutoff are still actuals.
    pub fn from_date(date: NaiveDate, cutoff: NaiveDate) -> Self {
        if date <= cutoff {
            ForecastType::Actual
        } else {
            ForecastType::Forecast
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ForecastType::Actual => "ACTUAL",
            ForecastType::Forecast => "FORECAST",
        }
    }
}

impl fmt::Display for ForecastType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A resolved reporting period. Month-granularity headers resolve to the
/// first day of the month; full dates keep their day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub date: NaiveDate,
    pub forecast_type: ForecastType,
}

impl Period {
    pub fn new(date: NaiveDate, cutoff: NaiveDate) -> Self {
        Period {
            date,
            forecast_type: ForecastType::from_date(date, cutoff),
        }
    }

    pub fn year(&self) -> i32 {
        self.date.year()
    }

    pub fn month(&self) -> u32 {
        self.date.month()
    }

    pub fn quarter(&self) -> u32 {
        quarter_of_month(self.date.month())
    }
}

/// A table column that resolved to a period, keyed by its cell index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeriodColumn {
    pub column: usize,
    pub period: Period,
}

/// Parses a column header into a calendar date, trying full timestamps,
/// then plain dates, then month-granularity formats.
pub fn parse_period_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    for format in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(parsed.date());
        }
    }

    if let Ok(parsed) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(parsed);
    }

    for format in MONTH_FORMATS {
        let padded = format!("{} 1", trimmed);
        let format_with_day = format!("{} %d", format);
        if let Ok(parsed) = NaiveDate::parse_from_str(&padded, &format_with_day) {
            return Some(parsed);
        }
    }

    None
}

/// Maps column headers to periods. Empty headers are skipped silently;
/// non-empty headers that fail to parse are skipped with a recorded issue
/// so annotation columns (notes, totals) never poison a run.
pub fn resolve_periods(
    headers: &[String],
    cutoff: NaiveDate,
    report: &mut QualityReport,
) -> Vec<PeriodColumn> {
    let mut columns = Vec::new();

    for (index, header) in headers.iter().enumerate() {
        let trimmed = header.trim();
        if trimmed.is_empty() {
            continue;
        }

        match parse_period_date(trimmed) {
            Some(date) => columns.push(PeriodColumn {
                column: index,
                period: Period::new(date, cutoff),
            }),
            None => report.push(QualityIssue {
                kind: IssueKind::NonDateHeader,
                location: None,
                date: None,
                field: Some(trimmed.to_string()),
                detail: format!(
                    "column header '{}' is not a recognized date; column skipped",
                    trimmed
                ),
            }),
        }
    }

    columns
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn test_parses_every_supported_header_format() {
        let expected = date(2022, 10, 1);
        for header in [
            "Oct-22",
            "Oct 2022",
            "October 2022",
            "10/2022",
            "2022-10",
            "2022-10-01",
            "2022-10-01T00:00:00",
            "2022-10-01 00:00:00",
            "  Oct-22  ",
        ] {
            assert_eq!(parse_period_date(header), Some(expected), "header: {}", header);
        }
    }

    #[test]
    fn test_rejects_non_date_headers() {
        for header in ["Total", "Notes", "YTD", "13/2022", "Oct", ""] {
            assert_eq!(parse_period_date(header), None, "header: {}", header);
        }
    }

    #[test]
    fn test_cutoff_boundary_is_inclusive() {
        let cutoff = date(2025, 6, 30);
        assert_eq!(
            ForecastType::from_date(date(2025, 6, 30), cutoff),
            ForecastType::Actual
        );
        assert_eq!(
            ForecastType::from_date(date(2025, 7, 1), cutoff),
            ForecastType::Forecast
        );
    }

    #[test]
    fn test_period_accessors() {
        let cutoff = date(2025, 6, 30);
        let period = Period::new(date(2022, 10, 1), cutoff);
        assert_eq!(period.year(), 2022);
        assert_eq!(period.month(), 10);
        assert_eq!(period.quarter(), 4);
        assert_eq!(period.forecast_type, ForecastType::Actual);

        let january = Period::new(date(2026, 1, 1), cutoff);
        assert_eq!(january.quarter(), 1);
        assert_eq!(january.forecast_type, ForecastType::Forecast);
    }

    #[test]
    fn test_resolve_periods_skips_and_reports() {
        let headers = vec![
            "Oct-22".to_string(),
            "Notes".to_string(),
            "".to_string(),
            "Nov-22".to_string(),
        ];
        let mut report = QualityReport::new();
        let columns = resolve_periods(&headers, date(2025, 6, 30), &mut report);

        assert_eq!(columns.len(), 2);
        assert_eq!(columns[0].column, 0);
        assert_eq!(columns[0].period.date, date(2022, 10, 1));
        assert_eq!(columns[1].column, 3);
        assert_eq!(columns[1].period.date, date(2022, 11, 1));

        // The blank header is skipped silently; only "Notes" is reported.
        assert_eq!(report.len(), 1);
        assert_eq!(report.count_of(IssueKind::NonDateHeader), 1);
        assert_eq!(report.issues[0].field.as_deref(), Some("Notes"));
    }

    #[test]
    fn test_full_month_name_headers_resolve_to_columns() {
        let headers = vec!["October 2022".to_string(), "November 2022".to_string()];
        let mut report = QualityReport::new();
        let columns = resolve_periods(&headers, date(2025, 6, 30), &mut report);

        assert_eq!(columns.len(), 2);
        assert_eq!(columns[0].period.date, date(2022, 10, 1));
        assert_eq!(columns[1].period.date, date(2022, 11, 1));
        assert!(report.is_empty());
    }
}
