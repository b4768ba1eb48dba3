use chrono::NaiveDate;
use csv::Writer;
use serde::Serialize;
use std::collections::BTreeSet;

use crate::error::{NormalizerError, Result};
use crate::period::ForecastType;
use crate::{KpiValue, StandardizedRecord};

/// Fixed leading columns of the normalized sheet. KPI columns follow in
/// alphabetical order. Mapping targets may not collide with these names.
pub const STANDARD_COLUMNS: [&str; 6] =
    ["Location", "Month", "Year", "Quarter", "Date", "Forecast Type"];

/// Renders records as CSV in the normalized wide layout: the standard
/// columns, then the alphabetical union of every KPI seen in the batch.
/// Numbers render with two decimals and quarters as Q1..Q4. A KPI a
/// record does not carry renders as 0.00 so the grid stays dense; a KPI
/// that failed coercion renders as an empty cell to stay distinguishable
/// from a true zero.
pub fn records_to_csv(records: &[StandardizedRecord]) -> Result<String> {
    let mut kpi_names: BTreeSet<&str> = BTreeSet::new();
    for record in records {
        for name in record.kpis.keys() {
            kpi_names.insert(name);
        }
    }

    let mut writer = Writer::from_writer(vec![]);
    let mut header: Vec<&str> = STANDARD_COLUMNS.to_vec();
    header.extend(kpi_names.iter().copied());
    writer.write_record(&header)?;

    for record in records {
        let mut row: Vec<String> = vec![
            record.location.clone(),
            record.date.format("%B").to_string(),
            record.year.to_string(),
            format!("Q{}", record.quarter),
            record.date.format("%Y-%m-%d").to_string(),
            record.forecast_type.as_str().to_string(),
        ];
        for name in &kpi_names {
            row.push(match record.kpis.get(*name) {
                Some(KpiValue::Number(number)) => format!("{:.2}", number),
                Some(KpiValue::Text(text)) => text.clone(),
                Some(KpiValue::Missing) => String::new(),
                None => "0.00".to_string(),
            });
        }
        writer.write_record(&row)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| NormalizerError::Csv(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| NormalizerError::Csv(e.to_string()))
}

/// Headline figures for one normalized batch, for logs and run reports.
#[derive(Debug, Clone, Serialize)]
pub struct DatasetSummary {
    pub client_name: String,
    pub record_count: usize,
    pub location_count: usize,
    pub kpi_count: usize,
    pub actual_records: usize,
    pub forecast_records: usize,
    pub first_period: Option<NaiveDate>,
    pub last_period: Option<NaiveDate>,
}

impl DatasetSummary {
    pub fn from_records(client_name: &str, records: &[StandardizedRecord]) -> Self {
        let mut locations = BTreeSet::new();
        let mut kpis = BTreeSet::new();
        let mut actual_records = 0;
        let mut first_period: Option<NaiveDate> = None;
        let mut last_period: Option<NaiveDate> = None;

        for record in records {
            locations.insert(record.location.as_str());
            for name in record.kpis.keys() {
                kpis.insert(name.as_str());
            }
            if record.forecast_type == ForecastType::Actual {
                actual_records += 1;
            }
            first_period = Some(first_period.map_or(record.date, |d| d.min(record.date)));
            last_period = Some(last_period.map_or(record.date, |d| d.max(record.date)));
        }

        DatasetSummary {
            client_name: client_name.to_string(),
            record_count: records.len(),
            location_count: locations.len(),
            kpi_count: kpis.len(),
            actual_records,
            forecast_records: records.len() - actual_records,
            first_period,
            last_period,
        }
    }

    pub fn to_markdown(&self) -> String {
        let period_range = match (self.first_period, self.last_period) {
            (Some(first), Some(last)) => {
                format!("{} to {}", first.format("%Y-%m-%d"), last.format("%Y-%m-%d"))
            }
            _ => "none".to_string(),
        };

        format!(
            "## Normalization Summary: {}\n\n\
             - Records: {}\n\
             - Locations: {}\n\
             - KPI columns: {}\n\
             - Period range: {}\n\
             - Actuals: {} | Forecast: {}\n",
            self.client_name,
            self.record_count,
            self.location_count,
            self.kpi_count,
            period_range,
            self.actual_records,
            self.forecast_records,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(
        location: &str,
        date: NaiveDate,
        forecast_type: ForecastType,
        kpis: Vec<(&str, KpiValue)>,
    ) -> StandardizedRecord {
        use chrono::Datelike;
        StandardizedRecord {
            location: location.to_string(),
            year: date.year(),
            month: date.month(),
            quarter: crate::utils::quarter_of_month(date.month()),
            date,
            forecast_type,
            kpis: kpis
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
        }
    }

    fn october() -> NaiveDate {
        NaiveDate::from_ymd_opt(2022, 10, 1).unwrap()
    }

    #[test]
    fn test_csv_layout_and_formats() {
        let records = vec![
            record(
                "Okotoks",
                october(),
                ForecastType::Actual,
                vec![("Total Revenue", KpiValue::Number(45000.0))],
            ),
            record(
                "Corporate",
                october(),
                ForecastType::Actual,
                vec![("Professional Fees", KpiValue::Number(1200.5))],
            ),
        ];

        let csv = records_to_csv(&records).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "Location,Month,Year,Quarter,Date,Forecast Type,Professional Fees,Total Revenue"
        );
        // KPIs absent from a record fill with 0.00 to keep the grid dense.
        assert_eq!(
            lines[1],
            "Okotoks,October,2022,Q4,2022-10-01,ACTUAL,0.00,45000.00"
        );
        assert_eq!(
            lines[2],
            "Corporate,October,2022,Q4,2022-10-01,ACTUAL,1200.50,0.00"
        );
    }

    #[test]
    fn test_csv_renders_missing_and_text() {
        let records = vec![record(
            "Okotoks",
            october(),
            ForecastType::Actual,
            vec![
                ("Car Count", KpiValue::Missing),
                ("Region Notes", KpiValue::Text("strong month".to_string())),
            ],
        )];

        let csv = records_to_csv(&records).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        // Missing stays empty; it is not a zero.
        assert_eq!(
            lines[1],
            "Okotoks,October,2022,Q4,2022-10-01,ACTUAL,,strong month"
        );
    }

    #[test]
    fn test_csv_of_empty_batch_is_header_only() {
        let csv = records_to_csv(&[]).unwrap();
        assert_eq!(csv.trim_end(), STANDARD_COLUMNS.join(","));
    }

    #[test]
    fn test_summary_counts() {
        let november = NaiveDate::from_ymd_opt(2025, 11, 1).unwrap();
        let records = vec![
            record(
                "Okotoks",
                october(),
                ForecastType::Actual,
                vec![("Total Revenue", KpiValue::Number(1.0))],
            ),
            record(
                "Barlow NE",
                october(),
                ForecastType::Actual,
                vec![("Total Revenue", KpiValue::Number(2.0))],
            ),
            record(
                "Okotoks",
                november,
                ForecastType::Forecast,
                vec![("Labour", KpiValue::Number(3.0))],
            ),
        ];

        let summary = DatasetSummary::from_records("Hughes Group", &records);
        assert_eq!(summary.record_count, 3);
        assert_eq!(summary.location_count, 2);
        assert_eq!(summary.kpi_count, 2);
        assert_eq!(summary.actual_records, 2);
        assert_eq!(summary.forecast_records, 1);
        assert_eq!(summary.first_period, Some(october()));
        assert_eq!(summary.last_period, Some(november));

        let markdown = summary.to_markdown();
        assert!(markdown.contains("Hughes Group"));
        assert!(markdown.contains("2022-10-01 to 2025-11-01"));
        println!("{}", markdown);
    }

    #[test]
    fn test_summary_of_empty_batch() {
        let summary = DatasetSummary::from_records("Hughes Group", &[]);
        assert_eq!(summary.record_count, 0);
        assert!(summary.first_period.is_none());
        assert!(summary.to_markdown().contains("none"));
    }
}
