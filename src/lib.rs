//! # P&L Normalizer
//!
//! A library for normalizing multi-location profit-and-loss spreadsheets
//! (one column per month, one row per financial field) into a standardized
//! long-format dataset with one record per location per period.
//!
//! ## Core Concepts
//!
//! - **Raw Table**: the wide source layout; row labels are field names, column headers are dates
//! - **Classification**: each field belongs to exactly one location, or to the business as a whole
//! - **Expansion**: each (location, period) pair becomes one output record; shared fields land on a synthetic corporate record
//! - **Client Mapping**: per-client renames collapse source fields onto standard KPI columns; collisions are summed
//! - **Quality Report**: malformed dates, duplicate rows, unknown fields, and failed reconciliations are reported, never fatal
//!
//! ## Example
//!
//! ```rust,ignore
//! use pnl_normalizer::*;
//! use chrono::NaiveDate;
//! use std::collections::BTreeMap;
//!
//! let config = NormalizerConfig {
//!     client: ClientMapping {
//!         client_name: "Hughes Group".to_string(),
//!         renames: BTreeMap::from([
//!             ("Okotoks Revenue".to_string(), "Total Revenue".to_string()),
//!             ("Barlow NE Revenue".to_string(), "Total Revenue".to_string()),
//!         ]),
//!         financial_columns: Default::default(),
//!     },
//!     locations: LocationRegistry {
//!         locations: vec![
//!             LocationEntry {
//!                 key: "okotoks".to_string(),
//!                 name: "Okotoks".to_string(),
//!                 fields: vec!["Okotoks Revenue".to_string()],
//!             },
//!             LocationEntry {
//!                 key: "barlow_ne".to_string(),
//!                 name: "Barlow NE".to_string(),
//!                 fields: vec!["Barlow NE Revenue".to_string()],
//!             },
//!         ],
//!         corporate_name: "Corporate".to_string(),
//!         shared_fields: vec!["Professional Fees".to_string()],
//!     },
//!     forecast_cutoff: NaiveDate::from_ymd_opt(2025, 6, 30).unwrap(),
//!     reconciliation: None,
//! };
//!
//! let table = RawTable::new(
//!     vec!["Oct 2022".to_string(), "Nov 2022".to_string()],
//!     vec![
//!         ("Okotoks Revenue".to_string(), vec![45000.0.into(), 47200.0.into()]),
//!         ("Barlow NE Revenue".to_string(), vec![38000.0.into(), 39100.0.into()]),
//!         ("Professional Fees".to_string(), vec![2500.0.into(), 2500.0.into()]),
//!     ],
//! );
//!
//! let batch = normalize_pnl(&table, &config).unwrap();
//! let csv = records_to_csv(&batch.records).unwrap();
//! ```

pub mod classifier;
pub mod error;
pub mod expand;
pub mod mapping;
pub mod output;
pub mod period;
pub mod report;
pub mod schema;
pub mod table;
pub mod utils;
pub mod validate;

pub use classifier::{Classification, FieldClassifier};
pub use error::{NormalizerError, Result};
pub use expand::{expand, RawRecord};
pub use mapping::*;
pub use output::{records_to_csv, DatasetSummary, STANDARD_COLUMNS};
pub use period::{parse_period_date, resolve_periods, ForecastType, Period, PeriodColumn};
pub use report::{IssueKind, QualityIssue, QualityReport};
pub use schema::*;
pub use table::{CellValue, RawRow, RawTable};
pub use utils::*;
pub use validate::{reconcile, validate_and_coerce};

use chrono::NaiveDate;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Final typed value of one KPI on one record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KpiValue {
    Number(f64),
    /// Non-financial annotation carried through verbatim.
    Text(String),
    /// Present in the source but unusable; serialized as null.
    Missing,
}

impl KpiValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            KpiValue::Number(number) => Some(*number),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, KpiValue::Missing)
    }
}

/// One location's figures for one period, fully typed and renamed to
/// standard KPI columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardizedRecord {
    pub location: String,
    pub year: i32,
    pub month: u32,
    pub quarter: u32,
    pub date: NaiveDate,
    pub forecast_type: ForecastType,
    pub kpis: BTreeMap<String, KpiValue>,
}

impl StandardizedRecord {
    /// Numeric value of a KPI, defaulting to 0 when the record does not
    /// carry it or it is missing. Matches the dense-grid reading of the
    /// rendered output.
    pub fn kpi(&self, name: &str) -> f64 {
        self.kpis
            .get(name)
            .and_then(KpiValue::as_number)
            .unwrap_or(0.0)
    }
}

/// A normalized run: the records plus every data-quality finding
/// accumulated while producing them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedBatch {
    pub records: Vec<StandardizedRecord>,
    pub report: QualityReport,
}

impl NormalizedBatch {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

pub struct PnlNormalizer;

impl PnlNormalizer {
    pub fn process(table: &RawTable, config: &NormalizerConfig) -> Result<NormalizedBatch> {
        validate_config(config)?;

        info!(
            "Normalizing P&L table for client: {}",
            config.client.client_name
        );
        debug!(
            "Table has {} field rows and {} columns; registry lists {} locations",
            table.rows.len(),
            table.width(),
            config.locations.locations.len()
        );

        let classifier = FieldClassifier::new(&config.locations)?;
        let mut report = QualityReport::new();

        let periods = resolve_periods(&table.column_headers, config.forecast_cutoff, &mut report);
        debug!("Resolved {} period columns", periods.len());

        let raw_records = expand(table, &periods, &config.locations, &classifier, &mut report);
        let mapped = apply_mapping(raw_records, &config.client);
        let records = validate_and_coerce(mapped, &config.client, &mut report);

        reconcile(&records, config.reconciliation.as_ref(), &mut report);

        for issue in &report.issues {
            debug!("Data quality: {}", issue);
        }
        info!(
            "Produced {} normalized records with {} data quality issues",
            records.len(),
            report.len()
        );

        Ok(NormalizedBatch { records, report })
    }
}

pub fn normalize_pnl(table: &RawTable, config: &NormalizerConfig) -> Result<NormalizedBatch> {
    PnlNormalizer::process(table, config)
}

fn validate_config(config: &NormalizerConfig) -> Result<()> {
    if config.locations.locations.is_empty() {
        return Err(NormalizerError::EmptyLocationRegistry);
    }

    let mut keys: BTreeSet<&str> = BTreeSet::new();
    let mut names: BTreeSet<&str> = BTreeSet::new();
    names.insert(config.locations.corporate_name.as_str());
    for location in &config.locations.locations {
        if !keys.insert(location.key.as_str()) {
            return Err(NormalizerError::DuplicateLocationKey(location.key.clone()));
        }
        if !names.insert(location.name.as_str()) {
            return Err(NormalizerError::DuplicateLocationName(location.name.clone()));
        }
    }

    for target in config.client.renames.values() {
        if STANDARD_COLUMNS.contains(&target.as_str()) {
            return Err(NormalizerError::ReservedKpiName(target.clone()));
        }
    }

    if let Some(rule) = &config.reconciliation {
        let magnitude = rule.tolerance.magnitude();
        if magnitude < 0.0 {
            return Err(NormalizerError::InvalidTolerance(magnitude));
        }
        if rule.component_fields.contains(&rule.total_field) {
            return Err(NormalizerError::ReconciliationConfig(
                rule.total_field.clone(),
            ));
        }
    }

    Ok(())
}
