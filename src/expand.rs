use std::collections::{BTreeMap, BTreeSet};

use crate::classifier::{Classification, FieldClassifier};
use crate::period::{Period, PeriodColumn};
use crate::report::{IssueKind, QualityIssue, QualityReport};
use crate::schema::LocationRegistry;
use crate::table::{CellValue, RawTable};

/// One location's slice of one period, values still raw. The corporate
/// record (shared and unclassified fields) carries no registry key.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub location_key: Option<String>,
    pub location: String,
    pub period: Period,
    pub fields: BTreeMap<String, CellValue>,
}

impl RawRecord {
    pub fn is_corporate(&self) -> bool {
        self.location_key.is_none()
    }
}

/// Expands a wide table into per-location, per-period records.
///
/// Output order is period-major: for each period column in turn, one
/// record per registry location in registry order, then the corporate
/// record last. A location none of whose fields appear in the table
/// still gets a record with an empty field map, as does corporate, so
/// the output grid stays dense across every location and period.
pub fn expand(
    table: &RawTable,
    periods: &[PeriodColumn],
    registry: &LocationRegistry,
    classifier: &FieldClassifier,
    report: &mut QualityReport,
) -> Vec<RawRecord> {
    // Deduplicate row labels first: the last occurrence of a label wins,
    // and each duplicated label is reported once, however often it repeats.
    let mut resolved: BTreeMap<&str, usize> = BTreeMap::new();
    let mut reported: BTreeSet<&str> = BTreeSet::new();
    for (index, row) in table.rows.iter().enumerate() {
        let label = row.label.as_str();
        if label.is_empty() {
            continue;
        }
        if resolved.insert(label, index).is_some() && reported.insert(label) {
            report.push(QualityIssue {
                kind: IssueKind::DuplicateRowLabel,
                location: None,
                date: None,
                field: Some(label.to_string()),
                detail: format!(
                    "row label '{}' appears more than once; keeping the last occurrence",
                    label
                ),
            });
        }
    }

    // Route each surviving field to its owner. Deduplication above means
    // an unclassified name is warned about at most once.
    let mut by_location: BTreeMap<String, Vec<(String, usize)>> = BTreeMap::new();
    let mut corporate: Vec<(String, usize)> = Vec::new();
    for (label, row_index) in &resolved {
        match classifier.classify(label) {
            Classification::Location(key) => by_location
                .entry(key)
                .or_default()
                .push((label.to_string(), *row_index)),
            Classification::Shared => corporate.push((label.to_string(), *row_index)),
            Classification::Unlisted => {
                report.push(QualityIssue {
                    kind: IssueKind::UnclassifiedField,
                    location: Some(registry.corporate_name.clone()),
                    date: None,
                    field: Some(label.to_string()),
                    detail: format!(
                        "field '{}' is not registered to any location or the shared list; routed to {}",
                        label, registry.corporate_name
                    ),
                });
                corporate.push((label.to_string(), *row_index));
            }
        }
    }

    let mut records = Vec::with_capacity(periods.len() * (registry.locations.len() + 1));
    for period_column in periods {
        for location in &registry.locations {
            let fields = by_location
                .get(&location.key)
                .map(|owned| collect_fields(table, owned, period_column.column))
                .unwrap_or_default();
            records.push(RawRecord {
                location_key: Some(location.key.clone()),
                location: location.name.clone(),
                period: period_column.period,
                fields,
            });
        }
        records.push(RawRecord {
            location_key: None,
            location: registry.corporate_name.clone(),
            period: period_column.period,
            fields: collect_fields(table, &corporate, period_column.column),
        });
    }
    records
}

fn collect_fields(
    table: &RawTable,
    owned: &[(String, usize)],
    column: usize,
) -> BTreeMap<String, CellValue> {
    owned
        .iter()
        .map(|(field, row)| (field.clone(), table.value_at(*row, column)))
        .collect()
}
