use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::mapping::{Contribution, MappedRecord};
use crate::report::{IssueKind, QualityIssue, QualityReport};
use crate::schema::{ClientMapping, ReconciliationRule};
use crate::table::CellValue;
use crate::utils::coerce_numeric;
use crate::{KpiValue, StandardizedRecord};

/// Coerces mapped records into their final typed form.
///
/// Financial KPIs take the numeric path: numbers pass through, blanks
/// count as 0, and text is cleaned of currency symbols and separators
/// before parsing. Text that still fails to parse contributes 0 to the
/// KPI and is reported; a KPI whose every contribution fails comes out
/// missing rather than as a fabricated 0. A KPI fed by several source
/// fields is summed, and always numerically, whatever its designation.
pub fn validate_and_coerce(
    records: Vec<MappedRecord>,
    mapping: &ClientMapping,
    report: &mut QualityReport,
) -> Vec<StandardizedRecord> {
    records
        .into_iter()
        .map(|record| {
            let MappedRecord {
                location_key: _,
                location,
                period,
                kpis,
            } = record;

            let mut coerced = BTreeMap::new();
            for (kpi, contributions) in kpis {
                let value =
                    coerce_kpi(&location, period.date, &kpi, &contributions, mapping, report);
                coerced.insert(kpi, value);
            }

            StandardizedRecord {
                location,
                year: period.year(),
                month: period.month(),
                quarter: period.quarter(),
                date: period.date,
                forecast_type: period.forecast_type,
                kpis: coerced,
            }
        })
        .collect()
}

fn coerce_kpi(
    location: &str,
    date: NaiveDate,
    kpi: &str,
    contributions: &[Contribution],
    mapping: &ClientMapping,
    report: &mut QualityReport,
) -> KpiValue {
    let numeric_path = mapping.is_financial(kpi) || contributions.len() > 1;

    if let [only] = contributions {
        if !numeric_path {
            return match &only.value {
                CellValue::Number(number) => KpiValue::Number(*number),
                CellValue::Text(text) => KpiValue::Text(text.clone()),
                CellValue::Empty => KpiValue::Missing,
            };
        }
    }

    let mut sum = 0.0;
    let mut failures = 0;
    for contribution in contributions {
        match &contribution.value {
            CellValue::Number(number) => sum += number,
            CellValue::Empty => {}
            CellValue::Text(text) => match coerce_numeric(text) {
                Some(number) => sum += number,
                None => {
                    failures += 1;
                    report.push(QualityIssue {
                        kind: IssueKind::NonNumericValue,
                        location: Some(location.to_string()),
                        date: Some(date),
                        field: Some(kpi.to_string()),
                        detail: format!(
                            "value '{}' from field '{}' is not numeric; counted as 0",
                            text, contribution.source_field
                        ),
                    });
                }
            },
        }
    }

    if !contributions.is_empty() && failures == contributions.len() {
        KpiValue::Missing
    } else {
        KpiValue::Number(sum)
    }
}

/// Checks that per-location components sum back to the declared
/// consolidated total for each period. Mismatches are reported, never
/// fatal. Periods where no record carries the total as a number are
/// skipped; components missing from a record count as 0.
pub fn reconcile(
    records: &[StandardizedRecord],
    rule: Option<&ReconciliationRule>,
    report: &mut QualityReport,
) {
    let Some(rule) = rule else {
        return;
    };

    let mut by_date: BTreeMap<NaiveDate, Vec<&StandardizedRecord>> = BTreeMap::new();
    for record in records {
        by_date.entry(record.date).or_default().push(record);
    }

    for (date, group) in by_date {
        let declared = group
            .iter()
            .find_map(|record| record.kpis.get(&rule.total_field).and_then(KpiValue::as_number));
        let Some(declared) = declared else {
            continue;
        };

        let computed: f64 = group
            .iter()
            .map(|record| {
                rule.component_fields
                    .iter()
                    .map(|field| {
                        record
                            .kpis
                            .get(field)
                            .and_then(KpiValue::as_number)
                            .unwrap_or(0.0)
                    })
                    .sum::<f64>()
            })
            .sum();

        if !rule.tolerance.allows(declared, computed) {
            report.push(QualityIssue {
                kind: IssueKind::ReconciliationMismatch,
                location: None,
                date: Some(date),
                field: Some(rule.total_field.clone()),
                detail: format!(
                    "declared total {:.2} differs from computed component sum {:.2} by {:.2} (allowed {:.2})",
                    declared,
                    computed,
                    (declared - computed).abs(),
                    rule.tolerance.limit_for(declared, computed)
                ),
            });
        }
    }
}
