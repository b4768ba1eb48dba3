use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::Result;
use crate::expand::RawRecord;
use crate::period::Period;
use crate::schema::ClientMapping;
use crate::table::CellValue;

/// Mapping set key whose renames apply to any client without a mapping of
/// its own.
pub const GENERIC_CLIENT: &str = "Generic";

/// One source value feeding a standard KPI. Kept separate per source so
/// collisions can be summed (or inspected) later instead of silently
/// overwriting each other.
#[derive(Debug, Clone, PartialEq)]
pub struct Contribution {
    pub source_field: String,
    pub value: CellValue,
}

/// A record after renaming: standard KPI names, each holding every source
/// field that mapped onto it.
#[derive(Debug, Clone, PartialEq)]
pub struct MappedRecord {
    pub location_key: Option<String>,
    pub location: String,
    pub period: Period,
    pub kpis: BTreeMap<String, Vec<Contribution>>,
}

/// Renames each record's fields to standard KPI names. Fields without a
/// rename keep their source name. Two fields of one record that map to
/// the same KPI both survive as contributions.
pub fn apply_mapping(records: Vec<RawRecord>, mapping: &ClientMapping) -> Vec<MappedRecord> {
    records
        .into_iter()
        .map(|record| {
            let RawRecord {
                location_key,
                location,
                period,
                fields,
            } = record;

            let mut kpis: BTreeMap<String, Vec<Contribution>> = BTreeMap::new();
            for (source_field, value) in fields {
                let standard = mapping.standard_name(&source_field).to_string();
                kpis.entry(standard)
                    .or_default()
                    .push(Contribution { source_field, value });
            }

            MappedRecord {
                location_key,
                location,
                period,
                kpis,
            }
        })
        .collect()
}

/// Row form of a mapping table, as loaded from a mapping file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingRow {
    pub client_name: String,
    pub source_field: String,
    pub standard_field: String,
}

/// All known client mappings, selectable by client name.
#[derive(Debug, Clone, Default)]
pub struct ClientMappingSet {
    mappings: BTreeMap<String, ClientMapping>,
}

impl ClientMappingSet {
    /// Loads rows from a headered CSV file with client_name, source_field
    /// and standard_field columns. Mapping tables live outside the binary
    /// so a new client chain onboards without a code change.
    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)?;
        let mut rows = Vec::new();
        for row in reader.deserialize() {
            rows.push(row?);
        }
        Ok(Self::from_rows(rows))
    }

    pub fn from_rows(rows: Vec<MappingRow>) -> Self {
        let mut mappings: BTreeMap<String, ClientMapping> = BTreeMap::new();
        for row in rows {
            let entry = mappings
                .entry(row.client_name.clone())
                .or_insert_with(|| ClientMapping {
                    client_name: row.client_name.clone(),
                    renames: BTreeMap::new(),
                    financial_columns: Default::default(),
                });
            entry.renames.insert(row.source_field, row.standard_field);
        }
        ClientMappingSet { mappings }
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Exact client match, else the Generic mapping, else an identity
    /// mapping that renames nothing. The fallback keeps the requested
    /// client's name so downstream logs stay attributable.
    pub fn for_client(&self, client_name: &str) -> ClientMapping {
        if let Some(mapping) = self.mappings.get(client_name) {
            return mapping.clone();
        }
        let mut fallback = self
            .mappings
            .get(GENERIC_CLIENT)
            .cloned()
            .unwrap_or_else(|| ClientMapping {
                client_name: String::new(),
                renames: BTreeMap::new(),
                financial_columns: Default::default(),
            });
        fallback.client_name = client_name.to_string();
        fallback
    }
}

/// Derives the client name from a workbook filename by dropping the
/// spreadsheet extension and the export suffixes our sources append, e.g.
/// "Hughes Group Dashboard_20240115.xlsx" -> "Hughes Group".
pub fn client_name_from_filename(filename: &str) -> String {
    let name = Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(filename);

    let mut remainder = strip_extension(name).trim();
    loop {
        let stripped = strip_export_suffix(remainder);
        if stripped == remainder {
            break;
        }
        remainder = stripped;
    }
    remainder.to_string()
}

fn strip_extension(name: &str) -> &str {
    if let Some((stem, extension)) = name.rsplit_once('.') {
        if matches!(
            extension.to_ascii_lowercase().as_str(),
            "xlsx" | "xls" | "csv"
        ) {
            return stem;
        }
    }
    name
}

fn strip_export_suffix(name: &str) -> &str {
    // " Raw Data" must come before " Data" or the shorter form wins.
    for suffix in [" Raw Data", " Data"] {
        if let Some(stripped) = name.strip_suffix(suffix) {
            return stripped.trim_end();
        }
    }
    for marker in [" Dashboard_", " Forecast Analysis_"] {
        if let Some(position) = name.rfind(marker) {
            let tail = &name[position + marker.len()..];
            if !tail.is_empty() && tail.chars().all(|c| c.is_ascii_digit()) {
                return name[..position].trim_end();
            }
        }
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::period::{ForecastType, Period};
    use chrono::NaiveDate;

    fn period() -> Period {
        Period {
            date: NaiveDate::from_ymd_opt(2022, 10, 1).unwrap(),
            forecast_type: ForecastType::Actual,
        }
    }

    fn raw_record(location: &str, fields: Vec<(&str, CellValue)>) -> RawRecord {
        RawRecord {
            location_key: Some(location.to_lowercase()),
            location: location.to_string(),
            period: period(),
            fields: fields
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
        }
    }

    fn hughes_mapping() -> ClientMapping {
        ClientMapping {
            client_name: "Hughes Group".to_string(),
            renames: BTreeMap::from([
                ("Okotoks Revenue".to_string(), "Total Revenue".to_string()),
                ("Barlow NE Revenue".to_string(), "Total Revenue".to_string()),
            ]),
            financial_columns: Default::default(),
        }
    }

    #[test]
    fn test_renames_to_standard_kpi() {
        let records = vec![
            raw_record("Okotoks", vec![("Okotoks Revenue", CellValue::from(45000.0))]),
            raw_record("Barlow NE", vec![("Barlow NE Revenue", CellValue::from(38000.0))]),
        ];
        let mapped = apply_mapping(records, &hughes_mapping());

        // Both locations now report under the same KPI column.
        for record in &mapped {
            assert_eq!(record.kpis.len(), 1);
            assert!(record.kpis.contains_key("Total Revenue"));
        }
        assert_eq!(mapped[0].kpis["Total Revenue"][0].source_field, "Okotoks Revenue");
        assert_eq!(
            mapped[0].kpis["Total Revenue"][0].value,
            CellValue::Number(45000.0)
        );
    }

    #[test]
    fn test_unmapped_field_keeps_source_name() {
        let records = vec![raw_record(
            "Okotoks",
            vec![("Okotoks Car Count", CellValue::from(812.0))],
        )];
        let mapped = apply_mapping(records, &hughes_mapping());
        assert!(mapped[0].kpis.contains_key("Okotoks Car Count"));
    }

    #[test]
    fn test_collision_within_one_record_yields_two_contributions() {
        let mut mapping = hughes_mapping();
        mapping.renames.insert(
            "Legal Fees".to_string(),
            "Professional Services".to_string(),
        );
        mapping.renames.insert(
            "Accounting Fees".to_string(),
            "Professional Services".to_string(),
        );

        let records = vec![raw_record(
            "Corporate",
            vec![
                ("Legal Fees", CellValue::from(300.0)),
                ("Accounting Fees", CellValue::from(450.0)),
            ],
        )];
        let mapped = apply_mapping(records, &mapping);

        let contributions = &mapped[0].kpis["Professional Services"];
        assert_eq!(contributions.len(), 2);
        let sources: Vec<&str> = contributions
            .iter()
            .map(|c| c.source_field.as_str())
            .collect();
        assert_eq!(sources, vec!["Accounting Fees", "Legal Fees"]);
    }

    #[test]
    fn test_mapping_set_prefers_exact_client() {
        let set = ClientMappingSet::from_rows(vec![
            MappingRow {
                client_name: "Hughes Group".to_string(),
                source_field: "Okotoks Revenue".to_string(),
                standard_field: "Total Revenue".to_string(),
            },
            MappingRow {
                client_name: GENERIC_CLIENT.to_string(),
                source_field: "Revenue".to_string(),
                standard_field: "Total Revenue".to_string(),
            },
        ]);
        assert_eq!(set.len(), 2);

        let hughes = set.for_client("Hughes Group");
        assert_eq!(hughes.standard_name("Okotoks Revenue"), "Total Revenue");
        assert_eq!(hughes.standard_name("Revenue"), "Revenue");
    }

    #[test]
    fn test_mapping_set_falls_back_to_generic_then_identity() {
        let set = ClientMappingSet::from_rows(vec![MappingRow {
            client_name: GENERIC_CLIENT.to_string(),
            source_field: "Revenue".to_string(),
            standard_field: "Total Revenue".to_string(),
        }]);

        let unknown = set.for_client("Sparkle Wash");
        assert_eq!(unknown.client_name, "Sparkle Wash");
        assert_eq!(unknown.standard_name("Revenue"), "Total Revenue");

        let empty_set = ClientMappingSet::default();
        let identity = empty_set.for_client("Sparkle Wash");
        assert_eq!(identity.client_name, "Sparkle Wash");
        assert_eq!(identity.standard_name("Revenue"), "Revenue");
    }

    #[test]
    fn test_mapping_set_loads_from_csv_file() {
        let path = std::env::temp_dir().join("pnl_normalizer_mapping_test.csv");
        std::fs::write(
            &path,
            "client_name,source_field,standard_field\n\
             Hughes Group,Okotoks Revenue,Total Revenue\n\
             Hughes Group,Barlow NE Revenue,Total Revenue\n",
        )
        .unwrap();

        let set = ClientMappingSet::from_csv_path(&path).unwrap();
        assert_eq!(set.len(), 1);
        let mapping = set.for_client("Hughes Group");
        assert_eq!(mapping.standard_name("Barlow NE Revenue"), "Total Revenue");

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_client_name_from_filename() {
        let cases = [
            ("Hughes Group Raw Data.xlsx", "Hughes Group"),
            ("Hughes Group Data.xls", "Hughes Group"),
            ("Sparkle Wash Dashboard_20240115.xlsx", "Sparkle Wash"),
            ("Acme Forecast Analysis_2024.csv", "Acme"),
            ("/exports/2024/Hughes Group Raw Data.xlsx", "Hughes Group"),
            ("Plain.xlsx", "Plain"),
            ("NoExtension", "NoExtension"),
            ("Dashboard_abc.xlsx", "Dashboard_abc"),
        ];
        for (input, expected) in cases {
            assert_eq!(client_name_from_filename(input), expected, "input: {}", input);
        }
    }
}
