use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use crate::error::Result;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct LocationEntry {
    #[schemars(
        description = "Short stable identifier for the location (e.g., 'okotoks'). Used internally for classification; never shown in output."
    )]
    pub key: String,

    #[schemars(
        description = "Display name written to the Location output column (e.g., 'Okotoks'). Must be unique across the registry."
    )]
    pub name: String,

    #[schemars(
        description = "Source field names owned by this location (e.g., 'Okotoks Revenue', 'Okotoks Labour'). A field listed here is emitted only on this location's records."
    )]
    pub fields: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct LocationRegistry {
    #[schemars(
        description = "All physical locations for this client. Must be non-empty; keys and display names must each be unique."
    )]
    pub locations: Vec<LocationEntry>,

    #[serde(default = "default_corporate_name")]
    #[schemars(
        description = "Display name for the synthetic record that carries business-wide and unclassified fields. Defaults to 'Corporate'."
    )]
    pub corporate_name: String,

    #[serde(default)]
    #[schemars(
        description = "Field names that belong to the business as a whole rather than any single location (e.g., 'Professional Fees', 'Administrative'). Routed to the corporate record without a warning."
    )]
    pub shared_fields: Vec<String>,
}

fn default_corporate_name() -> String {
    "Corporate".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClientMapping {
    #[schemars(
        description = "Client this mapping belongs to (e.g., 'Hughes Group'). Matched against the client name derived from an input's filename when selecting a mapping."
    )]
    pub client_name: String,

    #[serde(default)]
    #[schemars(
        description = "Source-field to standard-KPI renames (e.g., 'Okotoks Revenue' -> 'Total Revenue'). Fields from different locations that rename to the same KPI share one output column. Fields without an entry keep their source name."
    )]
    pub renames: BTreeMap<String, String>,

    #[serde(default)]
    #[schemars(
        description = "Standard column names whose values must be numeric. Values in these columns are stripped of currency symbols and separators before parsing, and blanks become 0. Leave empty to treat every column as financial."
    )]
    pub financial_columns: BTreeSet<String>,
}

impl ClientMapping {
    /// Standard output name for a source field: the rename target if one
    /// exists, otherwise the source name unchanged.
    pub fn standard_name<'a>(&'a self, source_field: &'a str) -> &'a str {
        self.renames
            .get(source_field)
            .map(String::as_str)
            .unwrap_or(source_field)
    }

    /// An empty designation set means every column is financial.
    pub fn is_financial(&self, standard_name: &str) -> bool {
        self.financial_columns.is_empty() || self.financial_columns.contains(standard_name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "PascalCase", tag = "mode")]
pub enum Tolerance {
    #[schemars(
        description = "Difference allowed in absolute currency units: declared and computed totals match when |declared - computed| <= value. Use for small fixed rounding allowances."
    )]
    Absolute {
        #[schemars(description = "Maximum permitted absolute difference. Must be non-negative.")]
        value: f64,
    },

    #[schemars(
        description = "Difference allowed as a fraction of the larger total's magnitude (e.g., 0.001 permits 0.1% drift). Use when source values are rounded proportionally."
    )]
    Relative {
        #[schemars(description = "Maximum permitted difference as a fraction. Must be non-negative.")]
        ratio: f64,
    },
}

impl Default for Tolerance {
    fn default() -> Self {
        Tolerance::Absolute { value: 0.01 }
    }
}

impl Tolerance {
    /// Largest difference this tolerance permits for the given pair.
    pub fn limit_for(&self, declared: f64, computed: f64) -> f64 {
        match self {
            Tolerance::Absolute { value } => *value,
            Tolerance::Relative { ratio } => ratio * declared.abs().max(computed.abs()),
        }
    }

    pub fn allows(&self, declared: f64, computed: f64) -> bool {
        (declared - computed).abs() <= self.limit_for(declared, computed)
    }

    pub fn magnitude(&self) -> f64 {
        match self {
            Tolerance::Absolute { value } => *value,
            Tolerance::Relative { ratio } => *ratio,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ReconciliationRule {
    #[schemars(
        description = "Standard column carrying the consolidated total declared in the source (e.g., 'Total Sales')."
    )]
    pub total_field: String,

    #[schemars(
        description = "Standard columns whose values, summed across every location for a period, should reproduce the declared total. A column absent from a record contributes 0."
    )]
    pub component_fields: Vec<String>,

    #[serde(default)]
    #[schemars(
        description = "Permitted difference between declared and computed totals. Defaults to one cent absolute."
    )]
    pub tolerance: Tolerance,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct NormalizerConfig {
    #[schemars(description = "Field renames and financial-column designations for this client.")]
    pub client: ClientMapping,

    #[schemars(description = "The client's locations and their owned source fields.")]
    pub locations: LocationRegistry,

    #[schemars(
        description = "Last date treated as historical actuals. Periods on or before this date are tagged ACTUAL; later periods are tagged FORECAST."
    )]
    pub forecast_cutoff: NaiveDate,

    #[serde(default)]
    #[schemars(
        description = "Optional cross-location consistency check, run after normalization. Mismatches are reported, never fatal."
    )]
    pub reconciliation: Option<ReconciliationRule>,
}

impl NormalizerConfig {
    /// Loads a config from a JSON file. Configuration lives outside the
    /// binary so a new client chain onboards without a code change.
    pub fn from_json_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(NormalizerConfig)
    }

    pub fn schema_as_json() -> serde_json::Result<String> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}
