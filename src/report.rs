use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Recoverable data-quality findings. None of these abort a run; they are
/// accumulated and returned alongside the output so a human can follow up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// A non-empty column header did not parse as a date; the column was
    /// skipped from the period sequence.
    NonDateHeader,
    /// Two rows carry the same label; the later row's values won.
    DuplicateRowLabel,
    /// A field matched no location list and no shared list; it was routed
    /// to the corporate record by default.
    UnclassifiedField,
    /// A financial cell failed numeric coercion and became missing.
    NonNumericValue,
    /// Location components did not sum to the declared consolidated total
    /// within tolerance.
    ReconciliationMismatch,
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IssueKind::NonDateHeader => "non_date_header",
            IssueKind::DuplicateRowLabel => "duplicate_row_label",
            IssueKind::UnclassifiedField => "unclassified_field",
            IssueKind::NonNumericValue => "non_numeric_value",
            IssueKind::ReconciliationMismatch => "reconciliation_mismatch",
        };
        write!(f, "{}", s)
    }
}

/// One finding, tagged with as much record identity as the pipeline stage
/// that raised it had available.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityIssue {
    pub kind: IssueKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub detail: String,
}

impl fmt::Display for QualityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        let mut identity = Vec::new();
        if let Some(loc) = &self.location {
            identity.push(loc.clone());
        }
        if let Some(date) = &self.date {
            identity.push(date.format("%Y-%m-%d").to_string());
        }
        if let Some(field) = &self.field {
            identity.push(format!("'{}'", field));
        }
        if !identity.is_empty() {
            write!(f, " [{}]", identity.join(" / "))?;
        }
        write!(f, ": {}", self.detail)
    }
}

/// Ordered accumulator for data-quality findings over one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub issues: Vec<QualityIssue>,
}

impl QualityReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, issue: QualityIssue) {
        self.issues.push(issue);
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn of_kind(&self, kind: IssueKind) -> impl Iterator<Item = &QualityIssue> {
        self.issues.iter().filter(move |i| i.kind == kind)
    }

    pub fn count_of(&self, kind: IssueKind) -> usize {
        self.of_kind(kind).count()
    }
}
