use std::collections::BTreeMap;

use crate::error::{NormalizerError, Result};
use crate::schema::LocationRegistry;

/// Routing decision for one source field name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Owned by exactly one location, identified by its registry key.
    Location(String),
    /// Business-wide; routed to the corporate record.
    Shared,
    /// Not in the registry. Routed to the corporate record with a warning.
    Unlisted,
}

/// Field-to-owner lookup built once per run from the location registry.
/// Construction fails if any field name is claimed by two owners, since a
/// double-counted field would silently inflate downstream aggregates.
#[derive(Debug, Clone)]
pub struct FieldClassifier {
    owners: BTreeMap<String, Classification>,
}

impl FieldClassifier {
    pub fn new(registry: &LocationRegistry) -> Result<Self> {
        let mut owners: BTreeMap<String, (Classification, String)> = BTreeMap::new();

        for location in &registry.locations {
            for field in &location.fields {
                Self::register(
                    &mut owners,
                    field,
                    Classification::Location(location.key.clone()),
                    &location.name,
                )?;
            }
        }
        for field in &registry.shared_fields {
            Self::register(&mut owners, field, Classification::Shared, "the shared list")?;
        }

        Ok(FieldClassifier {
            owners: owners
                .into_iter()
                .map(|(field, (class, _))| (field, class))
                .collect(),
        })
    }

    fn register(
        owners: &mut BTreeMap<String, (Classification, String)>,
        field: &str,
        class: Classification,
        owner_label: &str,
    ) -> Result<()> {
        let field = field.trim();
        if field.is_empty() {
            return Ok(());
        }
        match owners.get(field) {
            // Listing a field twice under the same owner is redundant, not ambiguous.
            Some((existing, first)) if *existing != class => Err(NormalizerError::AmbiguousField {
                field: field.to_string(),
                first: first.clone(),
                second: owner_label.to_string(),
            }),
            _ => {
                owners.insert(field.to_string(), (class, owner_label.to_string()));
                Ok(())
            }
        }
    }

    /// Exact match on the trimmed field name. Matching is case-sensitive:
    /// registries list fields exactly as the source spreadsheets spell them.
    pub fn classify(&self, field_name: &str) -> Classification {
        self.owners
            .get(field_name.trim())
            .cloned()
            .unwrap_or(Classification::Unlisted)
    }
}
