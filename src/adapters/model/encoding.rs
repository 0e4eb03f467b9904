//! Feature encoding: `PatientRecord` -> numeric feature vector.
//!
//! The artifact's `feature_columns` is the single source of truth for the
//! encoding. Each column is resolved once at load time:
//!
//! - `Age`, `RestingBP`, ... (numeric feature) -> the value itself
//! - `Sex_M`, `ST_Slope_Up`, ... -> one-hot indicator for that label
//! - `ST_Slope` (categorical feature) -> code from the artifact's `ordinal` map

use std::collections::BTreeMap;

use crate::domain::{FieldValue, PatientRecord, CATEGORICAL_FEATURES, FEATURE_NAMES};
use crate::ports::{InferenceError, ModelUnavailableError};

#[derive(Debug, Clone)]
enum Column {
    Numeric { field: usize },
    OneHot { field: usize, label: String },
    Ordinal { field: usize, codes: BTreeMap<String, f64> },
}

impl Column {
    fn field(&self) -> usize {
        match self {
            Self::Numeric { field } | Self::OneHot { field, .. } | Self::Ordinal { field, .. } => {
                *field
            }
        }
    }
}

fn categorical_labels(field: &str) -> Option<&'static [&'static str]> {
    CATEGORICAL_FEATURES
        .iter()
        .find(|(name, _)| *name == field)
        .map(|(_, labels)| *labels)
}

fn field_index(name: &str) -> Option<usize> {
    FEATURE_NAMES.iter().position(|n| *n == name)
}

/// Encodes records into the column layout a model artifact declares.
#[derive(Debug, Clone)]
pub struct FeatureEncoder {
    columns: Vec<Column>,
    /// Labels seen at training time, per categorical field.
    known_labels: BTreeMap<usize, Vec<String>>,
}

impl FeatureEncoder {
    /// Resolve artifact columns against the patient schema.
    ///
    /// # Errors
    /// Returns `ModelUnavailableError::Incompatible` if a column cannot be
    /// produced from a `PatientRecord`, or a record feature is never used.
    pub fn resolve(
        feature_columns: &[String],
        categories: &BTreeMap<String, Vec<String>>,
        ordinal: &BTreeMap<String, BTreeMap<String, f64>>,
    ) -> Result<Self, ModelUnavailableError> {
        if feature_columns.is_empty() {
            return Err(ModelUnavailableError::Malformed(
                "feature_columns is empty".into(),
            ));
        }

        let mut columns = Vec::with_capacity(feature_columns.len());
        for (i, name) in feature_columns.iter().enumerate() {
            if feature_columns[..i].contains(name) {
                return Err(ModelUnavailableError::Malformed(format!(
                    "duplicate feature column {name}"
                )));
            }
            columns.push(Self::resolve_column(name, ordinal)?);
        }

        for (idx, field) in FEATURE_NAMES.iter().enumerate() {
            if !columns.iter().any(|c| c.field() == idx) {
                return Err(ModelUnavailableError::Incompatible(format!(
                    "no column encodes feature {field}"
                )));
            }
        }

        let mut known_labels = BTreeMap::new();
        for (field, labels) in categories {
            let allowed = categorical_labels(field).ok_or_else(|| {
                ModelUnavailableError::Incompatible(format!(
                    "categories given for non-categorical feature {field}"
                ))
            })?;
            if let Some(bad) = labels.iter().find(|l| !allowed.iter().any(|a| a == l)) {
                return Err(ModelUnavailableError::Incompatible(format!(
                    "{field} category '{bad}' is not a valid label"
                )));
            }
            // field_index cannot fail for a categorical feature name.
            if let Some(idx) = field_index(field) {
                known_labels.insert(idx, labels.clone());
            }
        }

        Ok(Self {
            columns,
            known_labels,
        })
    }

    fn resolve_column(
        name: &str,
        ordinal: &BTreeMap<String, BTreeMap<String, f64>>,
    ) -> Result<Column, ModelUnavailableError> {
        if let Some(field) = field_index(name) {
            if categorical_labels(name).is_none() {
                return Ok(Column::Numeric { field });
            }
            let codes = ordinal.get(name).ok_or_else(|| {
                ModelUnavailableError::Incompatible(format!(
                    "column {name} is categorical but has no ordinal mapping"
                ))
            })?;
            return Ok(Column::Ordinal {
                field,
                codes: codes.clone(),
            });
        }

        for (field_name, labels) in CATEGORICAL_FEATURES {
            let Some(label) = name
                .strip_prefix(field_name)
                .and_then(|rest| rest.strip_prefix('_'))
            else {
                continue;
            };
            if !labels.iter().any(|l| *l == label) {
                return Err(ModelUnavailableError::Incompatible(format!(
                    "column {name}: '{label}' is not a {field_name} label"
                )));
            }
            if let Some(field) = field_index(field_name) {
                return Ok(Column::OneHot {
                    field,
                    label: label.to_string(),
                });
            }
        }

        Err(ModelUnavailableError::Incompatible(format!(
            "unknown feature column {name}"
        )))
    }

    /// Number of encoded columns.
    #[must_use]
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Encode one record.
    ///
    /// # Errors
    /// Returns `InferenceError::UnseenCategory` for labels the model never saw.
    pub fn encode(&self, record: &PatientRecord) -> Result<Vec<f64>, InferenceError> {
        let fields = record.fields();

        for (&idx, labels) in &self.known_labels {
            let (name, value) = fields[idx];
            if let FieldValue::Category(label) = value {
                if !labels.iter().any(|l| l == label) {
                    return Err(InferenceError::UnseenCategory {
                        field: name.to_string(),
                        value: label.to_string(),
                    });
                }
            }
        }

        self.columns
            .iter()
            .map(|column| {
                let (name, value) = fields[column.field()];
                match (column, value) {
                    (Column::Numeric { .. }, FieldValue::Number(x)) => Ok(x),
                    (Column::OneHot { label, .. }, FieldValue::Category(actual)) => {
                        Ok(if label == actual { 1.0 } else { 0.0 })
                    }
                    (Column::Ordinal { codes, .. }, FieldValue::Category(actual)) => codes
                        .get(actual)
                        .copied()
                        .ok_or_else(|| InferenceError::UnseenCategory {
                            field: name.to_string(),
                            value: actual.to_string(),
                        }),
                    _ => Err(InferenceError::SchemaMismatch(format!(
                        "column for {name} does not match its value type"
                    ))),
                }
            })
            .collect()
    }
}
