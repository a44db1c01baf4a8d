use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::error::ApiError;

/// Ordered feature columns fixed at training time.
///
/// Cloning is cheap; every row produced against a schema shares its
/// column list.
#[derive(Debug, Clone)]
pub struct FeatureSchema {
    columns: Arc<[String]>,
    positions: Arc<HashMap<String, usize>>,
}

impl FeatureSchema {
    /// Builds a schema, rejecting empty lists, blank names and duplicates.
    pub fn new(columns: Vec<String>) -> Result<Self, ApiError> {
        if columns.is_empty() {
            return Err(ApiError::SchemaMismatch("feature schema is empty".into()));
        }

        let mut positions = HashMap::with_capacity(columns.len());
        for (i, name) in columns.iter().enumerate() {
            if name.trim().is_empty() {
                return Err(ApiError::SchemaMismatch(format!(
                    "column {i} has a blank name"
                )));
            }
            if positions.insert(name.clone(), i).is_some() {
                return Err(ApiError::SchemaMismatch(format!(
                    "column `{name}` appears more than once"
                )));
            }
        }

        Ok(Self {
            columns: columns.into(),
            positions: Arc::new(positions),
        })
    }

    /// Parses the `feature_columns.json` artifact: a JSON array of names.
    pub fn from_json(bytes: &[u8]) -> Result<Self, ApiError> {
        let columns: Vec<String> = serde_json::from_slice(bytes)
            .map_err(|e| ApiError::SchemaMismatch(format!("not a JSON list of names: {e}")))?;
        Self::new(columns)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn position(&self, column: &str) -> Option<usize> {
        self.positions.get(column).copied()
    }

    /// Categories of `field` that have an indicator column, in schema order.
    /// The reference category dropped at training never shows up here.
    pub fn categories(&self, field: &str) -> Vec<&str> {
        let prefix = format!("{field}_");
        let mut seen = HashSet::new();
        self.columns
            .iter()
            .filter_map(|c| c.strip_prefix(prefix.as_str()))
            .filter(|v| seen.insert(*v))
            .collect()
    }
}
