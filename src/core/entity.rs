//! Entity records and per-node entity collections.
//!
//! Entities are deduplicated by [`identity_key`]: the name case-folded with
//! runs of whitespace collapsed to a single space and trimmed. The stored
//! name itself is never rewritten.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::AgentError;

/// Attribute map of an entity. Keys are unique by construction.
pub type Attributes = BTreeMap<String, serde_json::Value>;

/// A single extracted entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    /// Entity name as extracted.
    pub name: String,
    /// Extracted attributes.
    #[serde(default)]
    pub attributes: Attributes,
    /// Where the information came from (URL, publication, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl EntityRecord {
    /// Creates a record with no attributes and no source.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Attributes::new(),
            source: None,
        }
    }

    /// Adds an attribute, replacing any previous value for `key`.
    #[must_use]
    pub fn with_attribute(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Sets the source.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Returns the deduplication key for this record.
    #[must_use]
    pub fn identity_key(&self) -> String {
        identity_key(&self.name)
    }
}

/// Normalizes an entity name into its deduplication key.
///
/// `" Acme   Corp "` and `"acme corp"` both map to `"acme corp"`.
#[must_use]
pub fn identity_key(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Entities extracted from one narrative answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityCollection {
    /// Extracted entities in extraction order.
    pub entities: Vec<EntityRecord>,
    /// Entity type that was requested.
    pub entity_type: String,
    /// Extractor's own estimate of how complete the list is, in `[0, 1]`.
    pub completeness_score: f64,
}

impl EntityCollection {
    /// The collection used whenever extraction could not produce a valid
    /// result.
    #[must_use]
    pub fn empty(entity_type: impl Into<String>) -> Self {
        Self {
            entities: Vec::new(),
            entity_type: entity_type.into(),
            completeness_score: 0.0,
        }
    }

    /// Number of entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns `true` when no entities were extracted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Checks the collection field by field.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Validation`] naming the first violated rule:
    /// blank entity type, score outside `[0, 1]`, blank entity name, or
    /// blank attribute key.
    pub fn validate(&self) -> Result<(), AgentError> {
        if self.entity_type.trim().is_empty() {
            return Err(validation("entity_type is empty"));
        }
        if !self.completeness_score.is_finite() || !(0.0..=1.0).contains(&self.completeness_score)
        {
            return Err(validation(format!(
                "completeness_score {} outside [0, 1]",
                self.completeness_score
            )));
        }
        for (idx, entity) in self.entities.iter().enumerate() {
            if entity.name.trim().is_empty() {
                return Err(validation(format!("entity {idx} has an empty name")));
            }
            if entity.attributes.keys().any(|k| k.trim().is_empty()) {
                return Err(validation(format!(
                    "entity {:?} has an empty attribute key",
                    entity.name
                )));
            }
        }
        Ok(())
    }
}

/// Final deduplicated entity set of a search session.
///
/// One record per distinct identity key, in first-seen order. Built only by
/// the entity merger.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MergedEntitySet {
    pub(crate) entities: Vec<EntityRecord>,
}

impl MergedEntitySet {
    /// Number of distinct entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns `true` when nothing was found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Iterates over the merged records in first-seen order.
    pub fn iter(&self) -> std::slice::Iter<'_, EntityRecord> {
        self.entities.iter()
    }

    /// Looks up a record by any spelling of its name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&EntityRecord> {
        let key = identity_key(name);
        self.entities.iter().find(|e| e.identity_key() == key)
    }

    /// Borrows the records as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[EntityRecord] {
        &self.entities
    }

    /// Consumes the set, returning the records.
    #[must_use]
    pub fn into_vec(self) -> Vec<EntityRecord> {
        self.entities
    }
}

impl<'a> IntoIterator for &'a MergedEntitySet {
    type Item = &'a EntityRecord;
    type IntoIter = std::slice::Iter<'a, EntityRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.entities.iter()
    }
}

fn validation(message: impl Into<String>) -> AgentError {
    AgentError::Validation {
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(" Acme Corp ", "acme corp" ; "surrounding whitespace")]
    #[test_case("acme corp", "acme corp" ; "already normalized")]
    #[test_case("ACME\t\n  Corp", "acme corp" ; "inner whitespace runs")]
    #[test_case("Société Générale", "société générale" ; "non ascii")]
    #[test_case("   ", "" ; "blank")]
    fn test_identity_key(name: &str, expected: &str) {
        assert_eq!(identity_key(name), expected);
    }

    #[test]
    fn test_record_builder() {
        let record = EntityRecord::new("Acme")
            .with_attribute("hq", "Berlin")
            .with_attribute("employees", 1200)
            .with_source("https://example.com/acme");
        assert_eq!(record.attributes.len(), 2);
        assert_eq!(record.attributes["employees"], serde_json::json!(1200));
        assert_eq!(record.identity_key(), "acme");
    }

    #[test]
    fn test_record_deserialization_defaults() {
        let record: EntityRecord =
            serde_json::from_str(r#"{"name": "Acme"}"#).unwrap_or_else(|_| unreachable!());
        assert!(record.attributes.is_empty());
        assert!(record.source.is_none());
    }

    #[test]
    fn test_empty_collection() {
        let empty = EntityCollection::empty("company");
        assert!(empty.is_empty());
        assert!(empty.completeness_score.abs() < f64::EPSILON);
        assert!(empty.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_score() {
        let mut collection = EntityCollection::empty("company");
        collection.completeness_score = 1.5;
        assert!(matches!(
            collection.validate(),
            Err(AgentError::Validation { .. })
        ));
        collection.completeness_score = f64::NAN;
        assert!(collection.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_blank_name_and_key() {
        let mut collection = EntityCollection::empty("company");
        collection.entities.push(EntityRecord::new("  "));
        assert!(collection.validate().is_err());

        collection.entities = vec![EntityRecord::new("Acme").with_attribute(" ", "x")];
        assert!(collection.validate().is_err());
    }

    #[test]
    fn test_merged_set_lookup_by_any_spelling() {
        let set = MergedEntitySet {
            entities: vec![EntityRecord::new(" Acme Corp ")],
        };
        assert_eq!(set.len(), 1);
        assert!(set.get("ACME   corp").is_some());
        assert!(set.get("Globex").is_none());
        let json = serde_json::to_value(&set).unwrap_or_default();
        assert!(json.is_array());
    }

    #[test]
    fn test_validate_rejects_blank_type() {
        let collection = EntityCollection::empty("");
        assert!(collection.validate().is_err());
    }
}
