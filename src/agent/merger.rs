//! Entity deduplication across a finished result tree.
//!
//! The merger runs once, after every branch has joined. It walks the tree
//! in [`ResultTree::canonical_order`], so its output never depends on which
//! branch completed first.
//!
//! Merge policy, per identity key:
//! - the first record seen keeps its name spelling and its source
//! - attributes are unioned; for a key present in both records the value
//!   already stored wins

use std::collections::HashMap;
use std::collections::btree_map::Entry;

use crate::core::{EntityRecord, MergedEntitySet, ResultTree};

/// Folds every node's entity collection into one deduplicated set.
#[derive(Debug, Clone, Copy, Default)]
pub struct EntityMerger;

impl EntityMerger {
    /// Merges the entities of every node in `tree`.
    #[must_use]
    pub fn merge(tree: &ResultTree) -> MergedEntitySet {
        Self::merge_records(
            tree.canonical_order()
                .into_iter()
                .flat_map(|node| node.entities.entities.iter()),
        )
    }

    /// Merges records in the given order.
    #[must_use]
    pub fn merge_records<'a, I>(records: I) -> MergedEntitySet
    where
        I: IntoIterator<Item = &'a EntityRecord>,
    {
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut merged: Vec<EntityRecord> = Vec::new();

        for record in records {
            let key = record.identity_key();
            if key.is_empty() {
                continue;
            }
            match index.get(&key) {
                Some(&slot) => absorb(&mut merged[slot], record),
                None => {
                    index.insert(key, merged.len());
                    merged.push(record.clone());
                }
            }
        }

        MergedEntitySet { entities: merged }
    }
}

/// Adds the attributes of `incoming` that `existing` does not have yet.
fn absorb(existing: &mut EntityRecord, incoming: &EntityRecord) {
    for (key, value) in &incoming.attributes {
        if let Entry::Vacant(slot) = existing.attributes.entry(key.clone()) {
            slot.insert(value.clone());
        }
    }
    if existing.source.is_none() {
        existing.source.clone_from(&incoming.source);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{EntityCollection, Evaluation, QueryNode, RawAnswer, SourceKind};
    use serde_json::json;
    use std::time::Duration;

    fn node_with(node: QueryNode, records: Vec<EntityRecord>) -> ResultTree {
        let mut entities = EntityCollection::empty("company");
        entities.entities = records;
        ResultTree::completed(
            node,
            RawAnswer {
                content: String::new(),
                elapsed_time: Duration::ZERO,
                source_kind: SourceKind::Live,
            },
            entities,
            Evaluation::comprehensive(),
        )
    }

    #[test]
    fn test_case_and_whitespace_variants_merge() {
        let a = EntityRecord::new("Acme Corp").with_attribute("founded", json!(1999));
        let b = EntityRecord::new("  acme   CORP ").with_attribute("hq", json!("Berlin"));
        let merged = EntityMerger::merge_records([&a, &b]);

        assert_eq!(merged.len(), 1);
        let acme = merged.get("ACME corp").unwrap_or_else(|| unreachable!());
        assert_eq!(acme.name, "Acme Corp");
        assert_eq!(acme.attributes["founded"], json!(1999));
        assert_eq!(acme.attributes["hq"], json!("Berlin"));
    }

    #[test]
    fn test_first_value_wins_on_conflict() {
        let a = EntityRecord::new("Acme").with_attribute("hq", json!("Berlin"));
        let b = EntityRecord::new("acme").with_attribute("hq", json!("Paris"));
        let merged = EntityMerger::merge_records([&a, &b]);
        assert_eq!(merged.as_slice()[0].attributes["hq"], json!("Berlin"));
    }

    #[test]
    fn test_source_backfilled() {
        let a = EntityRecord::new("Acme");
        let b = EntityRecord::new("ACME").with_source("https://acme.example");
        let merged = EntityMerger::merge_records([&a, &b]);
        assert_eq!(
            merged.as_slice()[0].source.as_deref(),
            Some("https://acme.example")
        );
    }

    #[test]
    fn test_blank_names_skipped() {
        let blank = EntityRecord::new("   ");
        let merged = EntityMerger::merge_records([&blank]);
        assert!(merged.is_empty());
    }

    #[test]
    fn test_merge_uses_canonical_order() {
        let root = QueryNode::root("root");
        let mut tree = node_with(root.clone(), vec![]);

        // Inserted out of order; "a" still merges before "b".
        tree.children.insert(
            "b".to_string(),
            node_with(
                root.child("b"),
                vec![EntityRecord::new("ACME").with_attribute("hq", json!("Paris"))],
            ),
        );
        tree.children.insert(
            "a".to_string(),
            node_with(
                root.child("a"),
                vec![EntityRecord::new("Acme").with_attribute("hq", json!("Berlin"))],
            ),
        );

        let merged = EntityMerger::merge(&tree);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged.as_slice()[0].name, "Acme");
        assert_eq!(merged.as_slice()[0].attributes["hq"], json!("Berlin"));
    }

    #[test]
    fn test_merge_is_idempotent() {
        let records = vec![
            EntityRecord::new("Acme").with_attribute("a", json!(1)),
            EntityRecord::new("Globex"),
            EntityRecord::new("acme").with_attribute("b", json!(2)),
        ];
        let once = EntityMerger::merge_records(&records);
        let twice = EntityMerger::merge_records(once.iter());
        assert_eq!(once, twice);
    }
}
