// 🔗 Matcher - Pair records across sources by key
//
// Keys are rendered to strings and lower-cased before any set operation.
// Duplicate keys are counted, never rejected; when a key repeats, the FIRST
// record carrying it is the one compared (known limitation, kept on purpose).

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ComparatorError;
use crate::record_set::{Record, RecordSet};

// ============================================================================
// KEY FIELDS
// ============================================================================

/// Key field name on each side; the two stores may spell it differently
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyFields {
    pub a: String,
    pub b: String,
}

impl KeyFields {
    pub fn new(a: &str, b: &str) -> Self {
        KeyFields {
            a: a.to_string(),
            b: b.to_string(),
        }
    }

    pub fn same(field: &str) -> Self {
        Self::new(field, field)
    }
}

/// Case-normalized string form of a key value; `None` for null
pub fn render_key(value: &Value) -> Option<String> {
    let rendered = match value {
        Value::Null => return None,
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    };
    Some(rendered.to_lowercase())
}

// ============================================================================
// KEY INDEX
// ============================================================================

/// Keys of one record set, in first-appearance order
#[derive(Debug, Clone, Default)]
pub struct KeyIndex {
    keys: Vec<String>,
    first: HashMap<String, usize>,
    counts: HashMap<String, usize>,
    missing: Vec<ComparatorError>,
}

impl KeyIndex {
    pub fn build(records: &RecordSet, field: &str) -> Self {
        let mut index = KeyIndex::default();

        for (position, record) in records.iter().enumerate() {
            let Some(key) = record.get(field).and_then(render_key) else {
                index.missing.push(ComparatorError::MissingKeyField {
                    field: field.to_string(),
                    index: position,
                });
                continue;
            };

            let count = index.counts.entry(key.clone()).or_insert(0);
            *count += 1;
            if *count == 1 {
                index.first.insert(key.clone(), position);
                index.keys.push(key);
            }
        }

        index
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn contains(&self, key: &str) -> bool {
        self.first.contains_key(key)
    }

    /// Position of the first record carrying `key`
    pub fn first_index(&self, key: &str) -> Option<usize> {
        self.first.get(key).copied()
    }

    /// Keys occurring more than once, with their occurrence count
    pub fn duplicates(&self) -> BTreeMap<String, usize> {
        self.counts
            .iter()
            .filter(|(_, count)| **count > 1)
            .map(|(key, count)| (key.clone(), *count))
            .collect()
    }

    /// Records skipped because the key field is absent or null
    pub fn missing(&self) -> &[ComparatorError] {
        &self.missing
    }
}

/// Duplicate keys of a record set
pub fn duplicates_of(records: &RecordSet, field: &str) -> BTreeMap<String, usize> {
    KeyIndex::build(records, field).duplicates()
}

// ============================================================================
// MATCH RESULT
// ============================================================================

#[derive(Debug, Clone)]
pub struct MatchResult {
    pub duplicates_in_a: BTreeMap<String, usize>,
    pub duplicates_in_b: BTreeMap<String, usize>,

    /// keys(A) − keys(B), in A order
    pub only_in_a: Vec<String>,

    /// keys(B) − keys(A), in B order
    pub only_in_b: Vec<String>,

    /// keys(A) ∩ keys(B), in A order
    pub matched: Vec<String>,

    pub missing_in_a: Vec<ComparatorError>,
    pub missing_in_b: Vec<ComparatorError>,

    index_a: KeyIndex,
    index_b: KeyIndex,
}

impl MatchResult {
    /// Matched keys with the first record for each key on both sides
    pub fn pairs<'r>(
        &'r self,
        a: &'r RecordSet,
        b: &'r RecordSet,
    ) -> impl Iterator<Item = (&'r str, &'r Record, &'r Record)> + 'r {
        self.matched.iter().filter_map(move |key| {
            let record_a = a.get(self.index_a.first_index(key)?)?;
            let record_b = b.get(self.index_b.first_index(key)?)?;
            Some((key.as_str(), record_a, record_b))
        })
    }

    pub fn summary(&self) -> String {
        format!(
            "{} matched, {} only in A, {} only in B, {} duplicated in A, {} duplicated in B",
            self.matched.len(),
            self.only_in_a.len(),
            self.only_in_b.len(),
            self.duplicates_in_a.len(),
            self.duplicates_in_b.len()
        )
    }
}

// ============================================================================
// MATCHING
// ============================================================================

pub fn match_records(a: &RecordSet, b: &RecordSet, key_fields: &KeyFields) -> MatchResult {
    let index_a = KeyIndex::build(a, &key_fields.a);
    let index_b = KeyIndex::build(b, &key_fields.b);

    let keys_b: HashSet<&str> = index_b.keys().iter().map(String::as_str).collect();

    let (matched, only_in_a): (Vec<String>, Vec<String>) = index_a
        .keys()
        .iter()
        .cloned()
        .partition(|key| keys_b.contains(key.as_str()));

    let only_in_b: Vec<String> = index_b
        .keys()
        .iter()
        .filter(|key| !index_a.contains(key))
        .cloned()
        .collect();

    let result = MatchResult {
        duplicates_in_a: index_a.duplicates(),
        duplicates_in_b: index_b.duplicates(),
        only_in_a,
        only_in_b,
        matched,
        missing_in_a: index_a.missing().to_vec(),
        missing_in_b: index_b.missing().to_vec(),
        index_a,
        index_b,
    };

    tracing::debug!(
        key_a = key_fields.a.as_str(),
        key_b = key_fields.b.as_str(),
        "{}",
        result.summary()
    );

    result
}

// ============================================================================
// TESTS
// ============================================================================
