// 📦 Record Sets - Pull the record array out of an export document
//
// Document-store exports are bare arrays. Relational exports are either bare
// arrays or an object keyed by collection name: {"Sellers": [...]}.

use serde_json::{Map, Value};

use crate::errors::{ComparatorError, Result};

/// One exported row/document: field name → value, in export order
pub type Record = Map<String, Value>;

/// One source's full export for one entity type
pub type RecordSet = Vec<Record>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedRecords {
    pub records: RecordSet,

    /// Position of each record in the source collection, parallel to `records`
    pub positions: Vec<usize>,

    /// Elements that were skipped because they are not objects
    pub skipped: Vec<ComparatorError>,
}

/// Select the record array from an export document.
///
/// With a collection name, an object wrapper is searched for that name (exact
/// first, then ignoring case). Without one, an object with exactly one
/// array-valued field is accepted.
pub fn extract_records(document: Value, collection: Option<&str>) -> Result<ExtractedRecords> {
    let items = match document {
        Value::Array(items) => items,
        Value::Object(map) => select_collection(map, collection)?,
        other => {
            return Err(ComparatorError::InvalidRecordSet {
                reason: format!(
                    "expected an array or an object, found {}",
                    crate::normalizer::value_kind(&other)
                ),
            })
        }
    };

    let mut extracted = ExtractedRecords::default();
    for (index, item) in items.into_iter().enumerate() {
        match item {
            Value::Object(record) => {
                extracted.records.push(record);
                extracted.positions.push(index);
            }
            _ => extracted.skipped.push(ComparatorError::InvalidRecord { index }),
        }
    }

    Ok(extracted)
}

impl ExtractedRecords {
    /// Source position of the record at `index` in `records`
    pub fn source_position(&self, index: usize) -> usize {
        self.positions.get(index).copied().unwrap_or(index)
    }
}

fn select_collection(mut map: Map<String, Value>, collection: Option<&str>) -> Result<Vec<Value>> {
    let name = match collection {
        Some(wanted) => map
            .keys()
            .find(|k| k.as_str() == wanted)
            .or_else(|| map.keys().find(|k| k.eq_ignore_ascii_case(wanted)))
            .cloned()
            .ok_or_else(|| ComparatorError::InvalidRecordSet {
                reason: format!("no collection named '{}'", wanted),
            })?,
        None => {
            let arrays: Vec<&String> = map
                .iter()
                .filter(|(_, v)| v.is_array())
                .map(|(k, _)| k)
                .collect();
            match arrays.as_slice() {
                [only] => (*only).clone(),
                _ => {
                    return Err(ComparatorError::InvalidRecordSet {
                        reason: format!(
                            "object wrapper holds {} arrays and no collection name was given",
                            arrays.len()
                        ),
                    })
                }
            }
        }
    };

    match map.remove(&name) {
        Some(Value::Array(items)) => Ok(items),
        Some(other) => Err(ComparatorError::InvalidRecordSet {
            reason: format!(
                "collection '{}' is {}, not an array",
                name,
                crate::normalizer::value_kind(&other)
            ),
        }),
        None => Err(ComparatorError::InvalidRecordSet {
            reason: format!("no collection named '{}'", name),
        }),
    }
}

/// Render records back into an export document (a bare array)
pub fn records_to_document(records: &RecordSet) -> Value {
    Value::Array(records.iter().cloned().map(Value::Object).collect())
}

// ============================================================================
// TESTS
// ============================================================================
