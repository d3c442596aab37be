// 🔬 Differ - Field-by-field comparison of matched records
//
// Ordinary fields compare as rendered strings (case-insensitive by default).
// Designated nested fields, e.g. "parameters", are compared structurally:
// lists by position, objects field by field, at any depth.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ============================================================================
// DIFFERENCE TYPES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordDifference {
    pub key: String,
    pub fields_only_in_a: Vec<String>,
    pub fields_only_in_b: Vec<String>,
    pub field_differences: Vec<FieldDifference>,
}

impl RecordDifference {
    pub fn is_empty(&self) -> bool {
        self.fields_only_in_a.is_empty()
            && self.fields_only_in_b.is_empty()
            && self.field_differences.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldDifference {
    /// Rendered values differ
    Value {
        field: String,
        value_a: Value,
        value_b: Value,
    },

    /// Structural differences inside a designated nested field
    Nested {
        field: String,
        differences: Vec<NestedDifference>,
    },
}

impl FieldDifference {
    pub fn field(&self) -> &str {
        match self {
            FieldDifference::Value { field, .. } | FieldDifference::Nested { field, .. } => field,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NestedDifference {
    /// An index present on one side only; the absent side is None
    Missing {
        index: usize,
        value_a: Option<Value>,
        value_b: Option<Value>,
    },

    /// Field-level differences between two nested objects
    Object {
        #[serde(skip_serializing_if = "Option::is_none")]
        index: Option<usize>,
        fields_only_in_a: Vec<String>,
        fields_only_in_b: Vec<String>,
        field_differences: Vec<FieldDifference>,
    },

    /// Shapes disagree, or two non-object elements differ
    WholeValue {
        #[serde(skip_serializing_if = "Option::is_none")]
        index: Option<usize>,
        value_a: Value,
        value_b: Value,
    },
}

// ============================================================================
// DIFFER
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct Differ {
    nested_fields: Vec<String>,
    case_sensitive: bool,
}

/// Coarse shape of a nested value; differing shapes never compare equal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Object,
    List,
    Scalar,
}

impl Shape {
    fn of(value: &Value) -> Self {
        match value {
            Value::Object(_) => Shape::Object,
            Value::Array(_) => Shape::List,
            Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => Shape::Scalar,
        }
    }
}

/// Outcome of comparing the fields of two objects
struct FieldComparison {
    only_in_a: Vec<String>,
    only_in_b: Vec<String>,
    differences: Vec<FieldDifference>,
}

impl FieldComparison {
    fn is_empty(&self) -> bool {
        self.only_in_a.is_empty() && self.only_in_b.is_empty() && self.differences.is_empty()
    }
}

impl Differ {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_nested_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.nested_fields.extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn with_case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    pub fn is_nested(&self, field: &str) -> bool {
        self.nested_fields.iter().any(|f| f == field)
    }

    /// Compare two matched records
    pub fn diff_record(&self, key: &str, a: &Map<String, Value>, b: &Map<String, Value>) -> RecordDifference {
        let comparison = self.compare_fields(a, b);

        RecordDifference {
            key: key.to_string(),
            fields_only_in_a: comparison.only_in_a,
            fields_only_in_b: comparison.only_in_b,
            field_differences: comparison.differences,
        }
    }

    /// Structural comparison of a designated nested field's two values
    pub fn diff_nested(&self, a: &Value, b: &Value) -> Vec<NestedDifference> {
        match (a, b) {
            (Value::Array(items_a), Value::Array(items_b)) => {
                let len = items_a.len().max(items_b.len());
                (0..len)
                    .filter_map(|index| match (items_a.get(index), items_b.get(index)) {
                        (Some(x), Some(y)) => self.diff_element(Some(index), x, y),
                        (x, y) => Some(NestedDifference::Missing {
                            index,
                            value_a: x.cloned(),
                            value_b: y.cloned(),
                        }),
                    })
                    .collect()
            }
            _ => self.diff_element(None, a, b).into_iter().collect(),
        }
    }

    fn diff_element(&self, index: Option<usize>, a: &Value, b: &Value) -> Option<NestedDifference> {
        match (a, b) {
            (Value::Object(map_a), Value::Object(map_b)) => {
                let comparison = self.compare_fields(map_a, map_b);
                if comparison.is_empty() {
                    return None;
                }
                Some(NestedDifference::Object {
                    index,
                    fields_only_in_a: comparison.only_in_a,
                    fields_only_in_b: comparison.only_in_b,
                    field_differences: comparison.differences,
                })
            }
            _ if Shape::of(a) == Shape::of(b) && self.values_equal(a, b) => None,
            _ => Some(NestedDifference::WholeValue {
                index,
                value_a: a.clone(),
                value_b: b.clone(),
            }),
        }
    }

    fn compare_fields(&self, a: &Map<String, Value>, b: &Map<String, Value>) -> FieldComparison {
        let only_in_a = a.keys().filter(|k| !b.contains_key(*k)).cloned().collect();
        let only_in_b = b.keys().filter(|k| !a.contains_key(*k)).cloned().collect();

        let mut differences = Vec::new();
        for (field, value_a) in a {
            let Some(value_b) = b.get(field) else {
                continue;
            };

            if self.is_nested(field) {
                let nested = self.diff_nested(value_a, value_b);
                if !nested.is_empty() {
                    differences.push(FieldDifference::Nested {
                        field: field.clone(),
                        differences: nested,
                    });
                }
            } else if !self.values_equal(value_a, value_b) {
                differences.push(FieldDifference::Value {
                    field: field.clone(),
                    value_a: value_a.clone(),
                    value_b: value_b.clone(),
                });
            }
        }

        FieldComparison {
            only_in_a,
            only_in_b,
            differences,
        }
    }

    fn values_equal(&self, a: &Value, b: &Value) -> bool {
        let (a, b) = (render_value(a), render_value(b));
        if self.case_sensitive {
            a == b
        } else {
            a.to_lowercase() == b.to_lowercase()
        }
    }
}

/// String form used for scalar comparison.
///
/// Strings render unquoted and null renders empty, so `null` and `""` compare
/// equal across stores.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

// ============================================================================
// TESTS
// ============================================================================
