// 🧹 Normalizer - Bring both exports to a common shape
//
// Rules are declared per entity and per source, never sniffed:
//   RenameField            → "_id" becomes the relational key name
//   ParseEmbeddedJson      → stringified nested data becomes a real tree
//   DecodeBinaryIdentifiers → base64 UUID wrappers become canonical strings
//
// Failures stay local: the value is left as it was and a warning is recorded.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{ComparatorError, ReportWarning};
use crate::identifier::{decode_identifier, UuidRepresentation};
use crate::record_set::{Record, RecordSet};

// ============================================================================
// SOURCE KIND
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    /// Document-store export (side A)
    DocumentStore,
    /// Relational export (side B)
    Relational,
}

impl SourceKind {
    pub fn label(&self) -> &'static str {
        match self {
            SourceKind::DocumentStore => "Document store",
            SourceKind::Relational => "Relational",
        }
    }
}

// ============================================================================
// NORMALIZATION RULES
// ============================================================================

/// Shape a string-encoded field is expected to parse into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmbeddedShape {
    Array,
    Object,
    /// Either an array or an object
    Any,
}

impl EmbeddedShape {
    fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (EmbeddedShape::Array, Value::Array(_)) => true,
            (EmbeddedShape::Object, Value::Object(_)) => true,
            (EmbeddedShape::Any, Value::Array(_) | Value::Object(_)) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum NormalizationRule {
    /// Rename a field in place, keeping its position
    RenameField { from: String, to: String },

    /// Parse a field holding serialized JSON
    ParseEmbeddedJson { field: String, shape: EmbeddedShape },

    /// Replace binary identifier wrappers at any depth
    DecodeBinaryIdentifiers,
}

impl NormalizationRule {
    pub fn rename(from: &str, to: &str) -> Self {
        NormalizationRule::RenameField {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    pub fn parse_embedded(field: &str, shape: EmbeddedShape) -> Self {
        NormalizationRule::ParseEmbeddedJson {
            field: field.to_string(),
            shape,
        }
    }

    // Renames first so later rules see final names, decoding last so it
    // also reaches trees produced by parsing.
    fn stage(&self) -> u8 {
        match self {
            NormalizationRule::RenameField { .. } => 0,
            NormalizationRule::ParseEmbeddedJson { .. } => 1,
            NormalizationRule::DecodeBinaryIdentifiers => 2,
        }
    }
}

// ============================================================================
// NORMALIZATION SUMMARY
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizationSummary {
    pub records: usize,
    pub identifiers_decoded: usize,
    pub fields_renamed: usize,
    pub fields_parsed: usize,
    pub warnings: Vec<ReportWarning>,
}

impl NormalizationSummary {
    /// Whether normalization changed anything at all
    pub fn changed(&self) -> bool {
        self.identifiers_decoded + self.fields_renamed + self.fields_parsed > 0
    }

    pub fn summary(&self) -> String {
        format!(
            "{} records: {} identifiers decoded, {} fields renamed, {} fields parsed, {} warnings",
            self.records,
            self.identifiers_decoded,
            self.fields_renamed,
            self.fields_parsed,
            self.warnings.len()
        )
    }
}

// ============================================================================
// NORMALIZER
// ============================================================================

pub struct Normalizer {
    source: SourceKind,
    rules: Vec<NormalizationRule>,
    legacy_uuid: UuidRepresentation,
}

impl Normalizer {
    pub fn new(source: SourceKind, rules: &[NormalizationRule]) -> Self {
        let mut rules = rules.to_vec();
        rules.sort_by_key(NormalizationRule::stage);

        Normalizer {
            source,
            rules,
            legacy_uuid: UuidRepresentation::default(),
        }
    }

    pub fn with_legacy_uuid(mut self, representation: UuidRepresentation) -> Self {
        self.legacy_uuid = representation;
        self
    }

    pub fn source(&self) -> SourceKind {
        self.source
    }

    /// Normalize every record in place
    pub fn normalize(&self, records: &mut RecordSet) -> NormalizationSummary {
        let mut summary = NormalizationSummary {
            records: records.len(),
            ..Default::default()
        };

        for (index, record) in records.iter_mut().enumerate() {
            self.normalize_record(index, record, &mut summary);
        }

        tracing::debug!(
            source = self.source.label(),
            records = summary.records,
            identifiers_decoded = summary.identifiers_decoded,
            fields_renamed = summary.fields_renamed,
            fields_parsed = summary.fields_parsed,
            warnings = summary.warnings.len(),
            "normalized record set"
        );

        summary
    }

    fn normalize_record(&self, index: usize, record: &mut Record, summary: &mut NormalizationSummary) {
        for rule in &self.rules {
            let outcome = match rule {
                NormalizationRule::RenameField { from, to } => {
                    rename_field(record, from, to).map(|renamed| summary.fields_renamed += renamed as usize)
                }
                NormalizationRule::ParseEmbeddedJson { field, shape } => {
                    parse_embedded(record, field, *shape).map(|parsed| summary.fields_parsed += parsed as usize)
                }
                NormalizationRule::DecodeBinaryIdentifiers => {
                    let mut errors = Vec::new();
                    summary.identifiers_decoded += self.decode_map(record, &mut errors);
                    for error in &errors {
                        self.warn(index, error, summary);
                    }
                    Ok(())
                }
            };

            if let Err(error) = outcome {
                self.warn(index, &error, summary);
            }
        }
    }

    fn warn(&self, index: usize, error: &ComparatorError, summary: &mut NormalizationSummary) {
        tracing::warn!(
            source = self.source.label(),
            record = index,
            code = error.code(),
            "{}",
            error
        );
        summary
            .warnings
            .push(ReportWarning::new(self.source, Some(index), error));
    }

    fn decode_map(&self, map: &mut Map<String, Value>, errors: &mut Vec<ComparatorError>) -> usize {
        map.iter_mut()
            .map(|(field, value)| self.decode_value(field, value, errors))
            .sum()
    }

    /// Decode wrappers in `value` and below; returns how many were replaced
    fn decode_value(&self, field: &str, value: &mut Value, errors: &mut Vec<ComparatorError>) -> usize {
        match decode_identifier(value, self.legacy_uuid) {
            Some(Ok(canonical)) => {
                *value = Value::String(canonical);
                return 1;
            }
            Some(Err(reason)) => {
                errors.push(ComparatorError::MalformedBinaryIdentifier {
                    field: field.to_string(),
                    reason: reason.to_string(),
                });
                return 0;
            }
            None => {}
        }

        match value {
            Value::Array(items) => items
                .iter_mut()
                .map(|item| self.decode_value(field, item, errors))
                .sum(),
            Value::Object(map) => self.decode_map(map, errors),
            Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => 0,
        }
    }
}

/// Rename `from` to `to` without moving the field
fn rename_field(record: &mut Record, from: &str, to: &str) -> Result<bool, ComparatorError> {
    if from == to || !record.contains_key(from) {
        return Ok(false);
    }
    if record.contains_key(to) {
        return Err(ComparatorError::FieldRenameConflict {
            from: from.to_string(),
            to: to.to_string(),
        });
    }

    let fields = std::mem::take(record);
    *record = fields
        .into_iter()
        .map(|(name, value)| if name == from { (to.to_string(), value) } else { (name, value) })
        .collect();

    Ok(true)
}

fn parse_embedded(record: &mut Record, field: &str, shape: EmbeddedShape) -> Result<bool, ComparatorError> {
    let Some(Value::String(text)) = record.get(field) else {
        return Ok(false);
    };
    if text.trim().is_empty() {
        return Ok(false);
    }

    let parsed: Value = serde_json::from_str(text).map_err(|e| ComparatorError::MalformedNestedJson {
        field: field.to_string(),
        reason: e.to_string(),
    })?;

    if !shape.accepts(&parsed) {
        return Err(ComparatorError::MalformedNestedJson {
            field: field.to_string(),
            reason: format!("expected {:?}, found {}", shape, value_kind(&parsed)),
        });
    }

    record.insert(field.to_string(), parsed);
    Ok(true)
}

pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record_set::extract_records;
    use serde_json::json;

    fn records(value: Value) -> RecordSet {
        extract_records(value, None).unwrap().records
    }

    fn document_normalizer() -> Normalizer {
        Normalizer::new(
            SourceKind::DocumentStore,
            &[
                NormalizationRule::DecodeBinaryIdentifiers,
                NormalizationRule::rename("_id", "id"),
            ],
        )
    }

    #[test]
    fn test_decodes_and_renames_identifier() {
        let mut set = records(json!([
            {"_id": {"$binary": {"base64": "AAECAwQFBgcICQoLDA0ODw==", "subType": "03"}}, "name": "Acme"}
        ]));

        let summary = document_normalizer().normalize(&mut set);

        assert_eq!(summary.identifiers_decoded, 1);
        assert_eq!(summary.fields_renamed, 1);
        assert!(summary.warnings.is_empty());
        assert_eq!(set[0]["id"], json!("03020100-0504-0706-0809-0a0b0c0d0e0f"));
        assert!(!set[0].contains_key("_id"));

        // Position is preserved
        let names: Vec<&String> = set[0].keys().collect();
        assert_eq!(names, vec!["id", "name"]);

        println!("✅ Test passed: {}", summary.summary());
    }

    #[test]
    fn test_decodes_inside_nested_lists() {
        let mut set = records(json!([{
            "sellerId": "abc",
            "parameters": [
                {"paramId": {"$binary": {"base64": "AAECAwQFBgcICQoLDA0ODw==", "subType": "04"}}},
                {"paramId": "plain", "inner": [{"ref": {"$uuid": "00112233-4455-6677-8899-AABBCCDDEEFF"}}]}
            ]
        }]));

        let summary = document_normalizer().normalize(&mut set);

        assert_eq!(summary.identifiers_decoded, 2);
        assert_eq!(
            set[0]["parameters"][0]["paramId"],
            json!("00010203-0405-0607-0809-0a0b0c0d0e0f")
        );
        assert_eq!(
            set[0]["parameters"][1]["inner"][0]["ref"],
            json!("00112233-4455-6677-8899-aabbccddeeff")
        );
    }

    #[test]
    fn test_malformed_identifier_is_kept_with_warning() {
        let original = json!({"$binary": {"base64": "AAEC", "subType": "03"}});
        let mut set = records(json!([{"_id": original.clone()}]));

        let summary = document_normalizer().normalize(&mut set);

        assert_eq!(summary.identifiers_decoded, 0);
        assert_eq!(summary.warnings.len(), 1);
        assert_eq!(summary.warnings[0].code, "ERR_MALFORMED_BINARY_IDENTIFIER");
        // Rename still applies to the unnormalized value
        assert_eq!(set[0]["id"], original);
    }

    #[test]
    fn test_rename_conflict_leaves_record_alone() {
        let mut set = records(json!([{"_id": "a", "id": "b"}]));

        let summary = document_normalizer().normalize(&mut set);

        assert_eq!(summary.fields_renamed, 0);
        assert_eq!(summary.warnings[0].code, "ERR_FIELD_RENAME_CONFLICT");
        assert_eq!(set[0]["_id"], json!("a"));
        assert_eq!(set[0]["id"], json!("b"));
    }

    #[test]
    fn test_parses_embedded_json() {
        let normalizer = Normalizer::new(
            SourceKind::Relational,
            &[NormalizationRule::parse_embedded("parameters", EmbeddedShape::Array)],
        );
        let mut set = records(json!([
            {"sellerId": "1", "parameters": "[{\"name\":\"timeout\",\"value\":\"30\"}]"},
            {"sellerId": "2", "parameters": "[{broken"},
            {"sellerId": "3", "parameters": "{\"name\":\"x\"}"},
            {"sellerId": "4", "parameters": null},
            {"sellerId": "5"}
        ]));

        let summary = normalizer.normalize(&mut set);

        assert_eq!(summary.fields_parsed, 1);
        assert_eq!(set[0]["parameters"][0]["name"], json!("timeout"));
        assert_eq!(set[1]["parameters"], json!("[{broken"));
        assert_eq!(set[2]["parameters"], json!("{\"name\":\"x\"}"));
        assert_eq!(set[3]["parameters"], Value::Null);
        assert_eq!(summary.warnings.len(), 2);
        assert!(summary
            .warnings
            .iter()
            .all(|w| w.code == "ERR_MALFORMED_NESTED_JSON"));
    }

    #[test]
    fn test_decoding_reaches_parsed_trees() {
        let normalizer = Normalizer::new(
            SourceKind::Relational,
            &[
                NormalizationRule::DecodeBinaryIdentifiers,
                NormalizationRule::parse_embedded("parameters", EmbeddedShape::Any),
            ],
        );
        let mut set = records(json!([{
            "parameters": "{\"owner\":{\"$uuid\":\"00112233-4455-6677-8899-aabbccddeeff\"}}"
        }]));

        let summary = normalizer.normalize(&mut set);

        assert_eq!(summary.fields_parsed, 1);
        assert_eq!(summary.identifiers_decoded, 1);
        assert_eq!(
            set[0]["parameters"]["owner"],
            json!("00112233-4455-6677-8899-aabbccddeeff")
        );
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let mut set = records(json!([
            {"_id": {"$binary": {"base64": "AAECAwQFBgcICQoLDA0ODw==", "subType": "03"}}, "tags": [1, 2]}
        ]));
        let normalizer = document_normalizer();

        normalizer.normalize(&mut set);
        let once = set.clone();
        let second = normalizer.normalize(&mut set);

        assert_eq!(set, once);
        assert!(!second.changed());
    }

    #[test]
    fn test_wrapper_lookalikes_are_walked_not_replaced() {
        let mut set = records(json!([{
            "meta": {
                "$binary": "not an identifier",
                "owner": {"$uuid": "00112233-4455-6677-8899-aabbccddeeff"}
            }
        }]));

        let summary = document_normalizer().normalize(&mut set);

        assert!(summary.warnings.is_empty());
        assert_eq!(summary.identifiers_decoded, 1);
        assert_eq!(set[0]["meta"]["$binary"], json!("not an identifier"));
        assert_eq!(set[0]["meta"]["owner"], json!("00112233-4455-6677-8899-aabbccddeeff"));
    }

    #[test]
    fn test_unexpected_shapes_untouched() {
        let mut set = records(json!([{"_id": 42, "flag": true, "list": [null, "x"]}]));

        let summary = document_normalizer().normalize(&mut set);

        assert_eq!(summary.identifiers_decoded, 0);
        assert!(summary.warnings.is_empty());
        assert_eq!(set[0]["id"], json!(42));
        assert_eq!(set[0]["list"], json!([null, "x"]));
    }
}
