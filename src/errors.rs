// ⚠️ Comparator Errors - Localized failures that degrade to warnings
//
// Only `InvalidRecordSet` and `InvalidConfig` stop anything: the first stops a
// single entity comparison, the second rejects a configuration. Everything
// else is recorded as a `ReportWarning` and the comparison carries on.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::normalizer::SourceKind;

/// Result type alias using ComparatorError
pub type Result<T> = std::result::Result<T, ComparatorError>;

// ============================================================================
// ERROR TAXONOMY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ComparatorError {
    /// A record lacks the configured key field (or holds null there)
    #[error("record {index} has no value for key field '{field}'")]
    MissingKeyField { field: String, index: usize },

    /// A binary identifier wrapper could not be decoded into 16 bytes
    #[error("field '{field}' holds a malformed binary identifier: {reason}")]
    MalformedBinaryIdentifier { field: String, reason: String },

    /// A string-encoded nested field is not valid JSON of the expected shape
    #[error("field '{field}' holds malformed embedded JSON: {reason}")]
    MalformedNestedJson { field: String, reason: String },

    /// Renaming would overwrite a field that already exists
    #[error("cannot rename field '{from}' to '{to}': target already present")]
    FieldRenameConflict { from: String, to: String },

    /// An element of the record collection is not an object
    #[error("element {index} of the record collection is not an object")]
    InvalidRecord { index: usize },

    /// The document is not a record collection at all
    #[error("input is not a valid record collection: {reason}")]
    InvalidRecordSet { reason: String },

    /// The comparator configuration is inconsistent
    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl ComparatorError {
    /// Stable machine-readable code for this error kind
    pub fn code(&self) -> &'static str {
        match self {
            ComparatorError::MissingKeyField { .. } => "ERR_MISSING_KEY_FIELD",
            ComparatorError::MalformedBinaryIdentifier { .. } => "ERR_MALFORMED_BINARY_IDENTIFIER",
            ComparatorError::MalformedNestedJson { .. } => "ERR_MALFORMED_NESTED_JSON",
            ComparatorError::FieldRenameConflict { .. } => "ERR_FIELD_RENAME_CONFLICT",
            ComparatorError::InvalidRecord { .. } => "ERR_INVALID_RECORD",
            ComparatorError::InvalidRecordSet { .. } => "ERR_INVALID_RECORD_SET",
            ComparatorError::InvalidConfig { .. } => "ERR_INVALID_CONFIG",
        }
    }

    /// Whether this error aborts the comparison of the entity it occurred in
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ComparatorError::InvalidRecordSet { .. } | ComparatorError::InvalidConfig { .. }
        )
    }
}

// ============================================================================
// REPORT WARNING
// ============================================================================

/// A non-fatal error as it appears in a report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportWarning {
    pub source: SourceKind,

    /// Position of the offending record in its source, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_index: Option<usize>,

    pub code: String,
    pub message: String,
}

impl ReportWarning {
    pub fn new(source: SourceKind, record_index: Option<usize>, error: &ComparatorError) -> Self {
        ReportWarning {
            source,
            record_index,
            code: error.code().to_string(),
            message: error.to_string(),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
