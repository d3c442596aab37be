// Data Comparator - Core Library
// Reconciles document-store and relational exports of the same entities

pub mod comparator;
pub mod config;
pub mod differ;
pub mod errors;
pub mod identifier;
pub mod logging;
pub mod matcher;
pub mod normalizer;
pub mod record_set;
pub mod report;
pub mod trace;

// Re-export commonly used types
pub use comparator::{ComparisonEngine, EntityComparison, EntityInput};
pub use config::{ComparatorConfig, EntitySpec, DOCUMENT_ID_FIELD};
pub use differ::{render_value, Differ, FieldDifference, NestedDifference, RecordDifference};
pub use errors::{ComparatorError, ReportWarning};
pub use identifier::{
    decode_identifier, encode_identifier, BinaryIdentifier, IdentifierError, UuidRepresentation,
    IDENTIFIER_LEN,
};
pub use matcher::{duplicates_of, match_records, render_key, KeyFields, KeyIndex, MatchResult};
pub use normalizer::{EmbeddedShape, NormalizationRule, NormalizationSummary, Normalizer, SourceKind};
pub use record_set::{extract_records, records_to_document, ExtractedRecords, Record, RecordSet};
pub use report::{DifferenceReport, EntityReport};
pub use trace::{emit_trace, render_trace};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
