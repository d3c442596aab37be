// ⚖️ Comparison Engine - Normalize, match and diff two exports
//
//   extract → normalize (per source) → match by key → diff matched pairs
//
// A failure to read one entity's input stops that entity only; every other
// problem is recorded as a warning and the comparison carries on.

use serde_json::Value;

use crate::config::{ComparatorConfig, EntitySpec};
use crate::differ::Differ;
use crate::errors::{ComparatorError, ReportWarning, Result};
use crate::matcher::match_records;
use crate::normalizer::{NormalizationSummary, Normalizer, SourceKind};
use crate::record_set::{extract_records, records_to_document, RecordSet};
use crate::report::{DifferenceReport, EntityReport};

// ============================================================================
// ENTITY COMPARISON
// ============================================================================

/// Result of one entity comparison, with the normalized inputs
#[derive(Debug, Clone)]
pub struct EntityComparison {
    pub report: EntityReport,

    /// Document-store records after normalization, for write-back
    pub normalized_a: RecordSet,
    pub normalized_b: RecordSet,

    pub normalization_a: NormalizationSummary,
    pub normalization_b: NormalizationSummary,
}

impl EntityComparison {
    /// Normalized document-store export as a JSON array
    pub fn normalized_document(&self) -> Value {
        records_to_document(&self.normalized_a)
    }
}

/// Both exports of one entity type
#[derive(Debug, Clone)]
pub struct EntityInput {
    pub entity: String,
    pub document_store: Value,
    pub relational: Value,
}

impl EntityInput {
    pub fn new(entity: &str, document_store: Value, relational: Value) -> Self {
        EntityInput {
            entity: entity.to_string(),
            document_store,
            relational,
        }
    }
}

// ============================================================================
// COMPARISON ENGINE
// ============================================================================

pub struct ComparisonEngine {
    config: ComparatorConfig,
}

impl ComparisonEngine {
    pub fn new(config: ComparatorConfig) -> Self {
        ComparisonEngine { config }
    }

    pub fn config(&self) -> &ComparatorConfig {
        &self.config
    }

    /// Compare the two exports of one entity type.
    ///
    /// Only an input that is not a record collection at all is an error.
    pub fn compare_entity(
        &self,
        spec: &EntitySpec,
        document_store: Value,
        relational: Value,
    ) -> Result<EntityComparison> {
        spec.validate()?;

        let collection = spec.collection.as_deref();
        let mut extracted_a = extract_records(document_store, collection)?;
        let mut extracted_b = extract_records(relational, collection)?;

        let mut warnings: Vec<ReportWarning> = Vec::new();
        for (source, skipped) in [
            (SourceKind::DocumentStore, &extracted_a.skipped),
            (SourceKind::Relational, &extracted_b.skipped),
        ] {
            for error in skipped {
                let index = match error {
                    ComparatorError::InvalidRecord { index } => Some(*index),
                    _ => None,
                };
                warnings.push(self.warning(spec, source, index, error));
            }
        }

        let mut normalized_a = std::mem::take(&mut extracted_a.records);
        let mut normalized_b = std::mem::take(&mut extracted_b.records);

        let mut normalization_a = self
            .normalizer(spec, SourceKind::DocumentStore)
            .normalize(&mut normalized_a);
        let mut normalization_b = self
            .normalizer(spec, SourceKind::Relational)
            .normalize(&mut normalized_b);

        // Record indices below count objects only; report source positions
        for (summary, extracted) in [
            (&mut normalization_a, &extracted_a),
            (&mut normalization_b, &extracted_b),
        ] {
            for warning in &mut summary.warnings {
                warning.record_index = warning.record_index.map(|i| extracted.source_position(i));
            }
            warnings.extend(summary.warnings.iter().cloned());
        }

        let key_fields = spec.key_fields();
        let matched = match_records(&normalized_a, &normalized_b, &key_fields);
        for (source, missing, extracted) in [
            (SourceKind::DocumentStore, &matched.missing_in_a, &extracted_a),
            (SourceKind::Relational, &matched.missing_in_b, &extracted_b),
        ] {
            for error in missing {
                let (error, index) = match error {
                    ComparatorError::MissingKeyField { field, index } => {
                        let position = extracted.source_position(*index);
                        let error = ComparatorError::MissingKeyField {
                            field: field.clone(),
                            index: position,
                        };
                        (error, Some(position))
                    }
                    other => (other.clone(), None),
                };
                warnings.push(self.warning(spec, source, index, &error));
            }
        }

        let differ = Differ::new()
            .with_nested_fields(spec.nested_fields.iter().cloned())
            .with_case_sensitive(self.config.case_sensitive);

        let differences = matched
            .pairs(&normalized_a, &normalized_b)
            .map(|(key, a, b)| differ.diff_record(key, a, b))
            .collect();

        let report = EntityReport {
            entity: spec.name.clone(),
            key_field: spec.key_field.clone(),
            source_a_count: normalized_a.len(),
            source_b_count: normalized_b.len(),
            duplicates_in_a: matched.duplicates_in_a.clone(),
            duplicates_in_b: matched.duplicates_in_b.clone(),
            only_in_a: matched.only_in_a.clone(),
            only_in_b: matched.only_in_b.clone(),
            matched_count: matched.matched.len(),
            differences,
            warnings,
        };

        tracing::info!(entity = spec.name.as_str(), "{}", report.summary());

        Ok(EntityComparison {
            report,
            normalized_a,
            normalized_b,
            normalization_a,
            normalization_b,
        })
    }

    /// Compare every input whose entity is configured.
    ///
    /// Failing entities are listed under `failures`; the rest still report.
    pub fn compare_all(&self, inputs: Vec<EntityInput>) -> DifferenceReport {
        let mut report = DifferenceReport::new();

        for input in inputs {
            let Some(spec) = self.config.entity(&input.entity) else {
                tracing::warn!(entity = input.entity.as_str(), "no configuration for entity");
                report
                    .failures
                    .insert(input.entity, "entity is not configured".to_string());
                continue;
            };

            match self.compare_entity(spec, input.document_store, input.relational) {
                Ok(comparison) => report.insert(comparison.report),
                Err(error) => {
                    tracing::warn!(
                        entity = spec.name.as_str(),
                        code = error.code(),
                        "{}",
                        error
                    );
                    report.failures.insert(spec.name.clone(), error.to_string());
                }
            }
        }

        tracing::info!("{}", report.summary());
        report
    }

    fn normalizer(&self, spec: &EntitySpec, source: SourceKind) -> Normalizer {
        Normalizer::new(source, spec.rules_for(source))
            .with_legacy_uuid(self.config.legacy_uuid_representation)
    }

    fn warning(
        &self,
        spec: &EntitySpec,
        source: SourceKind,
        index: Option<usize>,
        error: &ComparatorError,
    ) -> ReportWarning {
        tracing::warn!(
            entity = spec.name.as_str(),
            source = source.label(),
            code = error.code(),
            "{}",
            error
        );
        ReportWarning::new(source, index, error)
    }
}

impl Default for ComparisonEngine {
    fn default() -> Self {
        Self::new(ComparatorConfig::default())
    }
}

// ============================================================================
// TESTS
// ============================================================================
