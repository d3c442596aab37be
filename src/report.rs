// 📋 Difference Report - What disagrees between the two exports
//
// One EntityReport per entity type, gathered into a DifferenceReport that
// serializes to a single JSON document.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::differ::{FieldDifference, RecordDifference};
use crate::errors::ReportWarning;

// ============================================================================
// ENTITY REPORT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityReport {
    pub entity: String,
    pub key_field: String,

    pub source_a_count: usize,
    pub source_b_count: usize,

    pub duplicates_in_a: BTreeMap<String, usize>,
    pub duplicates_in_b: BTreeMap<String, usize>,

    pub only_in_a: Vec<String>,
    pub only_in_b: Vec<String>,

    /// Keys present in both sources, with or without differences
    pub matched_count: usize,

    /// One entry per matched key, in match order; empty when the records agree
    pub differences: Vec<RecordDifference>,

    #[serde(default)]
    pub warnings: Vec<ReportWarning>,
}

impl EntityReport {
    pub fn count_mismatch(&self) -> bool {
        self.source_a_count != self.source_b_count
    }

    /// No discrepancy of any kind was found
    pub fn is_clean(&self) -> bool {
        !self.count_mismatch()
            && self.duplicates_in_a.is_empty()
            && self.duplicates_in_b.is_empty()
            && self.only_in_a.is_empty()
            && self.only_in_b.is_empty()
            && self.differences.iter().all(RecordDifference::is_empty)
    }

    /// Matched records with at least one difference
    pub fn differing_records(&self) -> impl Iterator<Item = &RecordDifference> {
        self.differences.iter().filter(|d| !d.is_empty())
    }

    pub fn difference_for(&self, key: &str) -> Option<&RecordDifference> {
        let key = key.to_lowercase();
        self.differences.iter().find(|d| d.key == key)
    }

    /// Number of differing fields across all records
    pub fn field_difference_count(&self) -> usize {
        self.differences
            .iter()
            .map(|d| d.field_differences.len())
            .sum()
    }

    /// Differing field names with how many records they differ in
    pub fn differing_fields(&self) -> BTreeMap<String, usize> {
        let mut fields = BTreeMap::new();
        for field in self
            .differences
            .iter()
            .flat_map(|d| d.field_differences.iter().map(FieldDifference::field))
        {
            *fields.entry(field.to_string()).or_insert(0) += 1;
        }
        fields
    }

    pub fn summary(&self) -> String {
        format!(
            "{}: A={} B={}, {} only in A, {} only in B, {} matched ({} differing, {} field differences), {} warnings",
            self.entity,
            self.source_a_count,
            self.source_b_count,
            self.only_in_a.len(),
            self.only_in_b.len(),
            self.matched_count,
            self.differing_records().count(),
            self.field_difference_count(),
            self.warnings.len()
        )
    }
}

// ============================================================================
// DIFFERENCE REPORT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DifferenceReport {
    pub generated_at: DateTime<Utc>,

    pub entities: BTreeMap<String, EntityReport>,

    /// Entities whose comparison could not run, with the reason
    #[serde(default)]
    pub failures: BTreeMap<String, String>,
}

impl DifferenceReport {
    pub fn new() -> Self {
        DifferenceReport {
            generated_at: Utc::now(),
            entities: BTreeMap::new(),
            failures: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, report: EntityReport) {
        self.entities.insert(report.entity.clone(), report);
    }

    pub fn entity(&self, name: &str) -> Option<&EntityReport> {
        self.entities.get(name)
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.entities.values().all(EntityReport::is_clean)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn summary(&self) -> String {
        let clean = self.entities.values().filter(|e| e.is_clean()).count();
        format!(
            "{} entities compared ({} clean, {} with discrepancies), {} failed",
            self.entities.len(),
            clean,
            self.entities.len() - clean,
            self.failures.len()
        )
    }
}

impl Default for DifferenceReport {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_report() -> EntityReport {
        EntityReport {
            entity: "Sellers".to_string(),
            key_field: "cnpj".to_string(),
            source_a_count: 3,
            source_b_count: 2,
            duplicates_in_a: BTreeMap::from([("111".to_string(), 2)]),
            duplicates_in_b: BTreeMap::new(),
            only_in_a: vec![],
            only_in_b: vec![],
            matched_count: 2,
            differences: vec![RecordDifference {
                key: "111".to_string(),
                fields_only_in_a: vec![],
                fields_only_in_b: vec![],
                field_differences: vec![FieldDifference::Value {
                    field: "name".to_string(),
                    value_a: json!("Acme"),
                    value_b: json!("Acme Ltda"),
                }],
            }],
            warnings: vec![],
        }
    }

    #[test]
    fn test_entity_report_methods() {
        let report = sample_report();

        assert!(report.count_mismatch());
        assert!(!report.is_clean());
        assert_eq!(report.field_difference_count(), 1);
        assert!(report.difference_for("111").is_some());
        assert_eq!(report.differing_fields().get("name"), Some(&1));

        println!("✅ Test passed: {}", report.summary());
    }

    #[test]
    fn test_agreeing_records_stay_listed() {
        let mut report = sample_report();
        report.source_a_count = 2;
        report.duplicates_in_a.clear();
        report.differences = vec![RecordDifference {
            key: "111".to_string(),
            fields_only_in_a: vec![],
            fields_only_in_b: vec![],
            field_differences: vec![],
        }];

        assert!(report.is_clean());
        assert!(report.difference_for("111").unwrap().is_empty());
        assert_eq!(report.differing_records().count(), 0);
    }

    #[test]
    fn test_difference_report_serializes() {
        let mut report = DifferenceReport::new();
        report.insert(sample_report());
        report
            .failures
            .insert("IntegrationParameters".to_string(), "bad input".to_string());

        let text = report.to_json_pretty().unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();

        assert_eq!(value["entities"]["Sellers"]["source_a_count"], json!(3));
        assert_eq!(
            value["entities"]["Sellers"]["differences"][0]["field_differences"][0]["kind"],
            json!("value")
        );
        assert_eq!(value["failures"]["IntegrationParameters"], json!("bad input"));
        assert!(!report.is_clean());
    }
}
