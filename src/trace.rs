// 🧾 Trace - Line-oriented view of an entity report
//
// The same lines the comparison has always printed: counts, duplicates,
// only-in listings, field-set listings and one line per differing field.

use crate::differ::{render_value, FieldDifference, NestedDifference};
use crate::normalizer::SourceKind;
use crate::report::EntityReport;

pub fn render_trace(report: &EntityReport) -> Vec<String> {
    let a = SourceKind::DocumentStore.label();
    let b = SourceKind::Relational.label();
    let key_field = &report.key_field;
    let mut lines = Vec::new();

    lines.push(format!("== {} ==", report.entity));
    lines.push(format!("{} records count: {}", a, report.source_a_count));
    lines.push(format!("{} records count: {}", b, report.source_b_count));

    for (label, duplicates) in [(a, &report.duplicates_in_a), (b, &report.duplicates_in_b)] {
        lines.push(format!("{} duplicate records:", label));
        for (key, count) in duplicates {
            lines.push(format!("{} : {}", key, count));
        }
    }

    lines.push(format!(
        "Records only in {} ({}): {}",
        a,
        report.only_in_a.len(),
        report.only_in_a.join(", ")
    ));
    lines.push(format!(
        "Records only in {} ({}): {}",
        b,
        report.only_in_b.len(),
        report.only_in_b.join(", ")
    ));

    for diff in &report.differences {
        lines.push(format!(
            "Fields only in {} for {} {}: {}",
            a,
            key_field,
            diff.key,
            diff.fields_only_in_a.join(", ")
        ));
        lines.push(format!(
            "Fields only in {} for {} {}: {}",
            b,
            key_field,
            diff.key,
            diff.fields_only_in_b.join(", ")
        ));

        let context = format!("{} {}", key_field, diff.key);
        for field_diff in &diff.field_differences {
            push_field_difference(&mut lines, &context, field_diff);
        }
    }

    for warning in &report.warnings {
        lines.push(format!("Warning ({}): {}", warning.source.label(), warning.message));
    }

    lines
}

fn push_field_difference(lines: &mut Vec<String>, context: &str, diff: &FieldDifference) {
    match diff {
        FieldDifference::Value {
            field,
            value_a,
            value_b,
        } => lines.push(format!(
            "Difference in field '{}' for {}: {}='{}', {}='{}'",
            field,
            context,
            SourceKind::DocumentStore.label(),
            render_value(value_a),
            SourceKind::Relational.label(),
            render_value(value_b)
        )),
        FieldDifference::Nested { field, differences } => {
            for nested in differences {
                push_nested_difference(lines, context, field, nested);
            }
        }
    }
}

fn push_nested_difference(lines: &mut Vec<String>, context: &str, field: &str, diff: &NestedDifference) {
    let (a, b) = (SourceKind::DocumentStore.label(), SourceKind::Relational.label());

    match diff {
        NestedDifference::Missing {
            index,
            value_a,
            value_b,
        } => {
            let (present, value) = match (value_a, value_b) {
                (Some(v), _) => (a, v),
                (None, Some(v)) => (b, v),
                (None, None) => return,
            };
            lines.push(format!(
                "Element {}[{}] for {} only in {}: {}",
                field, index, context, present, value
            ));
        }
        NestedDifference::Object {
            index,
            fields_only_in_a,
            fields_only_in_b,
            field_differences,
        } => {
            let path = match index {
                Some(i) => format!("{}[{}]", field, i),
                None => field.to_string(),
            };
            let context = format!("{} at {}", context, path);
            if !fields_only_in_a.is_empty() {
                lines.push(format!(
                    "Fields only in {} for {}: {}",
                    a,
                    context,
                    fields_only_in_a.join(", ")
                ));
            }
            if !fields_only_in_b.is_empty() {
                lines.push(format!(
                    "Fields only in {} for {}: {}",
                    b,
                    context,
                    fields_only_in_b.join(", ")
                ));
            }
            for field_diff in field_differences {
                push_field_difference(lines, &context, field_diff);
            }
        }
        NestedDifference::WholeValue {
            index,
            value_a,
            value_b,
        } => {
            let path = match index {
                Some(i) => format!("{}[{}]", field, i),
                None => field.to_string(),
            };
            lines.push(format!(
                "Difference in '{}' for {}: {}={}, {}={}",
                path, context, a, value_a, b, value_b
            ));
        }
    }
}

/// Send the trace through the logging layer
pub fn emit_trace(report: &EntityReport) {
    for line in render_trace(report) {
        tracing::info!(entity = report.entity.as_str(), "{}", line);
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::differ::RecordDifference;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn report() -> EntityReport {
        EntityReport {
            entity: "IntegrationParameters".to_string(),
            key_field: "sellerId".to_string(),
            source_a_count: 2,
            source_b_count: 2,
            duplicates_in_a: BTreeMap::from([("s9".to_string(), 2)]),
            duplicates_in_b: BTreeMap::new(),
            only_in_a: vec!["s2".to_string()],
            only_in_b: vec!["s3".to_string(), "s4".to_string()],
            matched_count: 1,
            differences: vec![RecordDifference {
                key: "s1".to_string(),
                fields_only_in_a: vec!["legacy".to_string()],
                fields_only_in_b: vec![],
                field_differences: vec![
                    FieldDifference::Value {
                        field: "status".to_string(),
                        value_a: json!("active"),
                        value_b: json!("blocked"),
                    },
                    FieldDifference::Nested {
                        field: "parameters".to_string(),
                        differences: vec![NestedDifference::Missing {
                            index: 1,
                            value_a: None,
                            value_b: Some(json!({"name": "x"})),
                        }],
                    },
                ],
            }],
            warnings: vec![],
        }
    }

    #[test]
    fn test_render_trace_lines() {
        let lines = render_trace(&report());

        assert!(lines.contains(&"Document store records count: 2".to_string()));
        assert!(lines.contains(&"s9 : 2".to_string()));
        assert!(lines.contains(&"Records only in Relational (2): s3, s4".to_string()));
        assert!(lines.contains(&"Fields only in Document store for sellerId s1: legacy".to_string()));
        assert!(lines.contains(
            &"Difference in field 'status' for sellerId s1: Document store='active', Relational='blocked'"
                .to_string()
        ));
        assert!(lines.contains(
            &"Element parameters[1] for sellerId s1 only in Relational: {\"name\":\"x\"}".to_string()
        ));
    }
}
