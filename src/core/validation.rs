//! Synchronous pre-submit checks, reported per field.

use std::collections::HashMap;

use crate::domain::{Field, FieldId, OptionNode};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    pub field_id: FieldId,
    pub field_index: usize,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub issues: Vec<FieldIssue>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn for_field(&self, id: FieldId) -> Vec<&FieldIssue> {
        self.issues
            .iter()
            .filter(|issue| issue.field_id == id)
            .collect()
    }

    /// One-line summary suitable for a notification.
    pub fn summary(&self) -> String {
        self.issues
            .iter()
            .map(|issue| format!("field {}: {}", issue.field_index, issue.message))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

pub fn validate(fields: &[Field]) -> ValidationReport {
    let mut issues = Vec::new();
    let mut seen: HashMap<String, usize> = HashMap::new();

    for (idx, field) in fields.iter().enumerate() {
        let mut push = |message: String| {
            issues.push(FieldIssue {
                field_id: field.id,
                field_index: idx,
                message,
            })
        };

        let name = field.field_name.trim();
        if name.is_empty() {
            push("field name is required".into());
        } else {
            let normalized = name.to_lowercase();
            if let Some(first) = seen.get(&normalized) {
                push(format!(
                    "field name `{}` is already used by field {}",
                    name, first
                ));
            } else {
                seen.insert(normalized, idx);
            }
        }

        if field.field_type.is_choice() && field.options.is_empty() {
            push(format!("a `{}` field needs at least one option", field.field_type));
        }
        check_nodes(&field.options, &mut push);
    }

    ValidationReport { issues }
}

fn check_nodes(nodes: &[OptionNode], push: &mut impl FnMut(String)) {
    for node in nodes {
        if node.label().trim().is_empty() {
            push(format!("{} option has an empty label", node.kind_name()));
        }
        for pair in node.pairs() {
            if pair.key.trim().is_empty() {
                push(format!("package `{}` has an entry without a key", node.label()));
            }
        }
        check_nodes(node.children(), push);
    }
}
