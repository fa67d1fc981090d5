//! Conversion between the in-memory tree and the backend wire shape.
//!
//! Serializing walks fields in order (attachment first, then the option tree
//! depth-first, pairs in order), replacing every file blob with its reference
//! name and collecting the blob as an attachment. The walk is deterministic,
//! so serializing the same tree twice yields identical output.

use std::collections::{HashMap, HashSet};

use serde_json::{Map, Value};
use tracing::warn;

use crate::domain::{
    option_tree::flatten_to_leaves, Field, FieldType, FileValue, KeyValueEntry, KvValue,
    OptionNode,
};
use crate::errors::{FormError, FormResult};

/// Binary payload extracted from the tree, referenced by name from the JSON.
#[derive(Clone, PartialEq, Eq)]
pub struct Attachment {
    pub reference: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for Attachment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attachment")
            .field("reference", &self.reference)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SerializedForm {
    pub data: Value,
    pub attachments: Vec<Attachment>,
}

impl SerializedForm {
    pub fn attachment(&self, reference: &str) -> Option<&Attachment> {
        self.attachments
            .iter()
            .find(|attachment| attachment.reference == reference)
    }

    pub fn data_json(&self) -> FormResult<String> {
        Ok(serde_json::to_string(&self.data)?)
    }
}

/// Fields rebuilt from a wire document plus notes on legacy data reshaped
/// during the conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct Hydrated {
    pub fields: Vec<Field>,
    pub migrations: Vec<String>,
}

pub fn serialize(fields: &[Field]) -> FormResult<SerializedForm> {
    let mut collector = AttachmentCollector::reserving(stored_references(fields));
    let data = fields
        .iter()
        .map(|field| field_to_json(field, &mut collector))
        .collect::<FormResult<Vec<_>>>()?;
    Ok(SerializedForm {
        data: Value::Array(data),
        attachments: collector.attachments,
    })
}

/// Reference names already stored by the backend that the tree still points
/// at: file fields without a fresh upload and string values inside packages.
fn stored_references(fields: &[Field]) -> HashSet<String> {
    fn walk(nodes: &[OptionNode], names: &mut HashSet<String>) {
        for node in nodes {
            for entry in node.pairs() {
                match &entry.value {
                    KvValue::Text(text) => {
                        names.insert(text.clone());
                    }
                    KvValue::List(items) => names.extend(items.iter().cloned()),
                    KvValue::File(_) | KvValue::Files(_) => {}
                }
            }
            walk(node.children(), names);
        }
    }

    let mut names = HashSet::new();
    for field in fields {
        if field.attachment.is_none() {
            if let Some(reference) = &field.file_reference {
                names.insert(reference.clone());
            }
        }
        walk(&field.options, &mut names);
    }
    names
}

#[derive(Default)]
struct AttachmentCollector {
    attachments: Vec<Attachment>,
    by_reference: HashMap<String, usize>,
    reserved: HashSet<String>,
}

impl AttachmentCollector {
    fn reserving(reserved: HashSet<String>) -> Self {
        Self {
            attachments: Vec::new(),
            by_reference: HashMap::new(),
            reserved,
        }
    }

    /// Returns the reference name for `file`, registering it on first sight.
    /// Names already stored for this form are never reused.
    fn register(&mut self, file: &FileValue) -> FormResult<String> {
        let name = file.name.trim();
        if name.is_empty() {
            return Err(FormError::Payload("file without a name".into()));
        }
        let (stem, extension) = split_name(name);
        let mut candidate = name.to_string();
        let mut counter = 1;
        loop {
            if !self.reserved.contains(&candidate) {
                match self.by_reference.get(&candidate) {
                    None => break,
                    Some(&idx) => {
                        let existing = &self.attachments[idx];
                        if existing.bytes == file.bytes
                            && existing.content_type == file.content_type
                        {
                            return Ok(candidate);
                        }
                    }
                }
            }
            counter += 1;
            candidate = match extension {
                Some(ext) => format!("{}-{}.{}", stem, counter, ext),
                None => format!("{}-{}", stem, counter),
            };
        }
        self.by_reference
            .insert(candidate.clone(), self.attachments.len());
        self.attachments.push(Attachment {
            reference: candidate.clone(),
            content_type: file.content_type.clone(),
            bytes: file.bytes.clone(),
        });
        Ok(candidate)
    }
}

fn split_name(name: &str) -> (&str, Option<&str>) {
    match name.rfind('.') {
        Some(idx) if idx > 0 && idx + 1 < name.len() => (&name[..idx], Some(&name[idx + 1..])),
        _ => (name, None),
    }
}

fn field_to_json(field: &Field, collector: &mut AttachmentCollector) -> FormResult<Value> {
    let mut object = Map::new();
    object.insert("type".into(), Value::String(field.field_type.to_string()));
    object.insert("fieldName".into(), Value::String(field.field_name.clone()));
    object.insert("required".into(), Value::Bool(field.required));
    object.insert(
        "placeholder".into(),
        Value::String(field.placeholder.clone()),
    );
    object.insert("switch".into(), Value::Bool(field.switch));
    if field.field_type.is_choice() {
        let options = field
            .options
            .iter()
            .map(|node| node_to_json(node, collector))
            .collect::<FormResult<Vec<_>>>()?;
        object.insert("options".into(), Value::Array(options));
    }
    if field.field_type == FieldType::File {
        let reference = match (&field.attachment, &field.file_reference) {
            (Some(file), _) => Some(collector.register(file)?),
            (None, Some(reference)) => Some(reference.clone()),
            (None, None) => None,
        };
        if let Some(reference) = reference {
            object.insert("file".into(), Value::String(reference));
        }
    }
    Ok(Value::Object(object))
}

fn node_to_json(node: &OptionNode, collector: &mut AttachmentCollector) -> FormResult<Value> {
    match node {
        OptionNode::Leaf { value, .. } => Ok(Value::String(value.clone())),
        OptionNode::Group {
            label, children, ..
        } => {
            let options = children
                .iter()
                .map(|child| node_to_json(child, collector))
                .collect::<FormResult<Vec<_>>>()?;
            let mut object = Map::new();
            object.insert("label".into(), Value::String(label.clone()));
            object.insert("isPackage".into(), Value::Bool(false));
            object.insert("options".into(), Value::Array(options));
            Ok(Value::Object(object))
        }
        OptionNode::Package { label, pairs, .. } => {
            let mut mapping = Map::new();
            for entry in pairs {
                mapping.insert(entry.key.clone(), kv_to_json(&entry.value, collector)?);
            }
            let mut object = Map::new();
            object.insert("label".into(), Value::String(label.clone()));
            object.insert("isPackage".into(), Value::Bool(true));
            object.insert("keyValuePairs".into(), Value::Object(mapping));
            Ok(Value::Object(object))
        }
    }
}

fn kv_to_json(value: &KvValue, collector: &mut AttachmentCollector) -> FormResult<Value> {
    Ok(match value {
        KvValue::Text(text) => Value::String(text.clone()),
        KvValue::List(items) => Value::Array(items.iter().cloned().map(Value::String).collect()),
        KvValue::File(file) => Value::String(collector.register(file)?),
        KvValue::Files(files) => Value::Array(
            files
                .iter()
                .map(|file| collector.register(file).map(Value::String))
                .collect::<FormResult<Vec<_>>>()?,
        ),
    })
}

/// Rebuilds fields from a wire document. Fresh identifiers are assigned.
pub fn hydrate(data: &Value) -> FormResult<Hydrated> {
    let items = data
        .as_array()
        .ok_or_else(|| FormError::Payload("form data must be an array of fields".into()))?;
    let mut migrations = Vec::new();
    let fields = items
        .iter()
        .enumerate()
        .map(|(idx, item)| field_from_json(idx, item, &mut migrations))
        .collect::<FormResult<Vec<_>>>()?;
    for note in &migrations {
        warn!(migration = %note, "form document migrated");
    }
    Ok(Hydrated { fields, migrations })
}

fn field_from_json(idx: usize, item: &Value, migrations: &mut Vec<String>) -> FormResult<Field> {
    let object = item
        .as_object()
        .ok_or_else(|| FormError::Payload(format!("field {} is not an object", idx)))?;
    let raw_type = object
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| FormError::Payload(format!("field {} has no type", idx)))?;
    let field_type: FieldType = raw_type
        .parse()
        .map_err(|err: String| FormError::Payload(format!("field {}: {}", idx, err)))?;

    let mut field = Field::new(field_type);
    field.field_name = string_property(object, "fieldName");
    field.placeholder = string_property(object, "placeholder");
    field.required = object
        .get("required")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    if let Some(switch) = object.get("switch").and_then(Value::as_bool) {
        field.switch = switch;
    }

    let raw_options = match object.get("options") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.clone(),
        Some(_) => {
            return Err(FormError::Payload(format!(
                "field {}: options must be an array",
                idx
            )))
        }
    };
    if field_type.is_choice() {
        let nodes = raw_options
            .iter()
            .map(|node| node_from_json(node, idx, migrations))
            .collect::<FormResult<Vec<_>>>()?;
        field.options = if field_type.allows_nesting() || nodes.iter().all(OptionNode::is_leaf) {
            nodes
        } else {
            migrations.push(format!(
                "field {}: nested options flattened for `{}` field",
                idx, field_type
            ));
            flatten_to_leaves(nodes)
        };
    } else if !raw_options.is_empty() {
        migrations.push(format!(
            "field {}: options dropped from non-choice `{}` field",
            idx, field_type
        ));
    }

    if field_type == FieldType::File {
        field.file_reference = object
            .get("file")
            .and_then(Value::as_str)
            .map(str::to_string);
    }
    Ok(field)
}

fn string_property(object: &Map<String, Value>, key: &str) -> String {
    object
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn node_from_json(
    value: &Value,
    field_idx: usize,
    migrations: &mut Vec<String>,
) -> FormResult<OptionNode> {
    match value {
        Value::String(text) => Ok(OptionNode::leaf(text.clone())),
        Value::Number(_) | Value::Bool(_) => Ok(OptionNode::leaf(value.to_string())),
        Value::Object(object) => {
            let label = string_property(object, "label");
            let is_package = object
                .get("isPackage")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            let children = match object.get("options") {
                Some(Value::Array(items)) => items
                    .iter()
                    .map(|child| node_from_json(child, field_idx, migrations))
                    .collect::<FormResult<Vec<_>>>()?,
                _ => Vec::new(),
            };
            let raw_pairs = match object.get("keyValuePairs") {
                Some(Value::Object(pairs)) => Some(pairs),
                _ => None,
            };
            if is_package {
                if !children.is_empty() {
                    migrations.push(format!(
                        "field {}: package `{}` had {} child option(s); children dropped",
                        field_idx,
                        label,
                        children.len()
                    ));
                }
                let pairs = match raw_pairs {
                    Some(pairs) => pairs
                        .iter()
                        .map(|(key, value)| pair_from_json(key, value, field_idx))
                        .collect::<FormResult<Vec<_>>>()?,
                    None => Vec::new(),
                };
                Ok(OptionNode::package(label, pairs))
            } else {
                if raw_pairs.is_some_and(|pairs| !pairs.is_empty()) {
                    migrations.push(format!(
                        "field {}: key/value pairs ignored on non-package group `{}`",
                        field_idx, label
                    ));
                }
                Ok(OptionNode::group(label, children))
            }
        }
        other => Err(FormError::Payload(format!(
            "field {}: unsupported option value {}",
            field_idx, other
        ))),
    }
}

fn pair_from_json(key: &str, value: &Value, field_idx: usize) -> FormResult<KeyValueEntry> {
    let value = match value {
        Value::String(text) => KvValue::Text(text.clone()),
        Value::Number(_) | Value::Bool(_) => KvValue::Text(value.to_string()),
        Value::Null => KvValue::Text(String::new()),
        Value::Array(items) => KvValue::List(
            items
                .iter()
                .map(|item| match item {
                    Value::String(text) => Ok(text.clone()),
                    Value::Number(_) | Value::Bool(_) => Ok(item.to_string()),
                    _ => Err(FormError::Payload(format!(
                        "field {}: unsupported list item under key `{}`",
                        field_idx, key
                    ))),
                })
                .collect::<FormResult<Vec<_>>>()?,
        ),
        Value::Object(_) => {
            return Err(FormError::Payload(format!(
                "field {}: nested object under key `{}`",
                field_idx, key
            )))
        }
    };
    Ok(KeyValueEntry::new(key, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn same_name_different_bytes_gets_suffix() {
        let mut collector = AttachmentCollector::default();
        let first = collector
            .register(&FileValue::new("photo.png", vec![1]))
            .unwrap();
        let again = collector
            .register(&FileValue::new("photo.png", vec![1]))
            .unwrap();
        let other = collector
            .register(&FileValue::new("photo.png", vec![2]))
            .unwrap();
        assert_eq!(first, "photo.png");
        assert_eq!(again, "photo.png");
        assert_eq!(other, "photo-2.png");
        assert_eq!(collector.attachments.len(), 2);
    }

    #[test]
    fn stored_file_names_are_not_reused() {
        let mut saved = Field::new(FieldType::File).named("Cover");
        saved.file_reference = Some("photo.png".into());
        let mut fresh = Field::new(FieldType::File).named("Banner");
        fresh.attachment = Some(FileValue::new("photo.png", b"NEW".to_vec()));

        let serialized = serialize(&[saved, fresh]).unwrap();
        assert_eq!(serialized.data[0]["file"], json!("photo.png"));
        assert_eq!(serialized.data[1]["file"], json!("photo-2.png"));
        assert_eq!(serialized.attachments.len(), 1);
        assert_eq!(serialized.attachments[0].reference, "photo-2.png");
    }

    #[test]
    fn unnamed_files_are_rejected() {
        let mut collector = AttachmentCollector::default();
        let err = collector
            .register(&FileValue::new("  ", vec![1]))
            .unwrap_err();
        assert!(matches!(err, FormError::Payload(_)));
    }

    #[test]
    fn non_choice_fields_omit_options() {
        let serialized = serialize(&[Field::new(FieldType::Number).named("age")]).unwrap();
        assert_eq!(
            serialized.data,
            json!([{
                "type": "number",
                "fieldName": "age",
                "required": false,
                "placeholder": "",
                "switch": false
            }])
        );
    }

    #[test]
    fn hydrate_migrates_package_with_children() {
        let data = json!([{
            "type": "Nested select",
            "fieldName": "kit",
            "options": [{
                "label": "Box",
                "isPackage": true,
                "options": ["stray"],
                "keyValuePairs": { "size": "M", "count": 3 }
            }]
        }]);
        let hydrated = hydrate(&data).unwrap();
        assert_eq!(hydrated.migrations.len(), 1);
        let node = &hydrated.fields[0].options[0];
        assert!(node.is_package());
        assert!(node.children().is_empty());
        assert_eq!(node.pairs()[1].value, KvValue::text("3"));
    }

    #[test]
    fn hydrate_rejects_non_array_documents() {
        let err = hydrate(&json!({"type": "text"})).unwrap_err();
        assert!(matches!(err, FormError::Payload(_)));
    }

    #[test]
    fn hydrate_rejects_unknown_types() {
        let err = hydrate(&json!([{ "type": "slider" }])).unwrap_err();
        assert!(matches!(err, FormError::Payload(_)));
    }
}
