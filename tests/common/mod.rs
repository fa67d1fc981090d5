#![allow(dead_code)]

use std::{path::PathBuf, sync::Mutex};

use formdesk_core::{
    core::builder::{Created, FormBuilder, FormCommand, NodeTarget},
    domain::{ChildKind, EntryId, FieldId, FieldProperty, FieldType, KvValue, NodeId},
    storage::JsonFormStore,
};
use once_cell::sync::Lazy;
use tempfile::TempDir;

/// Holds TempDir guards so temporary folders live for the duration of the test run.
static TEST_DIRS: Lazy<Mutex<Vec<TempDir>>> = Lazy::new(|| Mutex::new(Vec::new()));

/// Creates a unique directory that outlives the calling test.
pub fn temp_base() -> PathBuf {
    let temp = TempDir::new().expect("create temp dir");
    let base = temp.path().to_path_buf();
    TEST_DIRS.lock().expect("lock temp dir registry").push(temp);
    base
}

pub fn setup_store() -> JsonFormStore {
    JsonFormStore::new(temp_base().join("forms")).expect("create json form store")
}

pub fn add_field(builder: &FormBuilder, kind: FieldType, name: &str) -> (FormBuilder, FieldId) {
    let (next, created) = builder
        .apply_with_outcome(FormCommand::AddField)
        .expect("add field");
    let Created::Field(field) = created else {
        panic!("expected a field, got {created:?}");
    };
    let next = next
        .apply(FormCommand::SetProperty {
            field,
            property: FieldProperty::Type(kind),
        })
        .and_then(|next| {
            next.apply(FormCommand::SetProperty {
                field,
                property: FieldProperty::Name(name.into()),
            })
        })
        .expect("set field properties");
    (next, field)
}

pub fn add_node(
    builder: &FormBuilder,
    field: FieldId,
    parent: NodeTarget,
    kind: ChildKind,
    label: &str,
) -> (FormBuilder, NodeId) {
    let (next, created) = builder
        .apply_with_outcome(FormCommand::AddChild {
            field,
            parent,
            kind,
        })
        .expect("add child");
    let Created::Node(node) = created else {
        panic!("expected a node, got {created:?}");
    };
    let next = next
        .apply(FormCommand::RenameNode {
            node,
            label: label.into(),
        })
        .expect("rename node");
    (next, node)
}

pub fn add_pair(builder: &FormBuilder, node: NodeId, key: &str, value: KvValue) -> (FormBuilder, EntryId) {
    let (next, created) = builder
        .apply_with_outcome(FormCommand::AddPair {
            node,
            key: key.into(),
            value,
        })
        .expect("add pair");
    let Created::Entry(entry) = created else {
        panic!("expected an entry, got {created:?}");
    };
    (next, entry)
}
