//! Form-builder state and the command reducer over it.

use std::collections::HashSet;

use tracing::debug;

use crate::core::node_index::NodeIndex;
use crate::core::services::{FieldListService, OptionTreeService, PairChange};
use crate::domain::{
    ChildKind, EntryId, Field, FieldId, FieldProperty, FileValue, KvValue, NodeId, OptionPath,
};
use crate::errors::{FormError, FormResult};

/// In-memory state of one form-edit session: the ordered fields plus which
/// of them are expanded in the editor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormBuilder {
    pub(crate) fields: Vec<Field>,
    pub(crate) expanded: HashSet<FieldId>,
}

/// Parent addressed by an `AddChild` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeTarget {
    Root,
    Node(NodeId),
}

/// Typed mutation keyed by stable identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormCommand {
    AddField,
    RemoveField {
        field: FieldId,
    },
    MoveField {
        field: FieldId,
        to: usize,
    },
    SetProperty {
        field: FieldId,
        property: FieldProperty,
    },
    ToggleExpanded {
        field: FieldId,
    },
    SetAttachment {
        field: FieldId,
        file: Option<FileValue>,
    },
    AddChild {
        field: FieldId,
        parent: NodeTarget,
        kind: ChildKind,
    },
    RemoveNode {
        node: NodeId,
    },
    RenameNode {
        node: NodeId,
        label: String,
    },
    SetPackage {
        node: NodeId,
        is_package: bool,
    },
    AddPair {
        node: NodeId,
        key: String,
        value: KvValue,
    },
    SetPairKey {
        entry: EntryId,
        key: String,
    },
    SetPairValue {
        entry: EntryId,
        value: KvValue,
    },
    RemovePair {
        entry: EntryId,
    },
}

/// Identifier created by a command, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Created {
    Nothing,
    Field(FieldId),
    Node(NodeId),
    Entry(EntryId),
}

impl FormBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps hydrated fields; every field starts collapsed.
    pub fn from_fields(fields: Vec<Field>) -> Self {
        Self {
            fields,
            expanded: HashSet::new(),
        }
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field(&self, index: usize) -> FormResult<&Field> {
        let len = self.fields.len();
        self.fields
            .get(index)
            .ok_or(FormError::FieldIndexOutOfRange { index, len })
    }

    pub fn field_mut(&mut self, index: usize) -> FormResult<&mut Field> {
        let len = self.fields.len();
        self.fields
            .get_mut(index)
            .ok_or(FormError::FieldIndexOutOfRange { index, len })
    }

    pub fn position_of(&self, id: FieldId) -> Option<usize> {
        self.fields.iter().position(|field| field.id == id)
    }

    pub fn is_expanded(&self, id: FieldId) -> bool {
        self.expanded.contains(&id)
    }

    pub fn node_index(&self) -> NodeIndex {
        NodeIndex::build(&self.fields)
    }

    pub(crate) fn check_index(&self, index: usize) -> FormResult<()> {
        self.field(index).map(|_| ())
    }

    /// Applies `command` to a copy of this snapshot and returns the new one.
    pub fn apply(&self, command: FormCommand) -> FormResult<FormBuilder> {
        self.apply_with_outcome(command).map(|(next, _)| next)
    }

    /// Like [`FormBuilder::apply`], also reporting the identifier it created.
    pub fn apply_with_outcome(&self, command: FormCommand) -> FormResult<(FormBuilder, Created)> {
        let mut next = self.clone();
        let index = self.node_index();
        debug!(command = ?command_name(&command), "applying form command");
        let created = match command {
            FormCommand::AddField => Created::Field(FieldListService::add_field(&mut next)),
            FormCommand::RemoveField { field } => {
                let position = field_position(&index, field)?;
                FieldListService::remove_field(&mut next, position)?;
                Created::Nothing
            }
            FormCommand::MoveField { field, to } => {
                let position = field_position(&index, field)?;
                FieldListService::reorder(&mut next, position, to)?;
                Created::Nothing
            }
            FormCommand::SetProperty { field, property } => {
                let position = field_position(&index, field)?;
                FieldListService::set_field_property(&mut next, position, property)?;
                Created::Nothing
            }
            FormCommand::ToggleExpanded { field } => {
                let position = field_position(&index, field)?;
                FieldListService::toggle_expanded(&mut next, position)?;
                Created::Nothing
            }
            FormCommand::SetAttachment { field, file } => {
                let position = field_position(&index, field)?;
                FieldListService::set_field_attachment(&mut next, position, file)?;
                Created::Nothing
            }
            FormCommand::AddChild {
                field,
                parent,
                kind,
            } => {
                let position = field_position(&index, field)?;
                let path = match parent {
                    NodeTarget::Root => OptionPath::root(),
                    NodeTarget::Node(node) => {
                        let (owner, path) = node_path(&index, node)?;
                        if owner != position {
                            return Err(FormError::NodeNotFound(format!(
                                "{} does not belong to field {}",
                                node, field
                            )));
                        }
                        path
                    }
                };
                let (id, _) = OptionTreeService::add_child(&mut next, position, &path, kind)?;
                Created::Node(id)
            }
            FormCommand::RemoveNode { node } => {
                let (position, path) = node_path(&index, node)?;
                OptionTreeService::remove_node(&mut next, position, &path)?;
                Created::Nothing
            }
            FormCommand::RenameNode { node, label } => {
                let (position, path) = node_path(&index, node)?;
                OptionTreeService::rename_node(&mut next, position, &path, label)?;
                Created::Nothing
            }
            FormCommand::SetPackage { node, is_package } => {
                let (position, path) = node_path(&index, node)?;
                OptionTreeService::set_package_flag(&mut next, position, &path, is_package)?;
                Created::Nothing
            }
            FormCommand::AddPair { node, key, value } => {
                let (position, path) = node_path(&index, node)?;
                Created::Entry(OptionTreeService::add_key_value_pair(
                    &mut next, position, &path, key, value,
                )?)
            }
            FormCommand::SetPairKey { entry, key } => {
                let (position, path, pair_index) = entry_path(&index, entry)?;
                OptionTreeService::change_key_value_pair(
                    &mut next,
                    position,
                    &path,
                    pair_index,
                    PairChange::Key(key),
                )?;
                Created::Nothing
            }
            FormCommand::SetPairValue { entry, value } => {
                let (position, path, pair_index) = entry_path(&index, entry)?;
                OptionTreeService::change_key_value_pair(
                    &mut next,
                    position,
                    &path,
                    pair_index,
                    PairChange::Value(value),
                )?;
                Created::Nothing
            }
            FormCommand::RemovePair { entry } => {
                let (position, path, pair_index) = entry_path(&index, entry)?;
                OptionTreeService::remove_key_value_pair(&mut next, position, &path, pair_index)?;
                Created::Nothing
            }
        };
        Ok((next, created))
    }
}

fn command_name(command: &FormCommand) -> &'static str {
    match command {
        FormCommand::AddField => "add_field",
        FormCommand::RemoveField { .. } => "remove_field",
        FormCommand::MoveField { .. } => "move_field",
        FormCommand::SetProperty { .. } => "set_property",
        FormCommand::ToggleExpanded { .. } => "toggle_expanded",
        FormCommand::SetAttachment { .. } => "set_attachment",
        FormCommand::AddChild { .. } => "add_child",
        FormCommand::RemoveNode { .. } => "remove_node",
        FormCommand::RenameNode { .. } => "rename_node",
        FormCommand::SetPackage { .. } => "set_package",
        FormCommand::AddPair { .. } => "add_pair",
        FormCommand::SetPairKey { .. } => "set_pair_key",
        FormCommand::SetPairValue { .. } => "set_pair_value",
        FormCommand::RemovePair { .. } => "remove_pair",
    }
}

fn field_position(index: &NodeIndex, field: FieldId) -> FormResult<usize> {
    index
        .field_position(field)
        .ok_or_else(|| FormError::FieldNotFound(field.to_string()))
}

fn node_path(index: &NodeIndex, node: NodeId) -> FormResult<(usize, OptionPath)> {
    let location = index
        .locate_node(node)
        .ok_or_else(|| FormError::NodeNotFound(node.to_string()))?;
    let position = field_position(index, location.field)?;
    Ok((position, location.path.clone()))
}

fn entry_path(index: &NodeIndex, entry: EntryId) -> FormResult<(usize, OptionPath, usize)> {
    let location = index
        .locate_entry(entry)
        .ok_or_else(|| FormError::NodeNotFound(format!("entry {}", entry)))?;
    let position = field_position(index, location.field)?;
    Ok((position, location.path.clone(), location.pair_index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FieldType;

    fn created_field(created: Created) -> FieldId {
        match created {
            Created::Field(id) => id,
            other => panic!("expected field, got {other:?}"),
        }
    }

    fn created_node(created: Created) -> NodeId {
        match created {
            Created::Node(id) => id,
            other => panic!("expected node, got {other:?}"),
        }
    }

    #[test]
    fn apply_leaves_previous_snapshot_untouched() {
        let empty = FormBuilder::new();
        let (next, created) = empty.apply_with_outcome(FormCommand::AddField).unwrap();
        let field = created_field(created);
        assert!(empty.is_empty());
        assert_eq!(next.len(), 1);
        assert!(next.is_expanded(field));
    }

    #[test]
    fn failed_command_returns_error_without_partial_state() {
        let (builder, created) = FormBuilder::new()
            .apply_with_outcome(FormCommand::AddField)
            .unwrap();
        let field = created_field(created);
        let err = builder
            .apply(FormCommand::AddChild {
                field,
                parent: NodeTarget::Root,
                kind: ChildKind::Group,
            })
            .unwrap_err();
        assert!(matches!(err, FormError::UnsupportedForType(FieldType::Text)));
        assert!(builder.field(0).unwrap().options.is_empty());
    }

    #[test]
    fn commands_follow_nodes_across_reorders() {
        let (builder, created) = FormBuilder::new()
            .apply_with_outcome(FormCommand::AddField)
            .unwrap();
        let field = created_field(created);
        let builder = builder
            .apply(FormCommand::SetProperty {
                field,
                property: FieldProperty::Type(FieldType::NestedSelect),
            })
            .unwrap();
        let (builder, first) = builder
            .apply_with_outcome(FormCommand::AddChild {
                field,
                parent: NodeTarget::Root,
                kind: ChildKind::Leaf,
            })
            .unwrap();
        let (builder, second) = builder
            .apply_with_outcome(FormCommand::AddChild {
                field,
                parent: NodeTarget::Root,
                kind: ChildKind::Leaf,
            })
            .unwrap();
        let first = created_node(first);
        let second = created_node(second);
        let builder = builder.apply(FormCommand::RemoveNode { node: first }).unwrap();
        let builder = builder
            .apply(FormCommand::RenameNode {
                node: second,
                label: "Blue".into(),
            })
            .unwrap();
        let options = &builder.field(0).unwrap().options;
        assert_eq!(options.len(), 1);
        assert_eq!(options[0].id(), second);
        assert_eq!(options[0].label(), "Blue");
    }

    #[test]
    fn unknown_ids_are_reported() {
        let err = FormBuilder::new()
            .apply(FormCommand::RemoveNode {
                node: NodeId::new(),
            })
            .unwrap_err();
        assert!(matches!(err, FormError::NodeNotFound(_)));
    }
}
