//! Path-addressed mutations of a field's nested option tree.
//!
//! Paths are only valid against the snapshot they were computed from; every
//! call resolves its path against the current tree.

use tracing::debug;

use crate::core::builder::FormBuilder;
use crate::domain::{
    ChildKind, EntryId, Field, KeyValueEntry, KvValue, NodeId, OptionNode, OptionPath,
};

use super::{ServiceError, ServiceResult};

/// Edit applied to an existing key/value entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairChange {
    Key(String),
    Value(KvValue),
}

pub struct OptionTreeService;

impl OptionTreeService {
    /// Appends a blank node under `path`, creating intermediate groups when the
    /// path reaches one past the end of a list. Leaves and packages are not
    /// containers. The tree is left untouched when any segment fails.
    pub fn add_child(
        builder: &mut FormBuilder,
        field_index: usize,
        path: &OptionPath,
        kind: ChildKind,
    ) -> ServiceResult<(NodeId, OptionPath)> {
        let field = builder.field_mut(field_index)?;
        ensure_tree_allowed(field, path, kind)?;
        let mut options = field.options.clone();
        let container = resolve_container_mut(&mut options, path, true)?;
        let node = OptionNode::blank(kind);
        let id = node.id();
        container.push(node);
        let created = path.child(container.len() - 1);
        field.options = options;
        debug!(field_index, path = %created, kind = ?kind, "option node added");
        Ok((id, created))
    }

    /// Splices the addressed node out of its parent list.
    pub fn remove_node(
        builder: &mut FormBuilder,
        field_index: usize,
        path: &OptionPath,
    ) -> ServiceResult<OptionNode> {
        let field = builder.field_mut(field_index)?;
        let (parent, last) = path.split_last().ok_or_else(|| root_path_error(path))?;
        let container = resolve_container_mut(&mut field.options, &parent, false)?;
        if last >= container.len() {
            return Err(out_of_range(path, last, container.len()));
        }
        let removed = container.remove(last);
        debug!(field_index, path = %path, "option node removed");
        Ok(removed)
    }

    pub fn rename_node(
        builder: &mut FormBuilder,
        field_index: usize,
        path: &OptionPath,
        label: impl Into<String>,
    ) -> ServiceResult<()> {
        let field = builder.field_mut(field_index)?;
        let node = resolve_node_mut(&mut field.options, path)?;
        node.set_label(label);
        Ok(())
    }

    /// Converts the addressed node between its group/leaf shape and a package.
    pub fn set_package_flag(
        builder: &mut FormBuilder,
        field_index: usize,
        path: &OptionPath,
        is_package: bool,
    ) -> ServiceResult<()> {
        let field = builder.field_mut(field_index)?;
        if !field.field_type.allows_nesting() {
            return Err(ServiceError::UnsupportedForType(field.field_type));
        }
        let node = resolve_node_mut(&mut field.options, path)?;
        let replacement = match (&mut *node, is_package) {
            (OptionNode::Package { .. }, true)
            | (OptionNode::Group { .. }, false)
            | (OptionNode::Leaf { .. }, false) => None,
            (OptionNode::Group { children, .. }, true) if !children.is_empty() => {
                return Err(ServiceError::PackageHasChildren(path.clone()));
            }
            (OptionNode::Group { id, label, .. }, true) => Some(OptionNode::Package {
                id: *id,
                label: std::mem::take(label),
                pairs: Vec::new(),
            }),
            (OptionNode::Leaf { id, value }, true) => Some(OptionNode::Package {
                id: *id,
                label: std::mem::take(value),
                pairs: Vec::new(),
            }),
            (OptionNode::Package { id, label, .. }, false) => Some(OptionNode::Group {
                id: *id,
                label: std::mem::take(label),
                children: Vec::new(),
            }),
        };
        if let Some(replacement) = replacement {
            *node = replacement;
            debug!(field_index, path = %path, is_package, "package flag changed");
        }
        Ok(())
    }

    /// Appends a key/value entry; keys are unique within one package.
    pub fn add_key_value_pair(
        builder: &mut FormBuilder,
        field_index: usize,
        path: &OptionPath,
        key: impl Into<String>,
        value: KvValue,
    ) -> ServiceResult<EntryId> {
        let key = key.into();
        let pairs = package_pairs_mut(builder, field_index, path)?;
        ensure_unique_key(pairs, &key, None)?;
        let entry = KeyValueEntry::new(key, value);
        let id = entry.id;
        pairs.push(entry);
        Ok(id)
    }

    /// Edits the entry at `pair_index`. Renaming keeps the entry's value and
    /// position; a rename onto an existing key fails with `DuplicateKey`.
    pub fn change_key_value_pair(
        builder: &mut FormBuilder,
        field_index: usize,
        path: &OptionPath,
        pair_index: usize,
        change: PairChange,
    ) -> ServiceResult<()> {
        let pairs = package_pairs_mut(builder, field_index, path)?;
        if pair_index >= pairs.len() {
            return Err(ServiceError::PairIndexOutOfRange {
                index: pair_index,
                len: pairs.len(),
            });
        }
        match change {
            PairChange::Key(key) => {
                ensure_unique_key(pairs, &key, Some(pair_index))?;
                pairs[pair_index].key = key;
            }
            PairChange::Value(value) => pairs[pair_index].value = value,
        }
        Ok(())
    }

    pub fn remove_key_value_pair(
        builder: &mut FormBuilder,
        field_index: usize,
        path: &OptionPath,
        pair_index: usize,
    ) -> ServiceResult<KeyValueEntry> {
        let pairs = package_pairs_mut(builder, field_index, path)?;
        if pair_index >= pairs.len() {
            return Err(ServiceError::PairIndexOutOfRange {
                index: pair_index,
                len: pairs.len(),
            });
        }
        Ok(pairs.remove(pair_index))
    }

    pub fn node<'a>(
        builder: &'a FormBuilder,
        field_index: usize,
        path: &OptionPath,
    ) -> ServiceResult<&'a OptionNode> {
        let field = builder.field(field_index)?;
        resolve_node(&field.options, path)
    }
}

fn ensure_tree_allowed(field: &Field, path: &OptionPath, kind: ChildKind) -> ServiceResult<()> {
    if !field.field_type.is_choice() {
        return Err(ServiceError::UnsupportedForType(field.field_type));
    }
    let nests = kind == ChildKind::Group || !path.is_root();
    if nests && !field.field_type.allows_nesting() {
        return Err(ServiceError::UnsupportedForType(field.field_type));
    }
    Ok(())
}

fn ensure_unique_key(
    pairs: &[KeyValueEntry],
    candidate: &str,
    exclude: Option<usize>,
) -> ServiceResult<()> {
    let normalized = candidate.trim();
    let duplicate = pairs
        .iter()
        .enumerate()
        .any(|(idx, entry)| Some(idx) != exclude && entry.key.trim() == normalized);
    if duplicate {
        Err(ServiceError::DuplicateKey(normalized.to_string()))
    } else {
        Ok(())
    }
}

fn package_pairs_mut<'a>(
    builder: &'a mut FormBuilder,
    field_index: usize,
    path: &OptionPath,
) -> ServiceResult<&'a mut Vec<KeyValueEntry>> {
    let field = builder.field_mut(field_index)?;
    let node = resolve_node_mut(&mut field.options, path)?;
    node.pairs_mut()
        .ok_or_else(|| ServiceError::NotAPackage(path.clone()))
}

fn root_path_error(path: &OptionPath) -> ServiceError {
    ServiceError::InvalidPath {
        path: path.clone(),
        reason: "the root list is not a node".into(),
    }
}

fn out_of_range(path: &OptionPath, index: usize, len: usize) -> ServiceError {
    ServiceError::InvalidPath {
        path: path.clone(),
        reason: format!("index {} out of range (list has {} entries)", index, len),
    }
}

fn resolve_container_mut<'a>(
    options: &'a mut Vec<OptionNode>,
    path: &OptionPath,
    create: bool,
) -> ServiceResult<&'a mut Vec<OptionNode>> {
    let mut current = options;
    for (depth, &idx) in path.indices().iter().enumerate() {
        let prefix = OptionPath::from(&path.indices()[..=depth]);
        if idx > current.len() || (idx == current.len() && !create) {
            return Err(out_of_range(&prefix, idx, current.len()));
        }
        if idx == current.len() {
            current.push(OptionNode::group("", Vec::new()));
        }
        current = match &mut current[idx] {
            OptionNode::Group { children, .. } => children,
            _ => return Err(ServiceError::NotAContainer(prefix)),
        };
    }
    Ok(current)
}

fn resolve_node_mut<'a>(
    options: &'a mut Vec<OptionNode>,
    path: &OptionPath,
) -> ServiceResult<&'a mut OptionNode> {
    let (parent, last) = path.split_last().ok_or_else(|| root_path_error(path))?;
    let container = resolve_container_mut(options, &parent, false)?;
    let len = container.len();
    container
        .get_mut(last)
        .ok_or_else(|| out_of_range(path, last, len))
}

fn resolve_node<'a>(options: &'a [OptionNode], path: &OptionPath) -> ServiceResult<&'a OptionNode> {
    let (first, rest) = path
        .indices()
        .split_first()
        .ok_or_else(|| root_path_error(path))?;
    let mut node = options
        .get(*first)
        .ok_or_else(|| out_of_range(path, *first, options.len()))?;
    for &idx in rest {
        let children = match node {
            OptionNode::Group { children, .. } => children,
            _ => return Err(ServiceError::NotAContainer(path.clone())),
        };
        node = children
            .get(idx)
            .ok_or_else(|| out_of_range(path, idx, children.len()))?;
    }
    Ok(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::services::FieldListService;
    use crate::domain::{FieldProperty, FieldType};

    fn nested_builder() -> FormBuilder {
        let mut builder = FormBuilder::new();
        FieldListService::add_field(&mut builder);
        FieldListService::set_field_property(
            &mut builder,
            0,
            FieldProperty::Type(FieldType::NestedSelect),
        )
        .unwrap();
        builder
    }

    fn root() -> OptionPath {
        OptionPath::root()
    }

    #[test]
    fn add_child_creates_missing_intermediate_group() {
        let mut builder = nested_builder();
        let (_, created) = OptionTreeService::add_child(
            &mut builder,
            0,
            &OptionPath::from(vec![0]),
            ChildKind::Leaf,
        )
        .unwrap();
        assert_eq!(created, OptionPath::from(vec![0, 0]));
        let options = &builder.field(0).unwrap().options;
        assert_eq!(options.len(), 1);
        assert_eq!(options[0].kind_name(), "group");
        assert_eq!(options[0].children().len(), 1);
    }

    #[test]
    fn add_child_under_leaf_is_not_a_container() {
        let mut builder = nested_builder();
        OptionTreeService::add_child(&mut builder, 0, &root(), ChildKind::Leaf).unwrap();
        OptionTreeService::rename_node(&mut builder, 0, &OptionPath::from(vec![0]), "Sizes")
            .unwrap();
        let before = builder.clone();
        let err = OptionTreeService::add_child(
            &mut builder,
            0,
            &OptionPath::from(vec![0]),
            ChildKind::Leaf,
        )
        .unwrap_err();
        assert!(matches!(err, ServiceError::NotAContainer(_)));
        assert_eq!(builder, before);
    }

    #[test]
    fn failed_add_child_leaves_no_intermediate_groups() {
        let mut builder = nested_builder();
        let err = OptionTreeService::add_child(
            &mut builder,
            0,
            &OptionPath::from(vec![0, 5]),
            ChildKind::Leaf,
        )
        .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidPath { .. }));
        assert!(builder.field(0).unwrap().options.is_empty());
    }

    #[test]
    fn add_child_rejects_paths_past_the_end() {
        let mut builder = nested_builder();
        let err = OptionTreeService::add_child(
            &mut builder,
            0,
            &OptionPath::from(vec![1]),
            ChildKind::Leaf,
        )
        .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidPath { .. }));
        assert!(builder.field(0).unwrap().options.is_empty());
    }

    #[test]
    fn packages_cannot_hold_children() {
        let mut builder = nested_builder();
        OptionTreeService::add_child(&mut builder, 0, &root(), ChildKind::Group).unwrap();
        let path = OptionPath::from(vec![0]);
        OptionTreeService::set_package_flag(&mut builder, 0, &path, true).unwrap();
        let err =
            OptionTreeService::add_child(&mut builder, 0, &path, ChildKind::Leaf).unwrap_err();
        assert!(matches!(err, ServiceError::NotAContainer(_)));
    }

    #[test]
    fn flat_choice_fields_reject_groups() {
        let mut builder = FormBuilder::new();
        FieldListService::add_field(&mut builder);
        FieldListService::set_field_property(
            &mut builder,
            0,
            FieldProperty::Type(FieldType::Select),
        )
        .unwrap();
        OptionTreeService::add_child(&mut builder, 0, &root(), ChildKind::Leaf).unwrap();
        let err =
            OptionTreeService::add_child(&mut builder, 0, &root(), ChildKind::Group).unwrap_err();
        assert!(matches!(
            err,
            ServiceError::UnsupportedForType(FieldType::Select)
        ));
    }

    #[test]
    fn text_fields_reject_options() {
        let mut builder = FormBuilder::new();
        FieldListService::add_field(&mut builder);
        let err =
            OptionTreeService::add_child(&mut builder, 0, &root(), ChildKind::Leaf).unwrap_err();
        assert!(matches!(err, ServiceError::UnsupportedForType(FieldType::Text)));
    }

    #[test]
    fn group_with_children_cannot_become_package() {
        let mut builder = nested_builder();
        let (_, group) =
            OptionTreeService::add_child(&mut builder, 0, &root(), ChildKind::Group).unwrap();
        OptionTreeService::add_child(&mut builder, 0, &group, ChildKind::Leaf).unwrap();
        let err = OptionTreeService::set_package_flag(&mut builder, 0, &group, true).unwrap_err();
        assert!(matches!(err, ServiceError::PackageHasChildren(_)));
        assert_eq!(
            OptionTreeService::node(&builder, 0, &group)
                .unwrap()
                .kind_name(),
            "group"
        );
    }

    #[test]
    fn unsetting_package_clears_pairs() {
        let mut builder = nested_builder();
        let (id, path) =
            OptionTreeService::add_child(&mut builder, 0, &root(), ChildKind::Group).unwrap();
        OptionTreeService::set_package_flag(&mut builder, 0, &path, true).unwrap();
        OptionTreeService::add_key_value_pair(&mut builder, 0, &path, "size", KvValue::text("M"))
            .unwrap();
        OptionTreeService::set_package_flag(&mut builder, 0, &path, false).unwrap();
        let node = OptionTreeService::node(&builder, 0, &path).unwrap();
        assert_eq!(node.id(), id);
        assert!(node.pairs().is_empty());
        assert_eq!(node.kind_name(), "group");
    }

    #[test]
    fn rename_key_keeps_value_and_position() {
        let mut builder = nested_builder();
        let (_, path) =
            OptionTreeService::add_child(&mut builder, 0, &root(), ChildKind::Group).unwrap();
        OptionTreeService::set_package_flag(&mut builder, 0, &path, true).unwrap();
        OptionTreeService::add_key_value_pair(&mut builder, 0, &path, "a", KvValue::text("1"))
            .unwrap();
        let second =
            OptionTreeService::add_key_value_pair(&mut builder, 0, &path, "b", KvValue::text("2"))
                .unwrap();
        OptionTreeService::change_key_value_pair(
            &mut builder,
            0,
            &path,
            1,
            PairChange::Key("c".into()),
        )
        .unwrap();
        let pairs = OptionTreeService::node(&builder, 0, &path).unwrap().pairs();
        assert_eq!(pairs[1].id, second);
        assert_eq!(pairs[1].key, "c");
        assert_eq!(pairs[1].value, KvValue::text("2"));
    }

    #[test]
    fn remove_pair_out_of_range_is_reported() {
        let mut builder = nested_builder();
        let (_, path) =
            OptionTreeService::add_child(&mut builder, 0, &root(), ChildKind::Leaf).unwrap();
        OptionTreeService::set_package_flag(&mut builder, 0, &path, true).unwrap();
        let err = OptionTreeService::remove_key_value_pair(&mut builder, 0, &path, 0).unwrap_err();
        assert!(matches!(
            err,
            ServiceError::PairIndexOutOfRange { index: 0, len: 0 }
        ));
    }
}
