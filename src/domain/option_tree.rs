//! Recursive option structure attached to choice fields.

use crate::domain::{
    common::NodeId,
    key_value::{KeyValueEntry, KvValue},
};

/// A node of a nested option tree.
///
/// A node is exactly one of a plain leaf, a traversable group, or a package
/// carrying key/value data. Packages never hold children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionNode {
    Leaf {
        id: NodeId,
        value: String,
    },
    Group {
        id: NodeId,
        label: String,
        children: Vec<OptionNode>,
    },
    Package {
        id: NodeId,
        label: String,
        pairs: Vec<KeyValueEntry>,
    },
}

/// Shape requested when appending a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildKind {
    Leaf,
    Group,
}

impl OptionNode {
    pub fn leaf(value: impl Into<String>) -> Self {
        OptionNode::Leaf {
            id: NodeId::new(),
            value: value.into(),
        }
    }

    pub fn group(label: impl Into<String>, children: Vec<OptionNode>) -> Self {
        OptionNode::Group {
            id: NodeId::new(),
            label: label.into(),
            children,
        }
    }

    pub fn package(label: impl Into<String>, pairs: Vec<KeyValueEntry>) -> Self {
        OptionNode::Package {
            id: NodeId::new(),
            label: label.into(),
            pairs,
        }
    }

    pub fn blank(kind: ChildKind) -> Self {
        match kind {
            ChildKind::Leaf => OptionNode::leaf(""),
            ChildKind::Group => OptionNode::group("", Vec::new()),
        }
    }

    pub fn id(&self) -> NodeId {
        match self {
            OptionNode::Leaf { id, .. }
            | OptionNode::Group { id, .. }
            | OptionNode::Package { id, .. } => *id,
        }
    }

    /// Leaf value or group/package label.
    pub fn label(&self) -> &str {
        match self {
            OptionNode::Leaf { value, .. } => value,
            OptionNode::Group { label, .. } | OptionNode::Package { label, .. } => label,
        }
    }

    pub fn set_label(&mut self, text: impl Into<String>) {
        match self {
            OptionNode::Leaf { value, .. } => *value = text.into(),
            OptionNode::Group { label, .. } | OptionNode::Package { label, .. } => {
                *label = text.into()
            }
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            OptionNode::Leaf { .. } => "leaf",
            OptionNode::Group { .. } => "group",
            OptionNode::Package { .. } => "package",
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, OptionNode::Leaf { .. })
    }

    pub fn is_package(&self) -> bool {
        matches!(self, OptionNode::Package { .. })
    }

    pub fn children(&self) -> &[OptionNode] {
        match self {
            OptionNode::Group { children, .. } => children,
            _ => &[],
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<OptionNode>> {
        match self {
            OptionNode::Group { children, .. } => Some(children),
            _ => None,
        }
    }

    pub fn pairs(&self) -> &[KeyValueEntry] {
        match self {
            OptionNode::Package { pairs, .. } => pairs,
            _ => &[],
        }
    }

    pub fn pairs_mut(&mut self) -> Option<&mut Vec<KeyValueEntry>> {
        match self {
            OptionNode::Package { pairs, .. } => Some(pairs),
            _ => None,
        }
    }

    /// Total number of nodes in this subtree, including `self`.
    pub fn subtree_len(&self) -> usize {
        1 + self
            .children()
            .iter()
            .map(OptionNode::subtree_len)
            .sum::<usize>()
    }
}

/// Depth-first flattening of a forest into leaf values, used when a field
/// moves from a nested select to a flat choice kind.
pub fn flatten_to_leaves(nodes: Vec<OptionNode>) -> Vec<OptionNode> {
    let mut flat = Vec::new();
    for node in nodes {
        match node {
            OptionNode::Leaf { .. } => flat.push(node),
            OptionNode::Group {
                id,
                label,
                children,
            } => {
                flat.push(OptionNode::Leaf { id, value: label });
                flat.extend(flatten_to_leaves(children));
            }
            OptionNode::Package { id, label, .. } => {
                flat.push(OptionNode::Leaf { id, value: label })
            }
        }
    }
    flat
}

/// Builds a text entry; convenience for tests and the shell.
pub fn text_entry(key: impl Into<String>, value: impl Into<String>) -> KeyValueEntry {
    KeyValueEntry::new(key, KvValue::Text(value.into()))
}
