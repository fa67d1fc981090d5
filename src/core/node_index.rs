//! Lookup table from stable identifiers to current positions.
//!
//! Paths shift whenever the tree changes shape, so the index is rebuilt from
//! scratch after every structural mutation instead of being patched.

use std::collections::HashMap;

use crate::domain::{EntryId, Field, FieldId, NodeId, OptionNode, OptionPath};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeLocation {
    pub field: FieldId,
    pub path: OptionPath,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryLocation {
    pub field: FieldId,
    pub node: NodeId,
    pub path: OptionPath,
    pub pair_index: usize,
}

#[derive(Debug, Clone, Default)]
pub struct NodeIndex {
    fields: HashMap<FieldId, usize>,
    nodes: HashMap<NodeId, NodeLocation>,
    entries: HashMap<EntryId, EntryLocation>,
}

impl NodeIndex {
    pub fn build(fields: &[Field]) -> Self {
        let mut index = NodeIndex::default();
        for (position, field) in fields.iter().enumerate() {
            index.fields.insert(field.id, position);
            for (idx, node) in field.options.iter().enumerate() {
                index.visit(field.id, node, OptionPath::root().child(idx));
            }
        }
        index
    }

    fn visit(&mut self, field: FieldId, node: &OptionNode, path: OptionPath) {
        match node {
            OptionNode::Leaf { .. } => {}
            OptionNode::Group { children, .. } => {
                for (idx, child) in children.iter().enumerate() {
                    self.visit(field, child, path.child(idx));
                }
            }
            OptionNode::Package { id, pairs, .. } => {
                for (pair_index, entry) in pairs.iter().enumerate() {
                    self.entries.insert(
                        entry.id,
                        EntryLocation {
                            field,
                            node: *id,
                            path: path.clone(),
                            pair_index,
                        },
                    );
                }
            }
        }
        self.nodes.insert(node.id(), NodeLocation { field, path });
    }

    pub fn field_position(&self, field: FieldId) -> Option<usize> {
        self.fields.get(&field).copied()
    }

    pub fn locate_node(&self, node: NodeId) -> Option<&NodeLocation> {
        self.nodes.get(&node)
    }

    pub fn locate_entry(&self, entry: EntryId) -> Option<&EntryLocation> {
        self.entries.get(&entry)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}
