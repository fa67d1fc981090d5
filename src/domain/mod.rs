//! Pure form-schema models. No I/O, no shell, no storage.

pub mod common;
pub mod field;
pub mod key_value;
pub mod option_tree;
pub mod path;

pub use common::{Displayable, EntryId, FieldId, NodeId};
pub use field::{Field, FieldProperty, FieldType};
pub use key_value::{FileValue, KeyValueEntry, KvValue};
pub use option_tree::{ChildKind, OptionNode};
pub use path::OptionPath;
