//! Shared identifiers and traits for form-schema primitives.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Supplies a presentation-ready label for UI or logs.
pub trait Displayable {
    fn display_label(&self) -> String;
}

macro_rules! stable_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn as_uuid(&self) -> Uuid {
                self.0
            }

            /// First eight hex digits, used in shell output.
            pub fn short(&self) -> String {
                let mut short = self.0.simple().to_string();
                short.truncate(8);
                short
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

stable_id!(
    /// Durable identity of a field, assigned when the field is created or hydrated.
    FieldId
);
stable_id!(
    /// Durable identity of an option-tree node.
    NodeId
);
stable_id!(
    /// Durable identity of a key/value entry inside a package node.
    EntryId
);

// Re-export common dependencies so consumers can rely on this module as a façade.
pub use serde;
pub use uuid;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_and_short_form_is_eight_chars() {
        let a = NodeId::new();
        let b = NodeId::new();
        assert_ne!(a, b);
        assert_eq!(a.short().len(), 8);
        assert!(a.to_string().starts_with(&a.short()));
    }
}
