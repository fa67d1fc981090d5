//! Field definitions of a dynamically authored form.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::domain::{
    common::{Displayable, FieldId},
    key_value::FileValue,
    option_tree::OptionNode,
};

/// Supported input kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldType {
    #[default]
    Text,
    Textarea,
    Number,
    Select,
    NestedSelect,
    Radio,
    Checkbox,
    Switch,
    Boolean,
    Date,
    File,
    Other,
}

impl FieldType {
    pub const ALL: [FieldType; 12] = [
        FieldType::Text,
        FieldType::Textarea,
        FieldType::Number,
        FieldType::Select,
        FieldType::NestedSelect,
        FieldType::Radio,
        FieldType::Checkbox,
        FieldType::Switch,
        FieldType::Boolean,
        FieldType::Date,
        FieldType::File,
        FieldType::Other,
    ];

    /// Choice kinds are the only ones allowed to carry options.
    pub fn is_choice(self) -> bool {
        matches!(
            self,
            FieldType::Select | FieldType::NestedSelect | FieldType::Radio | FieldType::Checkbox
        )
    }

    /// Only nested selects may hold groups and packages.
    pub fn allows_nesting(self) -> bool {
        self == FieldType::NestedSelect
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Textarea => "textarea",
            FieldType::Number => "number",
            FieldType::Select => "select",
            FieldType::NestedSelect => "nested-select",
            FieldType::Radio => "radio",
            FieldType::Checkbox => "checkbox",
            FieldType::Switch => "switch",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
            FieldType::File => "file",
            FieldType::Other => "other",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = String;

    /// Accepts the canonical names plus legacy labels such as `Nested select`.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let normalized: String = input
            .trim()
            .to_ascii_lowercase()
            .chars()
            .map(|c| if c == ' ' || c == '_' { '-' } else { c })
            .collect();
        FieldType::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| format!("unknown field type `{}`", input.trim()))
    }
}

/// One logical input definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub id: FieldId,
    pub field_type: FieldType,
    pub field_name: String,
    pub required: bool,
    pub placeholder: String,
    pub options: Vec<OptionNode>,
    /// Legacy flag carried alongside `boolean` fields.
    pub switch: bool,
    /// Uploaded file of a `file` field.
    pub attachment: Option<FileValue>,
    /// Reference name of a file uploaded in an earlier session.
    pub file_reference: Option<String>,
}

impl Field {
    pub fn new(field_type: FieldType) -> Self {
        Self {
            id: FieldId::new(),
            field_type,
            field_name: String::new(),
            required: false,
            placeholder: String::new(),
            options: Vec::new(),
            switch: field_type == FieldType::Boolean,
            attachment: None,
            file_reference: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.field_name = name.into();
        self
    }

    pub fn with_options(mut self, options: Vec<OptionNode>) -> Self {
        self.options = options;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

impl Default for Field {
    fn default() -> Self {
        Field::new(FieldType::Text)
    }
}

impl Displayable for Field {
    fn display_label(&self) -> String {
        let name = if self.field_name.trim().is_empty() {
            "(unnamed)"
        } else {
            self.field_name.as_str()
        };
        format!("{} ({})", name, self.field_type)
    }
}

/// Editable scalar properties of a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldProperty {
    Type(FieldType),
    Name(String),
    Required(bool),
    Placeholder(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_legacy_nested_select_label() {
        assert_eq!(
            "Nested select".parse::<FieldType>(),
            Ok(FieldType::NestedSelect)
        );
        assert_eq!("TEXTAREA".parse::<FieldType>(), Ok(FieldType::Textarea));
        assert!("slider".parse::<FieldType>().is_err());
    }

    #[test]
    fn serde_uses_kebab_case_names() {
        let json = serde_json::to_string(&FieldType::NestedSelect).unwrap();
        assert_eq!(json, "\"nested-select\"");
    }

    #[test]
    fn boolean_fields_start_with_switch_flag() {
        assert!(Field::new(FieldType::Boolean).switch);
        assert!(!Field::new(FieldType::Text).switch);
    }
}
