//! Read-only preview of the form being authored.
//!
//! The preview is a pure function of the field list and tolerates fields
//! that are only partially filled in.

use std::fmt::Write as _;

use crate::domain::{Field, FieldType, OptionNode, OptionPath};

const NO_OPTIONS: &str = "(no options)";
const BLANK: &str = "(blank)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewControl {
    TextInput,
    TextArea,
    NumberInput,
    Dropdown,
    NestedDropdown,
    RadioGroup,
    CheckboxGroup,
    Toggle,
    DatePicker,
    FileUpload,
    Generic,
}

impl PreviewControl {
    fn for_type(field_type: FieldType) -> Self {
        match field_type {
            FieldType::Text => PreviewControl::TextInput,
            FieldType::Textarea => PreviewControl::TextArea,
            FieldType::Number => PreviewControl::NumberInput,
            FieldType::Select => PreviewControl::Dropdown,
            FieldType::NestedSelect => PreviewControl::NestedDropdown,
            FieldType::Radio => PreviewControl::RadioGroup,
            FieldType::Checkbox => PreviewControl::CheckboxGroup,
            FieldType::Switch | FieldType::Boolean => PreviewControl::Toggle,
            FieldType::Date => PreviewControl::DatePicker,
            FieldType::File => PreviewControl::FileUpload,
            FieldType::Other => PreviewControl::Generic,
        }
    }

    fn takes_placeholder(self) -> bool {
        matches!(
            self,
            PreviewControl::TextInput
                | PreviewControl::TextArea
                | PreviewControl::NumberInput
                | PreviewControl::Generic
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            PreviewControl::TextInput => "text input",
            PreviewControl::TextArea => "text area",
            PreviewControl::NumberInput => "number input",
            PreviewControl::Dropdown => "dropdown",
            PreviewControl::NestedDropdown => "nested dropdown",
            PreviewControl::RadioGroup => "radio group",
            PreviewControl::CheckboxGroup => "checkboxes",
            PreviewControl::Toggle => "toggle",
            PreviewControl::DatePicker => "date picker",
            PreviewControl::FileUpload => "file upload",
            PreviewControl::Generic => "input",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewChoice {
    pub path: OptionPath,
    pub depth: usize,
    pub label: String,
    pub is_group: bool,
    pub package_keys: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewItem {
    pub label: String,
    pub control: PreviewControl,
    pub required: bool,
    pub placeholder: Option<String>,
    pub choices: Vec<PreviewChoice>,
    pub file_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreviewDocument {
    pub items: Vec<PreviewItem>,
}

pub fn render_preview(fields: &[Field]) -> PreviewDocument {
    let items = fields
        .iter()
        .enumerate()
        .map(|(idx, field)| preview_item(idx, field))
        .collect();
    PreviewDocument { items }
}

fn preview_item(idx: usize, field: &Field) -> PreviewItem {
    let label = match field.field_name.trim() {
        "" => format!("Untitled field {}", idx + 1),
        name => name.to_string(),
    };
    let control = PreviewControl::for_type(field.field_type);
    let placeholder = if control.takes_placeholder() {
        Some(match field.placeholder.trim() {
            "" => format!("Enter {}", label.to_lowercase()),
            text => text.to_string(),
        })
    } else {
        None
    };
    let choices = if field.field_type.is_choice() {
        let mut choices = Vec::new();
        collect_choices(&field.options, &OptionPath::root(), &mut choices);
        if choices.is_empty() {
            choices.push(PreviewChoice {
                path: OptionPath::root(),
                depth: 0,
                label: NO_OPTIONS.into(),
                is_group: false,
                package_keys: Vec::new(),
            });
        }
        choices
    } else {
        Vec::new()
    };
    let file_name = field
        .attachment
        .as_ref()
        .map(|file| file.name.clone())
        .or_else(|| field.file_reference.clone());
    PreviewItem {
        label,
        control,
        required: field.required,
        placeholder,
        choices,
        file_name,
    }
}

fn collect_choices(nodes: &[OptionNode], parent: &OptionPath, out: &mut Vec<PreviewChoice>) {
    for (idx, node) in nodes.iter().enumerate() {
        let path = parent.child(idx);
        let label = match node.label().trim() {
            "" => BLANK.to_string(),
            text => text.to_string(),
        };
        out.push(PreviewChoice {
            depth: parent.depth(),
            path: path.clone(),
            label,
            is_group: !node.is_leaf(),
            package_keys: node.pairs().iter().map(|pair| pair.key.clone()).collect(),
        });
        collect_choices(node.children(), &path, out);
    }
}

impl PreviewDocument {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Indented plain-text rendering; `*` marks required fields.
    pub fn render_text(&self) -> String {
        self.render(false)
    }

    /// Like [`PreviewDocument::render_text`], prefixing each option with its
    /// tree path.
    pub fn render_text_with_paths(&self) -> String {
        self.render(true)
    }

    fn render(&self, show_paths: bool) -> String {
        if self.items.is_empty() {
            return "(empty form)\n".to_string();
        }
        let mut output = String::new();
        for item in &self.items {
            let marker = if item.required { " *" } else { "" };
            let _ = writeln!(output, "{}{} [{}]", item.label, marker, item.control.label());
            if let Some(placeholder) = &item.placeholder {
                let _ = writeln!(output, "  placeholder: {}", placeholder);
            }
            if let Some(file) = &item.file_name {
                let _ = writeln!(output, "  file: {}", file);
            }
            for choice in &item.choices {
                let indent = "  ".repeat(choice.depth + 1);
                let bullet = if choice.is_group { "+" } else { "-" };
                let _ = write!(output, "{}{} ", indent, bullet);
                if show_paths && !choice.path.is_root() {
                    let _ = write!(output, "{} ", choice.path);
                }
                output.push_str(&choice.label);
                if !choice.package_keys.is_empty() {
                    let _ = write!(output, " {{{}}}", choice.package_keys.join(", "));
                }
                output.push('\n');
            }
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::option_tree::text_entry;

    #[test]
    fn partial_fields_get_defaults() {
        let fields = vec![
            Field::new(FieldType::Text),
            Field::new(FieldType::Select).named("Size"),
        ];
        let preview = render_preview(&fields);
        assert_eq!(preview.items[0].label, "Untitled field 1");
        assert_eq!(
            preview.items[0].placeholder.as_deref(),
            Some("Enter untitled field 1")
        );
        assert_eq!(preview.items[1].choices[0].label, NO_OPTIONS);
        assert!(preview.items[1].placeholder.is_none());
    }

    #[test]
    fn preview_does_not_mutate_fields() {
        let fields = vec![Field::new(FieldType::NestedSelect)
            .named("Kit")
            .with_options(vec![OptionNode::package("Box", vec![text_entry("size", "M")])])];
        let snapshot = fields.clone();
        let _ = render_preview(&fields).render_text();
        assert_eq!(fields, snapshot);
    }

    #[test]
    fn renders_nested_choices_with_indentation() {
        let fields = vec![Field::new(FieldType::NestedSelect)
            .named("Colour")
            .required()
            .with_options(vec![
                OptionNode::group("Warm", vec![OptionNode::leaf("Red"), OptionNode::leaf("")]),
                OptionNode::package("Kit", vec![text_entry("image", "a.png")]),
            ])];
        let text = render_preview(&fields).render_text();
        let expected = "Colour * [nested dropdown]\n  + Warm\n    - Red\n    - (blank)\n  + Kit {image}\n";
        assert_eq!(text, expected);

        let with_paths = render_preview(&fields).render_text_with_paths();
        assert!(with_paths.contains("  + 0 Warm\n    - 0.0 Red\n"));
    }
}
