use tracing::debug;

use crate::core::builder::FormBuilder;
use crate::domain::{
    option_tree::flatten_to_leaves, Field, FieldId, FieldProperty, FieldType, FileValue,
};

use super::{ServiceError, ServiceResult};

/// Index-addressed operations over the ordered field list.
pub struct FieldListService;

impl FieldListService {
    /// Appends a blank text field and marks it expanded.
    pub fn add_field(builder: &mut FormBuilder) -> FieldId {
        let field = Field::new(FieldType::Text);
        let id = field.id;
        builder.fields.push(field);
        builder.expanded.insert(id);
        debug!(field = %id, position = builder.fields.len() - 1, "field added");
        id
    }

    /// Removes the field at `index` together with its expansion flag.
    pub fn remove_field(builder: &mut FormBuilder, index: usize) -> ServiceResult<Field> {
        builder.check_index(index)?;
        let field = builder.fields.remove(index);
        builder.expanded.remove(&field.id);
        debug!(field = %field.id, index, "field removed");
        Ok(field)
    }

    /// Moves one field with a single splice: remove at `from`, insert at `to`.
    pub fn reorder(builder: &mut FormBuilder, from: usize, to: usize) -> ServiceResult<()> {
        builder.check_index(from)?;
        builder.check_index(to)?;
        if from == to {
            return Ok(());
        }
        let field = builder.fields.remove(from);
        builder.fields.insert(to, field);
        debug!(from, to, "field reordered");
        Ok(())
    }

    pub fn set_field_property(
        builder: &mut FormBuilder,
        index: usize,
        property: FieldProperty,
    ) -> ServiceResult<()> {
        let field = builder.field_mut(index)?;
        match property {
            FieldProperty::Type(kind) => change_type(field, kind),
            FieldProperty::Name(name) => field.field_name = name,
            FieldProperty::Required(required) => field.required = required,
            FieldProperty::Placeholder(placeholder) => field.placeholder = placeholder,
        }
        Ok(())
    }

    /// Flips the expansion flag and returns the new state.
    pub fn toggle_expanded(builder: &mut FormBuilder, index: usize) -> ServiceResult<bool> {
        let id = builder.field(index)?.id;
        if builder.expanded.remove(&id) {
            Ok(false)
        } else {
            builder.expanded.insert(id);
            Ok(true)
        }
    }

    pub fn is_expanded(builder: &FormBuilder, index: usize) -> ServiceResult<bool> {
        let id = builder.field(index)?.id;
        Ok(builder.expanded.contains(&id))
    }

    /// Replaces or clears the uploaded file of a `file` field.
    pub fn set_field_attachment(
        builder: &mut FormBuilder,
        index: usize,
        file: Option<FileValue>,
    ) -> ServiceResult<()> {
        let field = builder.field_mut(index)?;
        if field.field_type != FieldType::File {
            return Err(ServiceError::UnsupportedForType(field.field_type));
        }
        if file.is_some() {
            field.file_reference = None;
        }
        field.attachment = file;
        Ok(())
    }
}

fn change_type(field: &mut Field, kind: FieldType) {
    let previous = field.field_type;
    if previous == kind {
        return;
    }
    if !kind.is_choice() {
        field.options.clear();
    } else if previous.allows_nesting() && !kind.allows_nesting() {
        field.options = flatten_to_leaves(std::mem::take(&mut field.options));
    }
    if kind != FieldType::File {
        field.attachment = None;
        field.file_reference = None;
    }
    field.switch = kind == FieldType::Boolean;
    field.field_type = kind;
    debug!(field = %field.id, from = %previous, to = %kind, "field type changed");
}
