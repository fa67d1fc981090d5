use std::path::Path;

use crate::cli::commands::{arg, option::print_tree, parse_index, split_subcommand};
use crate::cli::core::{CommandError, CommandResult, ShellContext};
use crate::cli::io;
use crate::cli::registry::CommandEntry;
use crate::core::builder::{Created, FormCommand};
use crate::core::file_reads::FileTarget;
use crate::core::services::FieldListService;
use crate::domain::{Displayable, FieldProperty, FieldType};
use crate::errors::FormError;

pub(crate) const SUBCOMMANDS: [&str; 7] = ["add", "list", "remove", "move", "set", "toggle", "attach"];
pub(crate) const PROPERTIES: [&str; 4] = ["type", "name", "required", "placeholder"];

const USAGE: &str = "field <add [type] [name]|list|remove <i>|move <from> <to>|set <i> <type|name|required|placeholder> <value>|toggle <i>|attach <i> [file]>";

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![CommandEntry::new(
        "field",
        "Add, reorder and edit form fields",
        USAGE,
        cmd_field,
    )]
}

fn cmd_field(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let (subcommand, rest) = split_subcommand(args, USAGE)?;
    match subcommand.as_str() {
        "add" => handle_add(context, rest),
        "list" | "ls" => handle_list(context),
        "remove" | "rm" => handle_remove(context, rest),
        "move" | "mv" => handle_move(context, rest),
        "set" => handle_set(context, rest),
        "toggle" => handle_toggle(context, rest),
        "attach" => handle_attach(context, rest),
        other => Err(CommandError::InvalidArguments(format!(
            "unknown field subcommand `{}`. Available: add, list, remove, move, set, toggle, attach",
            other
        ))),
    }
}

fn parse_type(raw: &str) -> Result<FieldType, CommandError> {
    raw.parse::<FieldType>()
        .map_err(CommandError::InvalidArguments)
}

fn handle_add(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let field_type = args.first().map(|raw| parse_type(raw)).transpose()?;
    let name = args.get(1..).map(|rest| rest.join(" ")).unwrap_or_default();
    let session = context.session_mut()?;

    let Created::Field(field) = session.apply(FormCommand::AddField)? else {
        return Err(CommandError::InvalidArguments("field was not created".into()));
    };
    if let Some(kind) = field_type {
        session.apply(FormCommand::SetProperty {
            field,
            property: FieldProperty::Type(kind),
        })?;
    }
    if !name.trim().is_empty() {
        session.apply(FormCommand::SetProperty {
            field,
            property: FieldProperty::Name(name.trim().to_string()),
        })?;
    }
    let position = session.builder().len() - 1;
    io::print_success(format!(
        "Field {} added ({}).",
        position,
        field_type.unwrap_or_default()
    ));
    Ok(())
}

fn handle_list(context: &mut ShellContext) -> CommandResult {
    let builder = context.session()?.builder();
    if builder.is_empty() {
        io::print_info("No fields yet. Use `field add` to create one.");
        return Ok(());
    }
    for (idx, field) in builder.fields().iter().enumerate() {
        let required = if field.required { " *" } else { "" };
        let expanded = builder.is_expanded(field.id);
        let marker = if expanded { "v" } else { ">" };
        io::print_info(format!(
            "{} [{}] {}{} #{}",
            marker,
            idx,
            field.display_label(),
            required,
            field.id.short()
        ));
        if !expanded {
            continue;
        }
        if !field.placeholder.is_empty() {
            io::print_info(format!("      placeholder: {}", field.placeholder));
        }
        if let Some(file) = &field.attachment {
            io::print_info(format!("      file: {} ({} bytes)", file.name, file.len()));
        } else if let Some(reference) = &field.file_reference {
            io::print_info(format!("      file: {} (stored)", reference));
        }
        if field.field_type.is_choice() {
            print_tree(field);
        }
    }
    Ok(())
}

fn handle_remove(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let index = parse_index(arg(args, 0, "field remove <index>")?, "field index")?;
    let removed = context
        .session_mut()?
        .edit(|builder| FieldListService::remove_field(builder, index))?;
    io::print_success(format!("Removed field {}: {}.", index, removed.display_label()));
    Ok(())
}

fn handle_move(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let usage = "field move <from> <to>";
    let from = parse_index(arg(args, 0, usage)?, "source index")?;
    let to = parse_index(arg(args, 1, usage)?, "target index")?;
    context
        .session_mut()?
        .edit(|builder| FieldListService::reorder(builder, from, to))?;
    io::print_success(format!("Moved field {} to {}.", from, to));
    Ok(())
}

fn handle_set(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let usage = "field set <index> <type|name|required|placeholder> <value>";
    let index = parse_index(arg(args, 0, usage)?, "field index")?;
    let key = arg(args, 1, usage)?.to_ascii_lowercase();
    let value = args.get(2..).map(|rest| rest.join(" ")).unwrap_or_default();
    let property = match key.as_str() {
        "type" => FieldProperty::Type(parse_type(arg(args, 2, usage)?)?),
        "name" => FieldProperty::Name(value),
        "required" => FieldProperty::Required(super::parse_switch(arg(args, 2, usage)?)?),
        "placeholder" => FieldProperty::Placeholder(value),
        other => {
            return Err(CommandError::InvalidArguments(format!(
                "unknown field property `{}`",
                other
            )))
        }
    };
    let session = context.session_mut()?;
    let previous = session.builder().field(index)?.field_type;
    session.edit(|builder| FieldListService::set_field_property(builder, index, property))?;
    let current = session.builder().field(index)?;
    if previous.is_choice() && !current.field_type.is_choice() {
        io::print_warning("Options were cleared by the type change.");
    }
    io::print_success(format!("Field {} updated.", index));
    Ok(())
}

fn handle_toggle(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let index = parse_index(arg(args, 0, "field toggle <index>")?, "field index")?;
    let expanded = context
        .session_mut()?
        .edit(|builder| FieldListService::toggle_expanded(builder, index))?;
    let state = if expanded { "expanded" } else { "collapsed" };
    io::print_info(format!("Field {} {}.", index, state));
    Ok(())
}

fn handle_attach(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let usage = "field attach <index> [file]";
    let index = parse_index(arg(args, 0, usage)?, "field index")?;
    let session = context.session_mut()?;
    let target = session.builder().field(index)?;
    if target.field_type != FieldType::File {
        return Err(FormError::UnsupportedForType(target.field_type).into());
    }
    let field = target.id;

    let Some(raw_path) = args.get(1) else {
        session.apply(FormCommand::SetAttachment { field, file: None })?;
        io::print_success(format!("Cleared the file of field {}.", index));
        return Ok(());
    };

    let ticket = session.begin_file_read(FileTarget::FieldAttachment(field))?;
    let file = io::read_upload(Path::new(raw_path))?;
    let name = file.name.clone();
    if session.finish_file_read(ticket, vec![file])? {
        io::print_success(format!("Attached `{}` to field {}.", name, index));
    } else {
        io::print_warning(format!("Field {} changed before `{}` was read.", index, name));
    }
    Ok(())
}
