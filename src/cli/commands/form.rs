//! Session lifecycle commands: create, open, submit and close a form.

use crate::cli::core::{CommandError, CommandResult, ShellContext};
use crate::cli::io;
use crate::cli::registry::CommandEntry;
use crate::core::session::EditSession;
use crate::errors::FormError;
use crate::storage::FormBackend;

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![
        CommandEntry::new(
            "new",
            "Start an empty form for a template",
            "new <template>",
            cmd_new,
        ),
        CommandEntry::new(
            "open",
            "Edit the stored form of a template",
            "open <template>",
            cmd_open,
        ),
        CommandEntry::new("list", "List stored forms", "list", cmd_list),
        CommandEntry::new(
            "delete",
            "Delete the stored form of a template",
            "delete <template>",
            cmd_delete,
        ),
        CommandEntry::new(
            "submit",
            "Validate and save the open form",
            "submit",
            cmd_submit,
        ),
        CommandEntry::new(
            "close",
            "Discard the open form without saving",
            "close",
            cmd_close,
        ),
    ]
}

fn template_arg(args: &[&str], usage: &str) -> Result<String, CommandError> {
    let name = args.join(" ");
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(CommandError::InvalidArguments(format!("usage: {}", usage)));
    }
    Ok(trimmed.to_string())
}

fn cmd_new(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let template = template_arg(args, "new <template>")?;
    if context.store.fetch_form(&template)?.is_some() {
        io::print_warning(format!(
            "Template `{}` already has a form; use `open {}` to edit it.",
            template, template
        ));
        return Ok(());
    }
    context.replace_session(Some(EditSession::create(template.clone())));
    io::print_success(format!("New form for `{}` started.", template));
    Ok(())
}

fn cmd_open(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let template = template_arg(args, "open <template>")?;
    let session = EditSession::open(&context.store, &template)?;
    for note in session.migrations() {
        io::print_info(format!("Migration: {}", note));
    }
    io::print_success(format!(
        "Opened form `{}` ({} fields).",
        template,
        session.builder().len()
    ));
    context.replace_session(Some(session));
    context.config.last_opened_template = Some(template);
    context.persist_config()
}

fn cmd_list(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let forms = context.store.list_forms()?;
    if forms.is_empty() {
        io::print_info("No stored forms.");
        return Ok(());
    }
    for name in forms {
        io::print_info(format!("  {}", name));
    }
    Ok(())
}

fn cmd_delete(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let template = template_arg(args, "delete <template>")?;
    if context.can_prompt()
        && !io::confirm_action(&format!("Delete the form of `{}`?", template))?
    {
        io::print_info("Operation cancelled.");
        return Ok(());
    }
    context.store.delete_form(&template)?;
    if context
        .session
        .as_ref()
        .is_some_and(|session| session.template() == template)
    {
        context.replace_session(None);
    }
    io::print_success(format!("Form `{}` deleted.", template));
    Ok(())
}

fn cmd_submit(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let store = context.store.clone();
    let session = context.session_mut()?;
    match session.submit(&store) {
        Ok(document) => {
            let count = document.fields.as_array().map_or(0, Vec::len);
            io::print_success(format!(
                "Form `{}` saved ({} fields).",
                document.template, count
            ));
            Ok(())
        }
        Err(FormError::Validation(_)) => {
            if let Some(report) = session.last_report() {
                for issue in &report.issues {
                    io::print_warning(format!("field {}: {}", issue.field_index, issue.message));
                }
            }
            Err(CommandError::InvalidArguments(
                "Form has validation issues; nothing was saved.".into(),
            ))
        }
        Err(err) => Err(err.into()),
    }
}

fn cmd_close(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let template = context.session()?.template().to_string();
    context.replace_session(None);
    io::print_info(format!("Closed `{}`.", template));
    Ok(())
}
