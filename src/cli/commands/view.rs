//! Read-only views of the open form: preview, validation and wire payload.

use std::fs;

use crate::cli::core::{CommandResult, ShellContext};
use crate::cli::io;
use crate::cli::output;
use crate::cli::registry::CommandEntry;
use crate::core::multipart::MultipartBody;

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![
        CommandEntry::new(
            "preview",
            "Render the form as it will appear to editors",
            "preview",
            cmd_preview,
        ),
        CommandEntry::new(
            "validate",
            "Check the form for problems that block saving",
            "validate",
            cmd_validate,
        ),
        CommandEntry::new(
            "payload",
            "Show the serialized form, optionally writing the multipart body",
            "payload [output-file]",
            cmd_payload,
        ),
    ]
}

fn cmd_preview(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let preview = context.session()?.preview();
    output::section("Preview");
    if context.config.preview_show_paths {
        output::raw(&preview.render_text_with_paths());
    } else {
        output::raw(&preview.render_text());
    }
    Ok(())
}

fn cmd_validate(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let report = context.session_mut()?.validate();
    if report.is_valid() {
        io::print_success("Form is valid.");
        return Ok(());
    }
    for issue in &report.issues {
        io::print_warning(format!("field {}: {}", issue.field_index, issue.message));
    }
    io::print_info(format!("{} issue(s) found.", report.issues.len()));
    Ok(())
}

fn cmd_payload(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let settings = context.config.payload_settings();
    let payload = context.session()?.payload()?;

    output::section("Payload");
    output::raw(&serde_json::to_string_pretty(&payload.data)?);
    for attachment in &payload.attachments {
        io::print_info(format!(
            "  attachment `{}` ({} bytes)",
            attachment.reference,
            attachment.bytes.len()
        ));
    }

    if let Some(target) = args.first() {
        let body = MultipartBody::encode(&payload, &settings)?;
        fs::write(target, body.as_bytes())?;
        io::print_success(format!(
            "Wrote {} bytes to `{}` ({}).",
            body.len(),
            target,
            body.content_type()
        ));
    }
    Ok(())
}
