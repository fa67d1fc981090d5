use std::path::Path;

use crate::cli::commands::{arg, parse_index, parse_path, split_subcommand};
use crate::cli::core::{CommandError, CommandResult, ShellContext};
use crate::cli::io;
use crate::cli::registry::CommandEntry;
use crate::core::builder::{FormBuilder, FormCommand};
use crate::core::file_reads::FileTarget;
use crate::core::services::{OptionTreeService, PairChange};
use crate::domain::{EntryId, KvValue, OptionPath};
use crate::errors::FormError;

pub(crate) const SUBCOMMANDS: [&str; 5] = ["add", "key", "value", "file", "remove"];

const USAGE: &str = "kv <add <field> <path> <key> [value]|key <field> <path> <pair> <key>|value <field> <path> <pair> <value>|file <field> <path> <pair> <file>...|remove <field> <path> <pair>>";

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![CommandEntry::new(
        "kv",
        "Edit the key/value entries of a package option",
        USAGE,
        cmd_kv,
    )]
}

fn cmd_kv(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let (subcommand, rest) = split_subcommand(args, USAGE)?;
    match subcommand.as_str() {
        "add" => handle_add(context, rest),
        "key" => handle_key(context, rest),
        "value" => handle_value(context, rest),
        "file" => handle_file(context, rest),
        "remove" | "rm" => handle_remove(context, rest),
        other => Err(CommandError::InvalidArguments(format!(
            "unknown kv subcommand `{}`. Available: add, key, value, file, remove",
            other
        ))),
    }
}

fn package_arg(args: &[&str], usage: &str) -> Result<(usize, OptionPath), CommandError> {
    let field = parse_index(arg(args, 0, usage)?, "field index")?;
    let path = parse_path(arg(args, 1, usage)?)?;
    Ok((field, path))
}

fn handle_add(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let usage = "kv add <field> <path> <key> [value]";
    let (field, path) = package_arg(args, usage)?;
    let key = arg(args, 2, usage)?.to_string();
    let value = args.get(3..).map(|rest| rest.join(" ")).unwrap_or_default();
    context.session_mut()?.edit(|builder| {
        OptionTreeService::add_key_value_pair(builder, field, &path, key.clone(), KvValue::text(value))
    })?;
    io::print_success(format!("Added `{}` to package {}.", key, path));
    Ok(())
}

fn handle_key(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let usage = "kv key <field> <path> <pair> <key>";
    let (field, path) = package_arg(args, usage)?;
    let pair = parse_index(arg(args, 2, usage)?, "pair index")?;
    let key = arg(args, 3, usage)?.to_string();
    context.session_mut()?.edit(|builder| {
        OptionTreeService::change_key_value_pair(builder, field, &path, pair, PairChange::Key(key))
    })?;
    io::print_success(format!("Renamed entry {} of package {}.", pair, path));
    Ok(())
}

fn handle_value(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let usage = "kv value <field> <path> <pair> <value>";
    let (field, path) = package_arg(args, usage)?;
    let pair = parse_index(arg(args, 2, usage)?, "pair index")?;
    let value = args.get(3..).map(|rest| rest.join(" ")).unwrap_or_default();
    let session = context.session_mut()?;
    let entry = entry_id(session.builder(), field, &path, pair)?;
    session.apply(FormCommand::SetPairValue {
        entry,
        value: KvValue::text(value),
    })?;
    io::print_success(format!("Updated entry {} of package {}.", pair, path));
    Ok(())
}

fn handle_file(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let usage = "kv file <field> <path> <pair> <file>...";
    let (field, path) = package_arg(args, usage)?;
    let pair = parse_index(arg(args, 2, usage)?, "pair index")?;
    let sources = args.get(3..).unwrap_or_default();
    if sources.is_empty() {
        return Err(CommandError::InvalidArguments(format!("usage: {}", usage)));
    }

    let session = context.session_mut()?;
    let entry = entry_id(session.builder(), field, &path, pair)?;
    let ticket = session.begin_file_read(FileTarget::PairValue(entry))?;
    let files = sources
        .iter()
        .map(|raw| io::read_upload(Path::new(raw)))
        .collect::<Result<Vec<_>, _>>()?;
    let count = files.len();
    if session.finish_file_read(ticket, files)? {
        io::print_success(format!(
            "Stored {} file(s) in entry {} of package {}.",
            count, pair, path
        ));
    } else {
        io::print_warning("The entry changed before the files were read.");
    }
    Ok(())
}

fn handle_remove(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let usage = "kv remove <field> <path> <pair>";
    let (field, path) = package_arg(args, usage)?;
    let pair = parse_index(arg(args, 2, usage)?, "pair index")?;
    let removed = context
        .session_mut()?
        .edit(|builder| OptionTreeService::remove_key_value_pair(builder, field, &path, pair))?;
    io::print_success(format!("Removed `{}` from package {}.", removed.key, path));
    Ok(())
}

fn entry_id(
    builder: &FormBuilder,
    field: usize,
    path: &OptionPath,
    pair: usize,
) -> Result<EntryId, CommandError> {
    let node = OptionTreeService::node(builder, field, path)?;
    if !node.is_package() {
        return Err(FormError::NotAPackage(path.clone()).into());
    }
    let pairs = node.pairs();
    pairs.get(pair).map(|entry| entry.id).ok_or_else(|| {
        FormError::PairIndexOutOfRange {
            index: pair,
            len: pairs.len(),
        }
        .into()
    })
}
