use crate::cli::commands::{arg, parse_index, parse_path, parse_switch, split_subcommand};
use crate::cli::core::{CommandError, CommandResult, ShellContext};
use crate::cli::io;
use crate::cli::registry::CommandEntry;
use crate::core::services::OptionTreeService;
use crate::domain::{ChildKind, Field, OptionNode, OptionPath};

pub(crate) const SUBCOMMANDS: [&str; 5] = ["add", "remove", "rename", "package", "tree"];

const USAGE: &str = "option <add <field> <parent> [leaf|group] [label]|remove <field> <path>|rename <field> <path> <label>|package <field> <path> <on|off>|tree <field>>";

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![CommandEntry::new(
        "option",
        "Edit the option tree of a choice field",
        USAGE,
        cmd_option,
    )]
}

fn cmd_option(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let (subcommand, rest) = split_subcommand(args, USAGE)?;
    match subcommand.as_str() {
        "add" => handle_add(context, rest),
        "remove" | "rm" => handle_remove(context, rest),
        "rename" => handle_rename(context, rest),
        "package" => handle_package(context, rest),
        "tree" => handle_tree(context, rest),
        other => Err(CommandError::InvalidArguments(format!(
            "unknown option subcommand `{}`. Available: add, remove, rename, package, tree",
            other
        ))),
    }
}

fn handle_add(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let usage = "option add <field> <parent-path|.> [leaf|group] [label]";
    let field = parse_index(arg(args, 0, usage)?, "field index")?;
    let parent = parse_path(arg(args, 1, usage)?)?;
    let (kind, label_start) = match args.get(2).map(|raw| raw.to_ascii_lowercase()) {
        Some(raw) if raw == "leaf" => (ChildKind::Leaf, 3),
        Some(raw) if raw == "group" => (ChildKind::Group, 3),
        _ => (ChildKind::Leaf, 2),
    };
    let label = args
        .get(label_start..)
        .map(|rest| rest.join(" "))
        .unwrap_or_default();

    let created = context.session_mut()?.edit(|builder| {
        let (_, path) = OptionTreeService::add_child(builder, field, &parent, kind)?;
        if !label.is_empty() {
            OptionTreeService::rename_node(builder, field, &path, label.clone())?;
        }
        Ok(path)
    })?;
    io::print_success(format!("Option added at {}.", created));
    Ok(())
}

fn handle_remove(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let usage = "option remove <field> <path>";
    let field = parse_index(arg(args, 0, usage)?, "field index")?;
    let path = parse_path(arg(args, 1, usage)?)?;
    let removed = context
        .session_mut()?
        .edit(|builder| OptionTreeService::remove_node(builder, field, &path))?;
    io::print_success(format!(
        "Removed {} `{}` and {} nested option(s).",
        removed.kind_name(),
        removed.label(),
        removed.subtree_len() - 1
    ));
    Ok(())
}

fn handle_rename(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let usage = "option rename <field> <path> <label>";
    let field = parse_index(arg(args, 0, usage)?, "field index")?;
    let path = parse_path(arg(args, 1, usage)?)?;
    let label = args.get(2..).map(|rest| rest.join(" ")).unwrap_or_default();
    context
        .session_mut()?
        .edit(|builder| OptionTreeService::rename_node(builder, field, &path, label))?;
    io::print_success(format!("Option {} renamed.", path));
    Ok(())
}

fn handle_package(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let usage = "option package <field> <path> <on|off>";
    let field = parse_index(arg(args, 0, usage)?, "field index")?;
    let path = parse_path(arg(args, 1, usage)?)?;
    let is_package = parse_switch(arg(args, 2, usage)?)?;
    context.session_mut()?.edit(|builder| {
        OptionTreeService::set_package_flag(builder, field, &path, is_package)
    })?;
    let state = if is_package { "is now a package" } else { "is now a group" };
    io::print_success(format!("Option {} {}.", path, state));
    Ok(())
}

fn handle_tree(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let field = parse_index(arg(args, 0, "option tree <field>")?, "field index")?;
    let field = context.session()?.builder().field(field)?;
    print_tree(field);
    Ok(())
}

/// Prints a field's options with their paths and package entries.
pub(crate) fn print_tree(field: &Field) {
    if field.options.is_empty() {
        io::print_info("      (no options)");
        return;
    }
    print_nodes(&field.options, &OptionPath::root());
}

fn print_nodes(nodes: &[OptionNode], parent: &OptionPath) {
    for (idx, node) in nodes.iter().enumerate() {
        let path = parent.child(idx);
        let indent = "  ".repeat(path.depth() + 2);
        let label = match node.label() {
            "" => "(blank)",
            text => text,
        };
        io::print_info(format!("{}{} {} [{}]", indent, path, label, node.kind_name()));
        for (pair_idx, pair) in node.pairs().iter().enumerate() {
            io::print_info(format!(
                "{}  #{} {} = {}",
                indent,
                pair_idx,
                pair.key,
                pair.value.summary()
            ));
        }
        print_nodes(node.children(), &path);
    }
}
