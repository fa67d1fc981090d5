use crate::cli::core::{CommandError, CommandResult, ShellContext};
use crate::cli::io;
use crate::cli::output;
use crate::cli::registry::CommandEntry;
use crate::config::Config;

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![CommandEntry::new(
        "config",
        "View and change shell preferences",
        "config [show|set <key> <value>]",
        cmd_config,
    )]
}

fn cmd_config(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    if args.is_empty() || args[0].eq_ignore_ascii_case("show") {
        return show_config(context);
    }

    match args[0].to_lowercase().as_str() {
        "set" => {
            if args.len() < 2 {
                return Err(CommandError::InvalidArguments(format!(
                    "usage: config set <{}> <value>",
                    Config::KEYS.join("|")
                )));
            }
            let key = args[1];
            let value = args[2..].join(" ");
            context.config.set(key, value.trim())?;
            context.persist_config()?;
            if key == "ui_color_enabled" {
                output::set_color_enabled(context.config.ui_color_enabled && context.can_prompt());
            }
            if key == "store_root" {
                io::print_info("The new store root takes effect the next time the shell starts.");
            }
            io::print_success(format!("`{}` updated.", key));
            Ok(())
        }
        other => Err(CommandError::InvalidArguments(format!(
            "unknown config subcommand `{}`. Available: show, set",
            other
        ))),
    }
}

fn show_config(context: &ShellContext) -> CommandResult {
    output::section("Configuration");
    for key in Config::KEYS {
        let value = context.config.get(key)?;
        let shown = if value.is_empty() { "(unset)" } else { value.as_str() };
        io::print_info(format!("  {:<22} {}", key, shown));
    }
    io::print_info(format!(
        "  {:<22} {}",
        "config file",
        context.config_manager.config_path().display()
    ));
    io::print_info(format!("  {:<22} {}", "store", context.store.root().display()));
    Ok(())
}
