use std::str::FromStr;

pub mod config;
pub mod field;
pub mod form;
pub mod kv;
pub mod option;
pub mod system;
pub mod view;

use crate::cli::core::CommandError;
use crate::cli::registry::CommandRegistry;
use crate::domain::OptionPath;

pub(crate) fn register_all(registry: &mut CommandRegistry) {
    let groups = [
        form::definitions(),
        field::definitions(),
        option::definitions(),
        kv::definitions(),
        view::definitions(),
        config::definitions(),
        system::definitions(),
    ];
    for entry in groups.into_iter().flatten() {
        registry.register(entry);
    }
}

/// Splits `<subcommand> <rest...>` or fails with the command's usage line.
pub(crate) fn split_subcommand<'a, 'b>(
    args: &'a [&'b str],
    usage: &str,
) -> Result<(String, &'a [&'b str]), CommandError> {
    let (subcommand, rest) = args
        .split_first()
        .ok_or_else(|| CommandError::InvalidArguments(format!("usage: {}", usage)))?;
    Ok((subcommand.to_ascii_lowercase(), rest))
}

pub(crate) fn arg<'a>(args: &[&'a str], position: usize, usage: &str) -> Result<&'a str, CommandError> {
    args.get(position)
        .copied()
        .ok_or_else(|| CommandError::InvalidArguments(format!("usage: {}", usage)))
}

pub(crate) fn parse_index(raw: &str, what: &str) -> Result<usize, CommandError> {
    usize::from_str(raw).map_err(|_| {
        CommandError::InvalidArguments(format!("{} must be a non-negative number, got `{}`", what, raw))
    })
}

pub(crate) fn parse_path(raw: &str) -> Result<OptionPath, CommandError> {
    raw.parse::<OptionPath>()
        .map_err(|err| CommandError::InvalidArguments(err.to_string()))
}

pub(crate) fn parse_switch(raw: &str) -> Result<bool, CommandError> {
    match raw.to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" => Ok(true),
        "off" | "false" | "no" => Ok(false),
        other => Err(CommandError::InvalidArguments(format!(
            "expected on|off, got `{}`",
            other
        ))),
    }
}
