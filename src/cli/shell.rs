use std::{
    fmt,
    io::{self, BufRead},
};

use rustyline::{
    completion::{Completer, Pair},
    error::ReadlineError,
    highlight::Highlighter,
    hint::Hinter,
    history::DefaultHistory,
    validate::Validator,
    Cmd, Context as ReadlineContext, Editor, Helper, KeyEvent,
};
use shell_words::split;

use crate::cli::commands::{field, kv, option};
use crate::cli::core::{CliError, CliMode, CommandError, LoopControl, ShellContext};
use crate::cli::output::{self, info as output_info};
use crate::config::Config;
use crate::domain::FieldType;

const SCRIPT_ENV: &str = "FORMDESK_CLI_SCRIPT";
const SWITCH_WORDS: [&str; 2] = ["on", "off"];
const CHILD_KINDS: [&str; 2] = ["leaf", "group"];
const CONFIG_SUBCOMMANDS: [&str; 2] = ["show", "set"];

pub fn run_cli() -> Result<(), CliError> {
    let mode = if std::env::var_os(SCRIPT_ENV).is_some() {
        CliMode::Script
    } else {
        CliMode::Interactive
    };

    let mut context = ShellContext::new(mode)?;

    match mode {
        CliMode::Interactive => run_interactive(&mut context),
        CliMode::Script => run_script(&mut context),
    }
}

fn run_interactive(context: &mut ShellContext) -> Result<(), CliError> {
    let mut editor = Editor::<CommandHelper, DefaultHistory>::new()?;
    editor.set_helper(Some(CommandHelper::new(context.command_names())));
    editor.bind_sequence(KeyEvent::from('?'), Cmd::Complete);

    while context.running {
        let line = editor.readline(&context.prompt());
        match line {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                editor.add_history_entry(trimmed).ok();
                match handle_line(context, trimmed) {
                    Ok(LoopControl::Continue) => {}
                    Ok(LoopControl::Exit) => break,
                    Err(err) => context.report_error(err)?,
                }
            }
            Err(ReadlineError::Interrupted) => {
                if context.confirm_exit()? {
                    break;
                }
            }
            Err(ReadlineError::Eof) => {
                output_info("Exiting shell.");
                break;
            }
            Err(err) => return Err(err.into()),
        }
    }

    context.replace_session(None);
    Ok(())
}

fn run_script(context: &mut ShellContext) -> Result<(), CliError> {
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        if !context.running {
            break;
        }
        let line = line?;
        match handle_line(context, &line) {
            Ok(LoopControl::Continue) => {}
            Ok(LoopControl::Exit) => break,
            Err(err) => context.report_error(err)?,
        }
    }
    context.replace_session(None);
    Ok(())
}

fn handle_line(context: &mut ShellContext, line: &str) -> Result<LoopControl, CommandError> {
    let tokens = match parse_command_line(line) {
        Ok(tokens) => tokens,
        Err(err) => {
            output::warning(&err.message);
            return Ok(LoopControl::Continue);
        }
    };
    let Some((raw, rest)) = tokens.split_first() else {
        return Ok(LoopControl::Continue);
    };
    let args: Vec<&str> = rest.iter().map(String::as_str).collect();

    match context.dispatch(&raw.to_lowercase(), raw, &args) {
        Ok(LoopControl::Exit) => {
            context.running = false;
            Ok(LoopControl::Exit)
        }
        other => other,
    }
}

/// Tab completion for command names, group subcommands, field types and the
/// fixed keywords some arguments take.
struct CommandHelper {
    commands: Vec<String>,
}

impl CommandHelper {
    fn new(names: Vec<&'static str>) -> Self {
        let mut commands: Vec<String> = names.into_iter().map(str::to_ascii_lowercase).collect();
        commands.sort();
        commands.dedup();
        Self { commands }
    }

    /// Words valid at the position following `preceding`.
    fn expected_words(&self, preceding: &[String]) -> Vec<String> {
        let words: Vec<&str> = preceding.iter().map(String::as_str).collect();
        match words.as_slice() {
            [] | ["help"] => self.commands.clone(),
            ["field"] => owned(&field::SUBCOMMANDS),
            ["field", "add"] | ["field", "set", _, "type"] => field_types(),
            ["field", "set", _] => owned(&field::PROPERTIES),
            ["field", "set", _, "required"] | ["option", "package", _, _] => owned(&SWITCH_WORDS),
            ["option"] => owned(&option::SUBCOMMANDS),
            ["option", "add", _, _] => owned(&CHILD_KINDS),
            ["kv"] => owned(&kv::SUBCOMMANDS),
            ["config"] => owned(&CONFIG_SUBCOMMANDS),
            ["config", "set"] => owned(&Config::KEYS),
            _ => Vec::new(),
        }
    }
}

fn owned(words: &[&str]) -> Vec<String> {
    words.iter().map(|word| word.to_string()).collect()
}

fn field_types() -> Vec<String> {
    FieldType::ALL
        .iter()
        .map(|kind| kind.as_str().to_string())
        .collect()
}

impl Helper for CommandHelper {}

impl Completer for CommandHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &ReadlineContext<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let prefix = &line[..pos];
        let start = prefix
            .rfind(char::is_whitespace)
            .map(|idx| idx + 1)
            .unwrap_or(0);
        let preceding: Vec<String> = prefix[..start]
            .split_whitespace()
            .map(str::to_ascii_lowercase)
            .collect();
        let needle = prefix[start..].to_ascii_lowercase();

        let candidates = self
            .expected_words(&preceding)
            .into_iter()
            .filter(|word| word.starts_with(&needle))
            .map(|word| Pair {
                display: word.clone(),
                replacement: word,
            })
            .collect();
        Ok((start, candidates))
    }
}

impl Hinter for CommandHelper {
    type Hint = String;
}

impl Highlighter for CommandHelper {}

impl Validator for CommandHelper {}

pub(crate) fn parse_command_line(input: &str) -> Result<Vec<String>, ParseError> {
    split(input).map_err(|err| ParseError {
        message: err.to_string(),
    })
}

#[derive(Debug)]
pub(crate) struct ParseError {
    message: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(line: &str) -> Vec<String> {
        line.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn completes_group_subcommands_and_field_types() {
        let helper = CommandHelper::new(vec!["field", "option", "kv", "config", "help"]);
        assert_eq!(helper.expected_words(&[]).len(), 5);
        assert!(helper.expected_words(&words("field")).contains(&"attach".to_string()));
        assert!(helper
            .expected_words(&words("field add"))
            .contains(&"nested-select".to_string()));
        assert!(helper
            .expected_words(&words("field set 0 type"))
            .contains(&"file".to_string()));
        assert_eq!(helper.expected_words(&words("option add 0 .")), vec!["leaf", "group"]);
        assert_eq!(helper.expected_words(&words("option package 0 1")), vec!["on", "off"]);
        assert!(helper
            .expected_words(&words("config set"))
            .contains(&"preview_show_paths".to_string()));
        assert!(helper.expected_words(&words("field add text")).is_empty());
    }
}
