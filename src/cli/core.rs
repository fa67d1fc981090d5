//! Core CLI loop, dispatch, and shell context helpers.

use std::io;

use rustyline::error::ReadlineError;
use strsim::levenshtein;
use thiserror::Error;

use crate::{
    config::{ConfigError, ConfigManager},
    core::session::EditSession,
    errors::FormError,
    storage::JsonFormStore,
};

use super::commands;
use super::io as cli_io;
use super::output;
use super::registry::{CommandEntry, CommandRegistry};
pub use super::shell_context::{CliMode, ShellContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoopControl {
    Continue,
    Exit,
}

pub type CommandResult = Result<(), CommandError>;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("No form is open. Use `new <template>` or `open <template>` first.")]
    NoSession,
    #[error("{0}")]
    InvalidArguments(String),
    #[error(transparent)]
    Form(#[from] FormError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
    #[error(transparent)]
    Dialoguer(#[from] dialoguer::Error),
    #[error("exit requested")]
    ExitRequested,
}

/// User-facing CLI error wrapper.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Form(#[from] FormError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Invalid input: {0}")]
    Input(String),
    #[error("Command failed: {0}")]
    Command(String),
}

impl From<CommandError> for CliError {
    fn from(err: CommandError) -> Self {
        CliError::Command(err.to_string())
    }
}

impl From<io::Error> for CliError {
    fn from(err: io::Error) -> Self {
        CliError::Command(err.to_string())
    }
}

impl From<ReadlineError> for CliError {
    fn from(err: ReadlineError) -> Self {
        CliError::Input(err.to_string())
    }
}

impl ShellContext {
    pub fn new(mode: CliMode) -> Result<Self, CliError> {
        Self::with_config_manager(mode, ConfigManager::new()?)
    }

    pub fn with_config_manager(
        mode: CliMode,
        config_manager: ConfigManager,
    ) -> Result<Self, CliError> {
        let mut registry = CommandRegistry::new();
        commands::register_all(&mut registry);

        let config = config_manager.load()?;
        let base_dir = config_manager.base_dir().to_path_buf();
        let store = JsonFormStore::new(config.store_root_in(&base_dir))?;
        output::set_color_enabled(config.ui_color_enabled && mode == CliMode::Interactive);

        Ok(Self {
            mode,
            registry,
            store,
            config_manager,
            config,
            base_dir,
            session: None,
            running: true,
        })
    }

    pub fn prompt(&self) -> String {
        match &self.session {
            Some(session) => {
                let marker = if session.is_dirty() { "*" } else { "" };
                format!("formdesk[{}{}]> ", session.template(), marker)
            }
            None => "formdesk> ".into(),
        }
    }

    pub fn command_names(&self) -> Vec<&'static str> {
        self.registry.names().collect()
    }

    pub(crate) fn command(&self, name: &str) -> Option<&CommandEntry> {
        self.registry.get(name)
    }

    pub(crate) fn session(&self) -> Result<&EditSession, CommandError> {
        self.session.as_ref().ok_or(CommandError::NoSession)
    }

    pub(crate) fn session_mut(&mut self) -> Result<&mut EditSession, CommandError> {
        self.session.as_mut().ok_or(CommandError::NoSession)
    }

    /// Swaps in a new session, closing the previous one.
    pub(crate) fn replace_session(&mut self, next: Option<EditSession>) {
        if let Some(mut previous) = self.session.take() {
            if previous.is_dirty() {
                cli_io::print_warning(format!(
                    "Discarded unsaved changes to `{}`.",
                    previous.template()
                ));
            }
            previous.close();
        }
        self.session = next;
    }

    pub(crate) fn persist_config(&self) -> CommandResult {
        self.config_manager.save(&self.config)?;
        Ok(())
    }

    pub(crate) fn can_prompt(&self) -> bool {
        self.mode == CliMode::Interactive
    }

    pub(crate) fn dispatch(
        &mut self,
        command: &str,
        raw: &str,
        args: &[&str],
    ) -> Result<LoopControl, CommandError> {
        if let Some(handler) = self.registry.handler(command) {
            match handler(self, args) {
                Ok(()) => Ok(LoopControl::Continue),
                Err(CommandError::ExitRequested) => Ok(LoopControl::Exit),
                Err(err) => Err(err),
            }
        } else {
            self.suggest_command(raw);
            Ok(LoopControl::Continue)
        }
    }

    pub(crate) fn suggest_command(&self, input: &str) {
        cli_io::print_warning(format!(
            "Unknown command `{}`. Type `help` to see available commands.",
            input
        ));

        let mut suggestions: Vec<_> = self
            .registry
            .names()
            .map(|key| (levenshtein(key, input), key))
            .collect();
        suggestions.sort_by_key(|(distance, _)| *distance);

        if let Some((distance, best)) = suggestions.first() {
            if *distance <= 3 {
                cli_io::print_info(format!("Suggestion: `{}`?", best));
            }
        }
    }

    pub(crate) fn confirm_exit(&self) -> Result<bool, CliError> {
        if self.mode == CliMode::Script {
            return Ok(true);
        }
        Ok(cli_io::confirm_action("Exit shell?")?)
    }

    pub(crate) fn report_error(&self, err: CommandError) -> Result<(), CliError> {
        match err {
            CommandError::ExitRequested => Ok(()),
            CommandError::InvalidArguments(message) => {
                cli_io::print_error(&message);
                cli_io::print_hint("Use `help <command>` for usage details.");
                Ok(())
            }
            CommandError::NoSession => {
                cli_io::print_error(CommandError::NoSession);
                cli_io::print_hint("Try `new blog-post` to get started.");
                Ok(())
            }
            other => {
                cli_io::print_error(other);
                Ok(())
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn process_line(&mut self, line: &str) -> Result<LoopControl, CommandError> {
        let tokens = match crate::cli::shell::parse_command_line(line) {
            Ok(tokens) => tokens,
            Err(err) => {
                cli_io::print_warning(err);
                return Ok(LoopControl::Continue);
            }
        };
        if tokens.is_empty() {
            return Ok(LoopControl::Continue);
        }
        let command = tokens[0].to_lowercase();
        let args: Vec<&str> = tokens.iter().skip(1).map(String::as_str).collect();
        self.dispatch(&command, &tokens[0], &args)
    }
}

#[cfg(test)]
pub(crate) fn process_script(
    base: std::path::PathBuf,
    lines: &[&str],
) -> Result<ShellContext, CliError> {
    let mut app = ShellContext::with_config_manager(
        CliMode::Script,
        ConfigManager::with_base_dir(base)?,
    )?;
    for line in lines {
        match app.process_line(line)? {
            LoopControl::Continue => {}
            LoopControl::Exit => break,
        }
    }
    Ok(app)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FieldType, OptionNode};
    use tempfile::tempdir;

    #[test]
    fn script_builds_nested_options() {
        let dir = tempdir().unwrap();
        let app = process_script(
            dir.path().to_path_buf(),
            &[
                "new products",
                "field add nested-select Colour",
                "option add 0 . group Colors",
                "option add 0 0 leaf Red",
                "option add 0 0 leaf Blue",
            ],
        )
        .unwrap();
        let session = app.session.as_ref().unwrap();
        let field = &session.builder().fields()[0];
        assert_eq!(field.field_type, FieldType::NestedSelect);
        assert_eq!(field.options.len(), 1);
        let labels: Vec<&str> = field.options[0]
            .children()
            .iter()
            .map(OptionNode::label)
            .collect();
        assert_eq!(labels, vec!["Red", "Blue"]);
    }

    #[test]
    fn unknown_command_keeps_running() {
        let dir = tempdir().unwrap();
        let app = process_script(dir.path().to_path_buf(), &["feild add"]).unwrap();
        assert!(app.running);
        assert!(app.session.is_none());
    }

    #[test]
    fn edits_without_session_are_rejected() {
        let dir = tempdir().unwrap();
        let mut app = ShellContext::with_config_manager(
            CliMode::Script,
            ConfigManager::with_base_dir(dir.path().to_path_buf()).unwrap(),
        )
        .unwrap();
        assert!(matches!(
            app.process_line("field add"),
            Err(CommandError::NoSession)
        ));
    }

    #[test]
    fn prompt_marks_unsaved_session() {
        let dir = tempdir().unwrap();
        let app = process_script(dir.path().to_path_buf(), &["new blog"]).unwrap();
        assert_eq!(app.prompt(), "formdesk[blog*]> ");
    }

    #[test]
    fn prompt_marks_edits_made_after_submit() {
        let dir = tempdir().unwrap();
        let mut app = process_script(
            dir.path().to_path_buf(),
            &["new blog", "field add text Title", "submit"],
        )
        .unwrap();
        assert_eq!(app.prompt(), "formdesk[blog]> ");
        app.process_line("field add text Body").unwrap();
        assert_eq!(app.prompt(), "formdesk[blog*]> ");
        assert_eq!(app.session.as_ref().unwrap().builder().len(), 2);
    }
}
