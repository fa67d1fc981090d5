use std::path::PathBuf;

use crate::{
    config::{Config, ConfigManager},
    core::session::EditSession,
    storage::JsonFormStore,
};

use super::registry::CommandRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliMode {
    Interactive,
    Script,
}

pub struct ShellContext {
    pub mode: CliMode,
    pub registry: CommandRegistry,
    pub store: JsonFormStore,
    pub config_manager: ConfigManager,
    pub config: Config,
    pub base_dir: PathBuf,
    pub session: Option<EditSession>,
    pub running: bool,
}
