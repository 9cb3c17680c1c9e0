//! `pigeon themes` command implementation.

use std::path::PathBuf;

use clap::Args;
use pigeon_config::Config;
use pigeon_convert::ThemeStore;

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the themes command.
#[derive(Args)]
pub(crate) struct ThemesArgs {
    /// Path to configuration file (default: auto-discover pigeon.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl ThemesArgs {
    /// Execute the themes command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let config = Config::load(self.config.as_deref(), None)?;

        let store = ThemeStore::new(config.theme_resolved.dirs.clone());
        let themes = store.available();
        if themes.is_empty() {
            output.info("No themes found, using the built-in stylesheet.");
            for dir in &config.theme_resolved.dirs {
                output.info(&format!("  searched {}", dir.display()));
            }
            return Ok(());
        }

        let selected = config.theme_resolved.name.as_deref();
        for name in themes {
            if selected == Some(name.as_str()) {
                output.highlight(&format!("* {name}"));
            } else {
                output.info(&format!("  {name}"));
            }
        }
        Ok(())
    }
}
