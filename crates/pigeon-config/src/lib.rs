//! Configuration management for pigeon.
//!
//! Settings come from `pigeon.toml`, found in the working directory or
//! in one of its parents, and are then overridden by command-line flags
//! passed as [`CliSettings`].
//!
//! `output.dir` and `theme.dirs` may reference environment variables as
//! `${VAR}` (must be set) or `${VAR:-fallback}`.

mod expand;

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Command-line overrides. `None` keeps the value from the file.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override output directory.
    pub output_dir: Option<PathBuf>,
    /// Override packaging mode.
    pub mode: Option<OutputMode>,
    /// Override removal of packed sources.
    pub remove_sources: Option<bool>,
    /// Override theme name.
    pub theme: Option<String>,
    /// Override worker count.
    pub workers: Option<usize>,
    /// Override recursive directory expansion.
    pub recursive: Option<bool>,
}

const CONFIG_FILENAME: &str = "pigeon.toml";

/// Loaded `pigeon.toml` plus resolved paths.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Output configuration (paths are relative strings from TOML).
    output: OutputConfigRaw,
    /// Theme configuration (paths are relative strings from TOML).
    theme: ThemeConfigRaw,
    /// Conversion configuration.
    pub convert: ConvertConfig,

    /// Resolved output configuration (set after loading).
    #[serde(skip)]
    pub output_resolved: OutputConfig,
    /// Resolved theme configuration (set after loading).
    #[serde(skip)]
    pub theme_resolved: ThemeConfig,
    /// File the configuration was read from, `None` for defaults.
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Packaging mode after conversion.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// HTML and asset folders only.
    #[default]
    Default,
    /// One ZIP archive per document.
    Zip,
    /// One ZIP archive for the whole batch.
    Batch,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct OutputConfigRaw {
    dir: Option<String>,
    mode: Option<OutputMode>,
    remove_sources: Option<bool>,
}

/// Resolved output configuration.
#[derive(Debug, Default)]
pub struct OutputConfig {
    /// Directory for all outputs, `None` to write next to each source.
    pub dir: Option<PathBuf>,
    pub mode: OutputMode,
    /// Delete HTML files and asset folders once they are archived.
    pub remove_sources: bool,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ThemeConfigRaw {
    name: Option<String>,
    dirs: Option<Vec<String>>,
}

/// Resolved theme configuration.
#[derive(Debug, Default)]
pub struct ThemeConfig {
    /// Theme to apply, `None` for the built-in stylesheet.
    pub name: Option<String>,
    /// Directories searched for `<name>.css`, earlier ones first.
    pub dirs: Vec<PathBuf>,
}

/// Conversion configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ConvertConfig {
    /// Documents converted in parallel, `None` for available parallelism.
    pub workers: Option<usize>,
    /// `lang` attribute of generated pages.
    pub lang: String,
    /// Descend into subdirectories when an input is a directory.
    pub recursive: bool,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            workers: None,
            lang: "en".to_owned(),
            recursive: false,
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// `${VAR}` without fallback where VAR is unset.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`output.dir`").
        field: String,
        /// Error message (e.g., "${`OUT_DIR`} not set").
        message: String,
    },
}

impl Config {
    /// Load `config_path`, or the nearest `pigeon.toml`, or defaults.
    ///
    /// Overrides from `cli_settings` win over file values and are validated
    /// together with them.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails or
    /// the resulting configuration is invalid.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
            config.validate()?;
        }

        Ok(config)
    }

    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(dir) = &settings.output_dir {
            self.output_resolved.dir = Some(dir.clone());
        }
        if let Some(mode) = settings.mode {
            self.output_resolved.mode = mode;
        }
        if let Some(remove_sources) = settings.remove_sources {
            self.output_resolved.remove_sources = remove_sources;
        }
        if let Some(theme) = &settings.theme {
            self.theme_resolved.name = Some(theme.clone());
        }
        if let Some(workers) = settings.workers {
            self.convert.workers = Some(workers);
        }
        if let Some(recursive) = settings.recursive {
            self.convert.recursive = recursive;
        }
    }

    /// Nearest `pigeon.toml` walking up from the working directory.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Defaults with the theme directory under `base`.
    fn default_with_base(base: &Path) -> Self {
        Self {
            output: OutputConfigRaw::default(),
            theme: ThemeConfigRaw::default(),
            convert: ConvertConfig::default(),
            output_resolved: OutputConfig::default(),
            theme_resolved: ThemeConfig {
                name: None,
                dirs: vec![base.join("themes")],
            },
            config_path: None,
        }
    }

    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] naming the offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.convert.workers == Some(0) {
            return Err(ConfigError::Validation(
                "convert.workers must be greater than 0".to_owned(),
            ));
        }
        if self.convert.lang.trim().is_empty() {
            return Err(ConfigError::Validation(
                "convert.lang cannot be empty".to_owned(),
            ));
        }
        if let Some(name) = &self.theme_resolved.name
            && name.trim().is_empty()
        {
            return Err(ConfigError::Validation(
                "theme.name cannot be empty".to_owned(),
            ));
        }
        Ok(())
    }

    /// Expand environment variable references in path strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        if let Some(dir) = &self.output.dir {
            self.output.dir = Some(expand::expand_env(dir, "output.dir")?);
        }
        if let Some(dirs) = &mut self.theme.dirs {
            expand::expand_each(dirs, "theme.dirs")?;
        }
        Ok(())
    }

    /// Resolve relative paths against the config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        self.output_resolved = OutputConfig {
            dir: self.output.dir.as_deref().map(|dir| config_dir.join(dir)),
            mode: self.output.mode.unwrap_or_default(),
            remove_sources: self.output.remove_sources.unwrap_or(false),
        };

        let dirs = match &self.theme.dirs {
            Some(dirs) => dirs.iter().map(|dir| config_dir.join(dir)).collect(),
            None => vec![config_dir.join("themes")],
        };
        self.theme_resolved = ThemeConfig {
            name: self.theme.name.clone(),
            dirs,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = Config::default_with_base(Path::new("/test"));
        assert_eq!(config.output_resolved.dir, None);
        assert_eq!(config.output_resolved.mode, OutputMode::Default);
        assert!(!config.output_resolved.remove_sources);
        assert_eq!(config.theme_resolved.name, None);
        assert_eq!(config.theme_resolved.dirs, vec![PathBuf::from("/test/themes")]);
        assert_eq!(config.convert.workers, None);
        assert_eq!(config.convert.lang, "en");
        assert!(!config.convert.recursive);
    }

    #[test]
    fn test_parse_minimal_config() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.convert.lang, "en");
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[output]
dir = "dist"
mode = "batch"
remove_sources = true

[theme]
name = "github"
dirs = ["themes", "/usr/share/pigeon/themes"]

[convert]
workers = 3
lang = "de"
recursive = true
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.resolve_paths(Path::new("/project"));

        assert_eq!(config.output_resolved.dir, Some(PathBuf::from("/project/dist")));
        assert_eq!(config.output_resolved.mode, OutputMode::Batch);
        assert!(config.output_resolved.remove_sources);
        assert_eq!(config.theme_resolved.name.as_deref(), Some("github"));
        assert_eq!(
            config.theme_resolved.dirs,
            vec![
                PathBuf::from("/project/themes"),
                PathBuf::from("/usr/share/pigeon/themes")
            ]
        );
        assert_eq!(config.convert.workers, Some(3));
        assert_eq!(config.convert.lang, "de");
        assert!(config.convert.recursive);
    }

    #[test]
    fn test_parse_unknown_mode_fails() {
        let result: Result<Config, _> = toml::from_str("[output]\nmode = \"tarball\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(&path, "[output]\nmode = \"zip\"\n").unwrap();

        let config = Config::load(Some(&path), None).unwrap();

        assert_eq!(config.output_resolved.mode, OutputMode::Zip);
        assert_eq!(config.theme_resolved.dirs, vec![dir.path().join("themes")]);
        assert_eq!(config.config_path, Some(path));
    }

    #[test]
    fn test_load_missing_explicit_file() {
        let result = Config::load(Some(Path::new("/nonexistent/pigeon.toml")), None);
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_apply_cli_settings_multiple() {
        let mut config = Config::default_with_base(Path::new("/test"));
        let settings = CliSettings {
            output_dir: Some(PathBuf::from("/out")),
            mode: Some(OutputMode::Zip),
            remove_sources: Some(true),
            theme: Some("dark".to_owned()),
            workers: Some(2),
            recursive: Some(true),
        };
        config.apply_cli_settings(&settings);

        assert_eq!(config.output_resolved.dir, Some(PathBuf::from("/out")));
        assert_eq!(config.output_resolved.mode, OutputMode::Zip);
        assert!(config.output_resolved.remove_sources);
        assert_eq!(config.theme_resolved.name.as_deref(), Some("dark"));
        assert_eq!(config.convert.workers, Some(2));
        assert!(config.convert.recursive);
    }

    #[test]
    fn test_apply_cli_settings_empty() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.apply_cli_settings(&CliSettings::default());
        assert_eq!(config.output_resolved.mode, OutputMode::Default);
        assert_eq!(config.theme_resolved.name, None);
    }

    #[test]
    fn test_expand_env_vars_output_dir() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::set_var("PIGEON_TEST_OUT", "/tmp/pigeon-out");
        }
        let mut config: Config = toml::from_str("[output]\ndir = \"${PIGEON_TEST_OUT}\"\n").unwrap();
        config.expand_env_vars().unwrap();
        config.resolve_paths(Path::new("/project"));
        assert_eq!(
            config.output_resolved.dir,
            Some(PathBuf::from("/tmp/pigeon-out"))
        );
        unsafe {
            std::env::remove_var("PIGEON_TEST_OUT");
        }
    }

    #[test]
    fn test_expand_env_vars_missing_theme_dir_var() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::remove_var("PIGEON_MISSING_THEME_DIR");
        }
        let mut config: Config =
            toml::from_str("[theme]\ndirs = [\"${PIGEON_MISSING_THEME_DIR}\"]\n").unwrap();
        let err = config.expand_env_vars().unwrap_err();
        assert!(err.to_string().contains("theme.dirs"));
    }

    fn assert_validation_error(config: &Config, expected: &str) {
        let err = config.validate().unwrap_err();
        assert!(
            matches!(err, ConfigError::Validation(_)),
            "Expected ConfigError::Validation, got {err:?}"
        );
        let msg = err.to_string();
        assert!(msg.contains(expected), "Expected error to contain '{expected}', got: {msg}");
    }

    #[test]
    fn test_validate_default_config_passes() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_workers_zero() {
        let mut config = Config::default();
        config.convert.workers = Some(0);
        assert_validation_error(&config, "convert.workers");
    }

    #[test]
    fn test_validate_lang_empty() {
        let mut config = Config::default();
        config.convert.lang = "  ".to_owned();
        assert_validation_error(&config, "convert.lang");
    }

    #[test]
    fn test_validate_theme_name_empty() {
        let mut config = Config::default();
        config.theme_resolved.name = Some(String::new());
        assert_validation_error(&config, "theme.name");
    }

    #[test]
    fn test_cli_settings_are_validated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(&path, "").unwrap();
        let settings = CliSettings {
            workers: Some(0),
            ..CliSettings::default()
        };
        let result = Config::load(Some(&path), Some(&settings));
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }
}
