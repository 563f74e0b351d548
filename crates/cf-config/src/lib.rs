//! Configuration for codeframe renderers.
//!
//! Parses `codeframe.toml` files with serde and turns them into
//! [`RendererOptions`]:
//!
//! ```toml
//! themes = ["github-dark", "github-light", "${THEME_DIR}/custom.json"]
//! theme_switching = "auto"
//! replace = ["code.fontFamily"]
//!
//! [styles.code]
//! fontSize = "0.9rem"
//! ```
//!
//! ## Themes
//!
//! Entries ending in `.json` are VS Code theme files, resolved relative to
//! the configuration file. Other entries name built-in themes.
//!
//! ## Environment Variable Expansion
//!
//! Theme entries support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default

mod expand;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use cf_renderer::{DEFAULT_THEME, RendererOptions, ThemeSwitching};
use cf_style::{LayerKind, StyleLayer, StyleValue};
use cf_theme::{BUILTIN_THEMES, ThemeInput, ThemeLoadError};
use serde::Deserialize;

use crate::expand::expand_env;

/// Extension of theme file entries.
const THEME_FILE_EXTENSION: &str = ".json";

/// Renderer configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Built-in theme names or theme file paths, default theme first.
    pub themes: Vec<String>,
    /// How alternate themes are activated.
    pub theme_switching: ThemeSwitching,
    /// List style keys whose configured items replace the defaults.
    pub replace: Vec<String>,
    /// Style overrides as a nested settings tree.
    pub styles: BTreeMap<String, StyleValue>,

    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            themes: vec![DEFAULT_THEME.to_owned()],
            theme_switching: ThemeSwitching::default(),
            replace: Vec::new(),
            styles: BTreeMap::new(),
            config_path: None,
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
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
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Field containing the reference.
        field: String,
        /// Error message.
        message: String,
    },
    /// A configured theme cannot be used.
    #[error("Theme error: {0}")]
    Theme(#[from] ThemeLoadError),
    /// A theme file is not valid JSON.
    #[error("Invalid theme file {}: {source}", path.display())]
    ThemeFile {
        /// Theme file path.
        path: PathBuf,
        /// JSON error.
        #[source]
        source: serde_json::Error,
    },
}

fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

impl Config {
    /// Load configuration from a file.
    ///
    /// # Errors
    ///
    /// Returns error if the file doesn't exist, cannot be parsed, references
    /// unset environment variables or fails validation.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&content)?;
        config.config_path = Some(path.to_path_buf());

        tracing::debug!(path = %path.display(), themes = config.themes.len(), "Loaded configuration");
        Ok(config)
    }

    /// Parse configuration from TOML text.
    ///
    /// Theme entries are resolved relative to the current directory until
    /// [`config_path`](Self::config_path) is set.
    ///
    /// # Example
    ///
    /// ```
    /// use cf_config::Config;
    ///
    /// let config = Config::from_toml_str(r#"themes = ["github-light"]"#).unwrap();
    /// assert_eq!(config.themes, ["github-light"]);
    /// ```
    ///
    /// # Errors
    ///
    /// Returns error if parsing, expansion or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(content)?;
        config.expand_env_vars()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Called automatically after parsing.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (i, theme) in self.themes.iter().enumerate() {
            require_non_empty(theme, &format!("themes[{i}]"))?;
        }
        for (i, key) in self.replace.iter().enumerate() {
            require_non_empty(key, &format!("replace[{i}]"))?;
        }
        Ok(())
    }

    /// Expand environment variables in theme entries.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        for (i, theme) in self.themes.iter_mut().enumerate() {
            *theme = expand_env(theme, &format!("themes[{i}]"))?;
        }
        Ok(())
    }

    /// Directory theme files are resolved against.
    fn base_dir(&self) -> &Path {
        self.config_path
            .as_deref()
            .and_then(Path::parent)
            .unwrap_or(Path::new("."))
    }

    /// User style layer built from `styles` and `replace`.
    ///
    /// # Example
    ///
    /// ```
    /// use cf_config::Config;
    ///
    /// let config = Config::from_toml_str(
    ///     "replace = [\"code.fontFamily\"]\n[styles.code]\nfontFamily = [\"Fira Code\"]",
    /// )
    /// .unwrap();
    /// assert!(config.user_layer().replaces("code.fontFamily"));
    /// ```
    #[must_use]
    pub fn user_layer(&self) -> StyleLayer {
        let mut layer = StyleLayer::from_map(LayerKind::User, "user", self.styles.clone());
        for key in &self.replace {
            layer.mark_replace(key);
        }
        layer
    }

    /// Theme inputs in configured order.
    ///
    /// Theme files are read and parsed here; the renderer normalizes them.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Theme` for unknown built-in names,
    /// `ConfigError::NotFound` or `ConfigError::Io` for unreadable theme files
    /// and `ConfigError::ThemeFile` for invalid JSON.
    pub fn theme_inputs(&self) -> Result<Vec<ThemeInput>, ConfigError> {
        self.themes
            .iter()
            .map(|entry| {
                if entry.ends_with(THEME_FILE_EXTENSION) {
                    self.load_theme_file(entry)
                } else if BUILTIN_THEMES.contains(&entry.as_str()) {
                    Ok(ThemeInput::builtin(entry.as_str()))
                } else {
                    Err(ThemeLoadError::UnknownBuiltin(entry.clone()).into())
                }
            })
            .collect()
    }

    fn load_theme_file(&self, entry: &str) -> Result<ThemeInput, ConfigError> {
        let path = self.base_dir().join(entry);
        if !path.exists() {
            return Err(ConfigError::NotFound(path));
        }
        let content = std::fs::read_to_string(&path)?;
        let value: serde_json::Value = serde_json::from_str(&content)
            .map_err(|source| ConfigError::ThemeFile {
                path: path.clone(),
                source,
            })?;
        tracing::debug!(path = %path.display(), "Read theme file");
        Ok(ThemeInput::Raw(value))
    }

    /// Apply this configuration to renderer options.
    ///
    /// Replaces themes, theme switching and user styles; plugins and the
    /// theme manager are kept.
    ///
    /// # Example
    ///
    /// ```
    /// use cf_config::Config;
    /// use cf_renderer::{Renderer, RendererOptions};
    ///
    /// let config = Config::from_toml_str(
    ///     "themes = [\"github-dark\", \"github-light\"]\n[styles]\nborderRadius = \"0\"",
    /// )
    /// .unwrap();
    /// let renderer = Renderer::new(config.apply(RendererOptions::new()).unwrap()).unwrap();
    ///
    /// assert_eq!(renderer.themes().len(), 2);
    /// assert_eq!(renderer.styles().get_str("borderRadius"), Some("0"));
    /// ```
    ///
    /// # Errors
    ///
    /// Returns theme errors from [`Config::theme_inputs`].
    pub fn apply(&self, options: RendererOptions) -> Result<RendererOptions, ConfigError> {
        let themes = self.theme_inputs()?;
        tracing::info!(
            themes = themes.len(),
            styles = self.styles.len(),
            switching = ?self.theme_switching,
            "Applied configuration"
        );
        Ok(options
            .with_themes(themes)
            .with_theme_switching(self.theme_switching)
            .with_styles(self.user_layer()))
    }
}
