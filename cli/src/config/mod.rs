//! Configuration loading: built-in catalog and rules merged with the
//! optional user TOML file into one immutable [`Config`] snapshot.
pub mod catalog;
pub mod rules;
pub mod settings;
pub mod toml_loader;
pub mod validation;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use serde::Deserialize;

use crate::context::Environment;
use catalog::{Catalog, ComponentEntry};
use rules::SensitivityRule;
use settings::{DetectionSettings, PackageManagerSpec, Settings};

/// Directory name under the XDG config/cache roots.
pub const APP_DIR: &str = "myconfig";

/// On-disk shape of the config file. Every table is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    settings: Settings,
    detection: DetectionSettings,
    filter: FilterSection,
    components: BTreeMap<String, ComponentEntry>,
    package_managers: Option<Vec<PackageManagerSpec>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FilterSection {
    replace_defaults: bool,
    rules: Vec<SensitivityRule>,
}

/// The resolved configuration for one invocation.
#[derive(Debug, Clone)]
pub struct Config {
    /// File the configuration was read from, if any.
    pub source: Option<PathBuf>,
    /// Engine tunables.
    pub settings: Settings,
    /// Detection overrides.
    pub detection: DetectionSettings,
    /// Built-in plus user components.
    pub catalog: Catalog,
    /// Effective sensitivity rules, defaults first.
    pub rules: Vec<SensitivityRule>,
    /// Package managers queried during detection.
    pub package_managers: Vec<PackageManagerSpec>,
}

impl Config {
    /// Load configuration from `path`. A missing file yields the built-in
    /// defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let file: ConfigFile = toml_loader::load_config(path)
            .with_context(|| format!("loading {}", path.display()))?;
        let mut config = Self::from_file(file);
        if path.exists() {
            config.source = Some(path.to_path_buf());
        }
        Ok(config)
    }

    /// Parse configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid config document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: ConfigFile = toml_loader::parse_str(content, "<inline>")?;
        Ok(Self::from_file(file))
    }

    /// The built-in defaults with no user file.
    #[must_use]
    pub fn builtin() -> Self {
        Self::from_file(ConfigFile::default())
    }

    /// `$XDG_CONFIG_HOME/myconfig/config.toml`, defaulting to
    /// `~/.config/myconfig/config.toml`.
    #[must_use]
    pub fn default_path(env: &Environment) -> PathBuf {
        env.xdg_dir("XDG_CONFIG_HOME", ".config")
            .join(APP_DIR)
            .join("config.toml")
    }

    /// Check the configuration for likely mistakes.
    #[must_use]
    pub fn validate(&self) -> Vec<validation::ValidationWarning> {
        validation::validate(self)
    }

    fn from_file(file: ConfigFile) -> Self {
        let mut rules = if file.filter.replace_defaults {
            Vec::new()
        } else {
            rules::default_rules()
        };
        rules.extend(file.filter.rules);

        Self {
            source: None,
            settings: file.settings,
            detection: file.detection,
            catalog: Catalog::builtin().merge(file.components),
            rules,
            package_managers: file
                .package_managers
                .unwrap_or_else(settings::default_package_managers),
        }
    }
}


#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use test_helpers::write_temp_toml;

    #[test]
    fn missing_file_uses_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("config.toml")).unwrap();
        assert!(config.source.is_none());
        assert_eq!(config.catalog, Catalog::builtin());
        assert_eq!(config.rules, rules::default_rules());
        assert_eq!(config.package_managers.len(), 4);
    }

    #[test]
    fn loads_full_document() {
        let (_dir, path) = write_temp_toml(
            r#"
[settings]
max_depth = 4
cache_ttl_secs = 60

[detection]
include = ["custom"]

[filter]
replace_defaults = true

[[filter.rules]]
pattern = "*password*"
kind = "glob"

[components.custom]
name = "Custom"
paths = "~/.custom"

[[package_managers]]
name = "cargo"
program = "cargo"
args = ["install", "--list"]
"#,
        );
        let config = Config::load(&path).unwrap();
        assert_eq!(config.source.as_deref(), Some(path.as_path()));
        assert_eq!(config.settings.max_depth, 4);
        assert_eq!(config.settings.cache_ttl_secs, 60);
        assert!(config.detection.is_included("custom"));
        assert_eq!(config.rules.len(), 1);
        assert_eq!(config.rules[0].pattern, "*password*");
        assert!(config.catalog.get("custom").is_some());
        assert!(config.catalog.get("git").is_some());
        assert_eq!(config.package_managers.len(), 1);
        assert_eq!(config.package_managers[0].program, "cargo");
    }

    #[test]
    fn user_rules_append_to_defaults() {
        let config = Config::from_toml_str(
            "[[filter.rules]]\npattern = \"vault\"\nscope = \"filename\"\n",
        )
        .unwrap();
        assert_eq!(config.rules.len(), rules::default_rules().len() + 1);
        assert_eq!(config.rules.last().unwrap().pattern, "vault");
    }

    #[test]
    fn unknown_table_is_rejected() {
        let err = Config::from_toml_str("[profiles]\nx = 1\n").unwrap_err();
        assert!(err.to_string().contains("Invalid TOML"), "{err}");
    }

    #[test]
    fn invalid_file_reports_path() {
        let (_dir, path) = write_temp_toml("[settings\n");
        let err = Config::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("config.toml"));
    }

    #[test]
    fn default_path_respects_xdg() {
        let env = Environment::new("/home/u").with_var("XDG_CONFIG_HOME", "/xdg");
        assert_eq!(
            Config::default_path(&env),
            PathBuf::from("/xdg/myconfig/config.toml")
        );
        let env = Environment::new("/home/u");
        assert_eq!(
            Config::default_path(&env),
            PathBuf::from("/home/u/.config/myconfig/config.toml")
        );
    }
}
