//! Locating `gostable.toml`.
//!
//! A `--config` path wins outright. Otherwise the project directory is
//! searched for [`PROJECT_FILES`] in order, then the per-user directory
//! (`$GOSTABLE_CONFIG_DIR`, else `~/.gostable`) for [`USER_FILE`]. With
//! nothing found the built-in policy and rule defaults apply.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use gostable_core::Config;

/// Project config names in lookup order. `init` writes the first one.
pub const PROJECT_FILES: [&str; 2] = ["gostable.toml", ".gostable.toml"];

/// Config name inside the per-user directory.
pub const USER_FILE: &str = "config.toml";

/// Environment variable overriding the per-user directory.
pub const USER_DIR_ENV: &str = "GOSTABLE_CONFIG_DIR";

/// Where the effective configuration comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Given with `--config`; not checked for existence.
    Flag(PathBuf),
    /// Found in the analyzed project.
    Project(PathBuf),
    /// Found in the per-user directory.
    User(PathBuf),
    /// No file; built-in defaults.
    Builtin,
}

impl ConfigSource {
    /// Loads the configuration this source points at.
    pub fn load(&self) -> Result<Config> {
        let path = match self {
            Self::Builtin => {
                tracing::debug!("No gostable.toml found, using built-in defaults");
                return Ok(Config::default());
            }
            Self::User(path) => {
                tracing::info!("Using per-user config: {}", path.display());
                path
            }
            Self::Flag(path) | Self::Project(path) => path,
        };
        Config::from_file(path).with_context(|| format!("Failed to load config: {}", path.display()))
    }
}

/// The file `init` creates for `project_dir`.
#[must_use]
pub fn init_target(project_dir: &Path) -> PathBuf {
    project_dir.join(PROJECT_FILES[0])
}

/// Project config files that already exist in `project_dir`, in lookup order.
#[must_use]
pub fn existing_project_files(project_dir: &Path) -> Vec<PathBuf> {
    PROJECT_FILES
        .iter()
        .map(|name| project_dir.join(name))
        .filter(|path| path.is_file())
        .collect()
}

/// Resolves the configuration for analyzing `project_dir`.
#[must_use]
pub fn resolve(project_dir: &Path, flag: Option<&Path>) -> ConfigSource {
    let user_dir = std::env::var_os(USER_DIR_ENV)
        .map(PathBuf::from)
        .or_else(|| home::home_dir().map(|home| home.join(".gostable")));
    resolve_in(project_dir, flag, user_dir.as_deref())
}

fn resolve_in(project_dir: &Path, flag: Option<&Path>, user_dir: Option<&Path>) -> ConfigSource {
    if let Some(path) = flag {
        return ConfigSource::Flag(path.to_path_buf());
    }

    let mut found = existing_project_files(project_dir).into_iter();
    if let Some(path) = found.next() {
        for shadowed in found {
            tracing::warn!(
                "Ignoring {} because {} takes precedence",
                shadowed.display(),
                path.display()
            );
        }
        return ConfigSource::Project(path);
    }

    user_dir
        .map(|dir| dir.join(USER_FILE))
        .filter(|path| path.is_file())
        .map_or(ConfigSource::Builtin, ConfigSource::User)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn flag_is_used_even_when_missing() {
        let project = TempDir::new().unwrap();
        fs::write(project.path().join("gostable.toml"), "").unwrap();
        let flag = Path::new("/nowhere/custom.toml");

        assert_eq!(
            resolve_in(project.path(), Some(flag), None),
            ConfigSource::Flag(flag.to_path_buf())
        );
    }

    #[test]
    fn hidden_project_file_is_found() {
        let project = TempDir::new().unwrap();
        fs::write(project.path().join(".gostable.toml"), "").unwrap();

        assert_eq!(
            resolve_in(project.path(), None, None),
            ConfigSource::Project(project.path().join(".gostable.toml"))
        );
    }

    #[test]
    fn visible_project_file_shadows_hidden_one() {
        let project = TempDir::new().unwrap();
        fs::write(project.path().join("gostable.toml"), "").unwrap();
        fs::write(project.path().join(".gostable.toml"), "").unwrap();

        assert_eq!(
            existing_project_files(project.path()).len(),
            2,
            "both files are reported so the shadowed one can be warned about"
        );
        assert_eq!(
            resolve_in(project.path(), None, None),
            ConfigSource::Project(project.path().join("gostable.toml"))
        );
    }

    #[test]
    fn project_directory_named_like_config_is_ignored() {
        let project = TempDir::new().unwrap();
        fs::create_dir(project.path().join("gostable.toml")).unwrap();

        assert_eq!(resolve_in(project.path(), None, None), ConfigSource::Builtin);
    }

    #[test]
    fn user_config_applies_without_project_config() {
        let project = TempDir::new().unwrap();
        let user = TempDir::new().unwrap();
        fs::write(user.path().join("config.toml"), "").unwrap();

        assert_eq!(
            resolve_in(project.path(), None, Some(user.path())),
            ConfigSource::User(user.path().join("config.toml"))
        );

        fs::write(project.path().join(".gostable.toml"), "").unwrap();
        assert!(matches!(
            resolve_in(project.path(), None, Some(user.path())),
            ConfigSource::Project(_)
        ));
    }

    #[test]
    fn builtin_defaults_load_without_a_file() {
        let project = TempDir::new().unwrap();
        let user = TempDir::new().unwrap();

        let source = resolve_in(project.path(), None, Some(user.path()));
        assert_eq!(source, ConfigSource::Builtin);
        let config = source.load().unwrap();
        assert_eq!(config.fail_threshold(), gostable_core::Severity::Error);
        assert!(config.unknown_rules().is_empty());
    }

    #[test]
    fn project_config_is_loaded() {
        let project = TempDir::new().unwrap();
        fs::write(
            project.path().join("gostable.toml"),
            "fail_on = \"warning\"\n[rules.GS006]\nenabled = false\n",
        )
        .unwrap();

        let config = resolve_in(project.path(), None, None).load().unwrap();
        assert_eq!(config.fail_threshold(), gostable_core::Severity::Warning);
        assert!(!config.is_rule_enabled(gostable_core::RuleId::CommandReview));
    }

    #[test]
    fn broken_config_names_the_file() {
        let project = TempDir::new().unwrap();
        fs::write(project.path().join("gostable.toml"), "fail_on = [").unwrap();

        let err = resolve_in(project.path(), None, None).load().unwrap_err();
        assert!(err.to_string().contains("gostable.toml"));
    }

    #[test]
    fn init_target_is_first_lookup_name() {
        let dir = Path::new("/work/svc");
        assert_eq!(init_target(dir), dir.join("gostable.toml"));
    }
}
