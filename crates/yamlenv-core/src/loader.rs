//! Gated application of a config file to the environment
//!
//! When an orchestrator has already provided the environment it sets a
//! sentinel variable (`ENVIRONMENT`), and the file is left alone. Otherwise
//! the file's values are written into the environment at startup.

use std::path::Path;

use crate::config::Configuration;
use crate::env::{Environment, SystemEnvironment};
use crate::error::Result;

/// Sentinel variable checked by [`Loader::init_environment`]
pub const DEFAULT_SENTINEL: &str = "ENVIRONMENT";

/// Options for the loader
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderOptions {
    /// Name of the variable whose presence means "already configured"
    pub sentinel: String,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            sentinel: DEFAULT_SENTINEL.to_string(),
        }
    }
}

/// What [`Loader::init_environment`] did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitOutcome {
    /// The sentinel was unset and `count` entries were applied from the file
    Applied { count: usize },
    /// The sentinel was set (possibly to an empty string); the file was not read
    Skipped { value: String },
}

/// Loads config files and applies them to an environment
#[derive(Debug, Clone, Default)]
pub struct Loader<E> {
    env: E,
    options: LoaderOptions,
}

impl Loader<SystemEnvironment> {
    /// Loader over the real process environment
    pub fn system() -> Self {
        Self::new(SystemEnvironment)
    }
}

impl<E: Environment> Loader<E> {
    pub fn new(env: E) -> Self {
        Self::with_options(env, LoaderOptions::default())
    }

    pub fn with_options(env: E, options: LoaderOptions) -> Self {
        Self { env, options }
    }

    /// Use a different sentinel variable
    pub fn with_sentinel(mut self, sentinel: impl Into<String>) -> Self {
        self.options.sentinel = sentinel.into();
        self
    }

    pub fn options(&self) -> &LoaderOptions {
        &self.options
    }

    pub fn env(&self) -> &E {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut E {
        &mut self.env
    }

    pub fn into_env(self) -> E {
        self.env
    }

    /// Load the configuration at `path`
    pub fn load_config(&self, path: impl AsRef<Path>) -> Result<Configuration> {
        Configuration::load(path)
    }

    /// Write `config` to `path`
    pub fn save_config(&self, config: &Configuration, path: impl AsRef<Path>) -> Result<()> {
        config.save(path)
    }

    /// Load `path` and set each entry in the environment, in file order
    ///
    /// Returns the number of entries applied. Nothing is set if the file
    /// can't be loaded; if an entry is rejected, earlier entries stay set.
    pub fn set_values_as_env(&mut self, path: impl AsRef<Path>) -> Result<usize> {
        let config = Configuration::load(path)?;
        config.apply(&mut self.env)
    }

    /// Apply the file at `path` unless the sentinel variable is set
    ///
    /// Any presence of the sentinel counts, including an empty value. A
    /// failure is logged and returned; callers are expected to treat it as
    /// fatal and stop the process.
    pub fn init_environment(&mut self, path: impl AsRef<Path>) -> Result<InitOutcome> {
        let path = path.as_ref();
        let sentinel = self.options.sentinel.clone();

        match self.env.lookup(&sentinel) {
            Some(value) => {
                log::info!(
                    "{} = {:?}, using environment provided by the system",
                    sentinel,
                    value
                );
                Ok(InitOutcome::Skipped { value })
            }
            None => {
                log::info!(
                    "{} is not set, loading environment from {}",
                    sentinel,
                    path.display()
                );
                match self.set_values_as_env(path) {
                    Ok(count) => Ok(InitOutcome::Applied { count }),
                    Err(e) => {
                        log::error!("Failed to load environment from {}: {}", path.display(), e);
                        Err(e)
                    }
                }
            }
        }
    }

    /// Load `path` for the caller, then run [`init_environment`](Self::init_environment)
    ///
    /// A load failure is returned straight away and the environment is not
    /// touched.
    pub fn bootstrap(&mut self, path: impl AsRef<Path>) -> Result<Configuration> {
        let path = path.as_ref();
        let config = self.load_config(path)?;
        self.init_environment(path)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::MemoryEnvironment;
    use crate::error::ErrorKind;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn write_config(dir: &tempfile::TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("config.yml");
        std::fs::write(&path, content).unwrap();
        path
    }

    const AB: &str = r#"
values:
  - key: A
    value: "1"
  - key: B
    value: "2"
"#;

    #[test]
    fn test_set_values_as_env() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, AB);
        let mut loader = Loader::new(MemoryEnvironment::new());

        assert_eq!(loader.set_values_as_env(&path).unwrap(), 2);
        assert_eq!(loader.env().get("A"), "1");
        assert_eq!(loader.env().get("B"), "2");
    }

    #[test]
    fn test_duplicate_keys_last_write_wins() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            "values: [{key: X, value: \"1\"}, {key: X, value: \"2\"}]\n",
        );
        let mut loader = Loader::new(MemoryEnvironment::new());

        loader.set_values_as_env(&path).unwrap();
        assert_eq!(loader.env().get("X"), "2");
    }

    #[test]
    fn test_set_values_overwrites_existing() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, AB);
        let env: MemoryEnvironment = [("A", "old")].into_iter().collect();
        let mut loader = Loader::new(env);

        loader.set_values_as_env(&path).unwrap();
        assert_eq!(loader.env().get("A"), "1");
    }

    #[test]
    fn test_missing_file_leaves_env_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let mut loader = Loader::new(MemoryEnvironment::new());

        let err = loader
            .set_values_as_env(dir.path().join("missing.yml"))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Io);
        assert!(loader.env().is_empty());
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "values: \"not a list\"\n");
        let mut loader = Loader::new(MemoryEnvironment::new());

        let err = loader.set_values_as_env(&path).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Parse);
        assert!(loader.env().is_empty());
    }

    #[test]
    fn test_init_applies_when_sentinel_unset() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, AB);
        let mut loader = Loader::new(MemoryEnvironment::new());

        let outcome = loader.init_environment(&path).unwrap();
        assert_eq!(outcome, InitOutcome::Applied { count: 2 });
        assert_eq!(loader.env().get("A"), "1");
        assert_eq!(loader.env().get("B"), "2");
    }

    #[test]
    fn test_init_skips_when_sentinel_set() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, AB);
        let env: MemoryEnvironment = [("ENVIRONMENT", "production")].into_iter().collect();
        let mut loader = Loader::new(env);

        let outcome = loader.init_environment(&path).unwrap();
        assert_eq!(
            outcome,
            InitOutcome::Skipped {
                value: "production".into()
            }
        );
        assert_eq!(loader.env().lookup("A"), None);
        assert_eq!(loader.env().len(), 1);
    }

    #[test]
    fn test_init_skips_when_sentinel_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, AB);
        let env: MemoryEnvironment = [("ENVIRONMENT", "")].into_iter().collect();
        let mut loader = Loader::new(env);

        let outcome = loader.init_environment(&path).unwrap();
        assert_eq!(outcome, InitOutcome::Skipped { value: String::new() });
        assert_eq!(loader.env().lookup("A"), None);
    }

    #[test]
    fn test_init_skips_missing_or_malformed_file_when_sentinel_set() {
        let dir = tempfile::tempdir().unwrap();
        let malformed = write_config(&dir, "values: [unclosed");
        let env: MemoryEnvironment = [("ENVIRONMENT", "staging")].into_iter().collect();
        let mut loader = Loader::new(env);

        assert!(loader.init_environment(&malformed).is_ok());
        assert!(loader
            .init_environment(dir.path().join("missing.yml"))
            .is_ok());
    }

    #[test]
    fn test_init_fails_on_missing_file_when_sentinel_unset() {
        let dir = tempfile::tempdir().unwrap();
        let mut loader = Loader::new(MemoryEnvironment::new());

        let err = loader
            .init_environment(dir.path().join("missing.yml"))
            .unwrap_err();
        assert!(err.is_io());
    }

    #[test]
    fn test_init_fails_on_malformed_file_when_sentinel_unset() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "values: \"not a list\"\n");
        let mut loader = Loader::new(MemoryEnvironment::new());

        assert!(loader.init_environment(&path).unwrap_err().is_parse());
    }

    #[test]
    fn test_custom_sentinel() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, AB);
        let env: MemoryEnvironment = [("ENVIRONMENT", "production")].into_iter().collect();
        let mut loader = Loader::new(env).with_sentinel("APP_ENV");

        assert_eq!(loader.options().sentinel, "APP_ENV");
        assert_eq!(
            loader.init_environment(&path).unwrap(),
            InitOutcome::Applied { count: 2 }
        );

        loader.env_mut().set("APP_ENV", "k8s").unwrap();
        loader.env_mut().remove("A");
        assert!(matches!(
            loader.init_environment(&path).unwrap(),
            InitOutcome::Skipped { .. }
        ));
        assert_eq!(loader.env().lookup("A"), None);
    }

    #[test]
    fn test_bootstrap_returns_config_and_applies() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, AB);
        let mut loader = Loader::new(MemoryEnvironment::new());

        let config = loader.bootstrap(&path).unwrap();
        assert_eq!(config.len(), 2);
        assert_eq!(config.get("B"), Some("2"));

        let env = loader.into_env();
        assert_eq!(env.get("A"), "1");
    }

    #[test]
    fn test_bootstrap_load_failure_skips_init() {
        let dir = tempfile::tempdir().unwrap();
        let mut loader = Loader::new(MemoryEnvironment::new());

        let err = loader.bootstrap(dir.path().join("missing.yml")).unwrap_err();
        assert!(err.is_io());
        assert!(loader.env().is_empty());
    }

    #[test]
    fn test_bootstrap_with_sentinel_set_returns_config_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, AB);
        let env: MemoryEnvironment = [("ENVIRONMENT", "production")].into_iter().collect();
        let mut loader = Loader::new(env);

        let config = loader.bootstrap(&path).unwrap();
        assert_eq!(config.get("A"), Some("1"));
        assert_eq!(loader.env().lookup("A"), None);
    }

    #[test]
    fn test_save_config_round_trip_through_loader() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("saved.yml");
        let loader = Loader::new(MemoryEnvironment::new());
        let config: Configuration = [
            crate::Entry::new("K1", "v1"),
            crate::Entry::new("K2", "v2"),
        ]
        .into_iter()
        .collect();

        loader.save_config(&config, &path).unwrap();
        assert_eq!(loader.load_config(&path).unwrap(), config);
    }

    #[test]
    fn test_loader_over_borrowed_environment() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, AB);
        let mut env = MemoryEnvironment::new();

        Loader::new(&mut env).init_environment(&path).unwrap();
        assert_eq!(env.get("B"), "2");
    }
}
