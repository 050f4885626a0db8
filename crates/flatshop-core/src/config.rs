//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (`FLATSHOP_CONFIG`, `./flatshop.toml`, or ~/.config/flatshop/config.toml)
//! 3. Environment variables (FLATSHOP_* prefix)
//!
//! Environment variables take precedence over config file values.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Environment variable prefix
const ENV_PREFIX: &str = "FLATSHOP";

/// Config file looked up in the working directory before the user config dir
const LOCAL_CONFIG_FILE: &str = "flatshop.toml";

/// How new record ids are assigned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdStrategy {
    /// Id is the inode number of the staged file (unix only)
    Inode,
    /// Id is one past the highest id already in the table
    Sequential,
}

impl Default for IdStrategy {
    fn default() -> Self {
        if cfg!(unix) {
            IdStrategy::Inode
        } else {
            IdStrategy::Sequential
        }
    }
}

impl fmt::Display for IdStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdStrategy::Inode => write!(f, "inode"),
            IdStrategy::Sequential => write!(f, "sequential"),
        }
    }
}

impl FromStr for IdStrategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "inode" => Ok(IdStrategy::Inode),
            "sequential" => Ok(IdStrategy::Sequential),
            other => bail!("Unknown id strategy '{}' (expected 'inode' or 'sequential')", other),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base directory; relative paths below resolve against it
    #[serde(default = "default_root_dir")]
    pub root_dir: PathBuf,

    /// Record files (`<db_dir>/<table>/<id>`, `<db_dir>/website`)
    #[serde(default = "default_db_dir")]
    pub db_dir: PathBuf,

    /// Scratch directory for staged records; must be on the same filesystem as `db_dir`
    #[serde(default = "default_staging_dir")]
    pub staging_dir: PathBuf,

    /// Page templates
    #[serde(default = "default_template_dir")]
    pub template_dir: PathBuf,

    #[serde(default)]
    pub id_strategy: IdStrategy,

    /// Log filter directive (e.g. "info", "flatshop_core=debug")
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log destination; stderr when unset
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root_dir: default_root_dir(),
            db_dir: default_db_dir(),
            staging_dir: default_staging_dir(),
            template_dir: default_template_dir(),
            id_strategy: IdStrategy::default(),
            log_level: default_log_level(),
            log_file: None,
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (FLATSHOP_ROOT, FLATSHOP_DB_DIR, ...)
    /// 2. Config file (see [`Config::config_file_path`])
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Configuration rooted at `root` with default layout, ignoring the environment
    pub fn rooted_at(root: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root.into(),
            ..Self::default()
        }
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(val) = std::env::var(format!("{}_ROOT", ENV_PREFIX)) {
            self.root_dir = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var(format!("{}_DB_DIR", ENV_PREFIX)) {
            self.db_dir = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var(format!("{}_STAGING_DIR", ENV_PREFIX)) {
            self.staging_dir = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var(format!("{}_TEMPLATE_DIR", ENV_PREFIX)) {
            self.template_dir = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var(format!("{}_ID_STRATEGY", ENV_PREFIX)) {
            self.id_strategy = val
                .parse()
                .with_context(|| format!("Invalid {}_ID_STRATEGY", ENV_PREFIX))?;
        }

        if let Ok(val) = std::env::var(format!("{}_LOG", ENV_PREFIX)) {
            if !val.is_empty() {
                self.log_level = val;
            }
        }

        // Empty string clears it
        if let Ok(val) = std::env::var(format!("{}_LOG_FILE", ENV_PREFIX)) {
            self.log_file = if val.is_empty() {
                None
            } else {
                Some(PathBuf::from(val))
            };
        }

        Ok(())
    }

    /// Create the record tables and the staging directory
    pub fn ensure_dirs(&self, tables: &[&str]) -> Result<()> {
        let db = self.db_path();
        for dir in tables
            .iter()
            .map(|table| db.join(table))
            .chain(std::iter::once(self.staging_path()))
        {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create directory: {:?}", dir))?;
        }
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with FLATSHOP_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            return local;
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("flatshop")
            .join("config.toml")
    }

    /// Get the record root directory
    pub fn db_path(&self) -> PathBuf {
        self.resolve(&self.db_dir)
    }

    /// Get the staging directory
    pub fn staging_path(&self) -> PathBuf {
        self.resolve(&self.staging_dir)
    }

    /// Get the template directory
    pub fn template_path(&self) -> PathBuf {
        self.resolve(&self.template_dir)
    }

    fn resolve(&self, dir: &Path) -> PathBuf {
        if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            self.root_dir.join(dir)
        }
    }
}

fn default_root_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_db_dir() -> PathBuf {
    PathBuf::from("db")
}

fn default_staging_dir() -> PathBuf {
    PathBuf::from("tmp")
}

fn default_template_dir() -> PathBuf {
    PathBuf::from("html")
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Mutex to serialize tests that touch environment variables
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// Guard that locks env access and saves/restores env vars
    struct EnvGuard<'a> {
        _lock: std::sync::MutexGuard<'a, ()>,
        saved: Vec<(String, Option<String>)>,
    }

    impl<'a> EnvGuard<'a> {
        fn new(vars: &[&str]) -> Self {
            let lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
            let saved = vars
                .iter()
                .map(|&name| (name.to_string(), env::var(name).ok()))
                .collect();
            for name in vars {
                env::remove_var(name);
            }
            Self { _lock: lock, saved }
        }
    }

    impl Drop for EnvGuard<'_> {
        fn drop(&mut self) {
            for (name, value) in &self.saved {
                match value {
                    Some(v) => env::set_var(name, v),
                    None => env::remove_var(name),
                }
            }
        }
    }

    const ENV_VARS: &[&str] = &[
        "FLATSHOP_ROOT",
        "FLATSHOP_DB_DIR",
        "FLATSHOP_STAGING_DIR",
        "FLATSHOP_TEMPLATE_DIR",
        "FLATSHOP_ID_STRATEGY",
        "FLATSHOP_LOG",
        "FLATSHOP_LOG_FILE",
    ];

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.db_path(), PathBuf::from("./db"));
        assert_eq!(config.staging_path(), PathBuf::from("./tmp"));
        assert_eq!(config.template_path(), PathBuf::from("./html"));
        assert_eq!(config.log_level, "info");
        assert!(config.log_file.is_none());
    }

    #[test]
    fn test_absolute_dirs_ignore_root() {
        let mut config = Config::rooted_at("/srv/shop");
        config.staging_dir = PathBuf::from("/var/tmp/shop");

        assert_eq!(config.db_path(), PathBuf::from("/srv/shop/db"));
        assert_eq!(config.staging_path(), PathBuf::from("/var/tmp/shop"));
    }

    #[test]
    fn test_env_override_dirs() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();

        env::set_var("FLATSHOP_ROOT", "/tmp/flatshop-test");
        env::set_var("FLATSHOP_DB_DIR", "records");
        config.apply_env_overrides().unwrap();

        assert_eq!(config.db_path(), PathBuf::from("/tmp/flatshop-test/records"));
    }

    #[test]
    fn test_env_override_id_strategy() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();

        env::set_var("FLATSHOP_ID_STRATEGY", "Sequential");
        config.apply_env_overrides().unwrap();
        assert_eq!(config.id_strategy, IdStrategy::Sequential);

        env::set_var("FLATSHOP_ID_STRATEGY", "uuid");
        assert!(config.apply_env_overrides().is_err());
    }

    #[test]
    fn test_env_override_log_file() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();

        env::set_var("FLATSHOP_LOG_FILE", "/var/log/flatshop.log");
        config.apply_env_overrides().unwrap();
        assert_eq!(config.log_file, Some(PathBuf::from("/var/log/flatshop.log")));

        // Empty string clears it
        env::set_var("FLATSHOP_LOG_FILE", "");
        config.apply_env_overrides().unwrap();
        assert!(config.log_file.is_none());
    }

    #[test]
    fn test_load_from_str() {
        let _guard = EnvGuard::new(ENV_VARS);

        let toml = r#"
            root_dir = "/srv/shop"
            staging_dir = "scratch"
            id_strategy = "sequential"
            log_level = "debug"
        "#;

        let config = Config::load_from_str(toml).unwrap();
        assert_eq!(config.staging_path(), PathBuf::from("/srv/shop/scratch"));
        assert_eq!(config.db_path(), PathBuf::from("/srv/shop/db"));
        assert_eq!(config.id_strategy, IdStrategy::Sequential);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_serialization() {
        let config = Config {
            id_strategy: IdStrategy::Sequential,
            log_file: Some(PathBuf::from("/var/log/shop.log")),
            ..Config::rooted_at("/srv/shop")
        };

        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("id_strategy = \"sequential\""));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.root_dir, config.root_dir);
        assert_eq!(parsed.id_strategy, config.id_strategy);
        assert_eq!(parsed.log_file, config.log_file);
    }

    #[test]
    fn test_load_from_path_missing_file() {
        let _guard = EnvGuard::new(ENV_VARS);

        let path = PathBuf::from("/nonexistent/flatshop.toml");
        let config = Config::load_from_path(&path).unwrap();
        assert_eq!(config.db_dir, PathBuf::from("db"));
    }

    #[test]
    fn test_ensure_dirs() {
        let temp = tempfile::TempDir::new().unwrap();
        let config = Config::rooted_at(temp.path());

        config.ensure_dirs(&["category", "item"]).unwrap();

        assert!(temp.path().join("db/category").is_dir());
        assert!(temp.path().join("db/item").is_dir());
        assert!(temp.path().join("tmp").is_dir());
    }
}
