//! # PMOJukebox Configuration Module
//!
//! This module provides configuration management for PMOJukebox, including:
//! - Loading configuration from YAML files
//! - Merging with embedded default configuration
//! - Environment variable overrides
//! - Type-safe getters and setters for configuration values
//! - Thread-safe singleton access pattern
//!
//! ## Usage
//!
//! ```no_run
//! use pmoconfig::get_config;
//!
//! // Get the global configuration
//! let config = get_config();
//!
//! // Access configuration values
//! let port = config.get_http_port();
//! let snapshot = config.get_queue_snapshot_path()?;
//!
//! // Update configuration values
//! config.set_queue_policy("fifo")?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{anyhow, Result};
use dirs::home_dir;
use lazy_static::lazy_static;
use serde_yaml::{Mapping, Number, Value};
use std::{
    env, fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard},
};
use tracing::{info, warn};

// Configuration par défaut intégrée
const DEFAULT_CONFIG: &str = include_str!("pmojukebox.yaml");

lazy_static! {
    static ref CONFIG: Arc<Config> = Arc::new(Config::load_config("").unwrap_or_else(|err| {
        warn!("Failed to load PMOJukebox configuration ({}), using embedded defaults", err);
        Config::embedded()
    }));
}

const ENV_CONFIG_DIR: &str = "PMOJUKEBOX_CONFIG";
const ENV_PREFIX: &str = "PMOJUKEBOX_CONFIG__";
const CONFIG_DIR_NAME: &str = ".pmojukebox";

// Default values for configuration
const DEFAULT_BASE_URL: &str = "localhost";
const DEFAULT_HTTP_PORT: u16 = 8080;
const DEFAULT_LOG_BUFFER_CAPACITY: usize = 1000;
const DEFAULT_LOG_MIN_LEVEL: &str = "INFO";
const DEFAULT_LOG_ENABLE_CONSOLE: bool = true;
const DEFAULT_QUEUE_POLICY: &str = "round_robin";
const DEFAULT_QUEUE_SNAPSHOT: &str = "queue.snapshot";
const DEFAULT_RESTORE_ON_START: bool = true;
const DEFAULT_DATABASE_PATH: &str = "jukebox.db";

/// Macro to generate getter/setter for usize values with default
macro_rules! impl_usize_config {
    ($getter:ident, $setter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> Result<usize> {
            match self.get_value($path) {
                Ok(Value::Number(n)) => Ok(n
                    .as_u64()
                    .and_then(|v| usize::try_from(v).ok())
                    .unwrap_or($default)),
                _ => Ok($default),
            }
        }

        pub fn $setter(&self, size: usize) -> Result<()> {
            let n = Number::from(size);
            self.set_value($path, Value::Number(n))
        }
    };
}

/// Macro to generate getter/setter for bool values with default
macro_rules! impl_bool_config {
    ($getter:ident, $setter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> Result<bool> {
            match self.get_value($path) {
                Ok(Value::Bool(b)) => Ok(b),
                _ => Ok($default),
            }
        }

        pub fn $setter(&self, value: bool) -> Result<()> {
            self.set_value($path, Value::Bool(value))
        }
    };
}

/// Macro to generate getter/setter for string values with default
macro_rules! impl_string_config {
    ($getter:ident, $setter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> Result<String> {
            match self.get_value($path) {
                Ok(Value::String(s)) if !s.trim().is_empty() => Ok(s),
                _ => Ok($default.to_string()),
            }
        }

        pub fn $setter(&self, value: &str) -> Result<()> {
            self.set_value($path, Value::String(value.to_string()))
        }
    };
}

/// Configuration manager for PMOJukebox
///
/// # Examples
///
/// ```no_run
/// use pmoconfig::get_config;
///
/// let config = get_config();
/// let port = config.get_http_port();
/// println!("HTTP port: {}", port);
/// ```
#[derive(Debug)]
pub struct Config {
    config_dir: String,
    /// Fichier config.yaml, `None` pour une configuration purement mémoire
    path: Option<String>,
    data: Mutex<Value>,
}

impl Config {
    /// Finds a config directory by trying different locations in order
    fn find_config_dir(directory: &str) -> String {
        // 1. Try provided directory
        if !directory.is_empty() {
            return directory.to_string();
        }

        // 2. Try environment variable
        if let Ok(env_path) = env::var(ENV_CONFIG_DIR) {
            info!(env_var=ENV_CONFIG_DIR, path=%env_path, "Trying to load config from env");
            return env_path;
        }

        // 3. Try current directory
        if Path::new(CONFIG_DIR_NAME).exists() {
            return CONFIG_DIR_NAME.to_string();
        }

        // 4. Try home directory
        if let Some(home) = home_dir() {
            let home_config = home.join(CONFIG_DIR_NAME);
            if home_config.exists() {
                return home_config.to_string_lossy().to_string();
            }
        }

        // Default fallback
        CONFIG_DIR_NAME.to_string()
    }

    /// Validates and prepares a config directory
    fn validate_config_dir(path: &Path) -> Result<()> {
        if !path.exists() {
            fs::create_dir_all(path)?;
        }

        if !path.is_dir() {
            return Err(anyhow!("{} is not a directory", path.display()));
        }

        // Test write permission
        let test_file = path.join(".write_test");
        fs::write(&test_file, b"test")?;
        fs::remove_file(&test_file)?;

        fs::read_dir(path)?;
        Ok(())
    }

    /// Determines and validates the configuration directory
    ///
    /// The directory is searched in the following order:
    /// 1. The provided `directory` parameter if not empty
    /// 2. The `PMOJUKEBOX_CONFIG` environment variable
    /// 3. `.pmojukebox` in the current directory
    /// 4. `.pmojukebox` in the user's home directory
    ///
    /// The directory is created if it doesn't exist, and validated for
    /// read/write permissions.
    pub fn config_dir(directory: &str) -> Result<String> {
        let dir_path = Self::find_config_dir(directory);
        Self::validate_config_dir(Path::new(&dir_path))
            .map_err(|e| anyhow!("Invalid configuration directory {}: {}", dir_path, e))?;
        Ok(dir_path)
    }

    /// Loads the configuration from the specified directory
    ///
    /// This method:
    /// 1. Determines the configuration directory
    /// 2. Loads the default embedded configuration
    /// 3. Merges it with the external config.yaml file if present
    /// 4. Applies environment variable overrides
    /// 5. Saves the merged configuration
    pub fn load_config(directory: &str) -> Result<Self> {
        let config_dir = Self::config_dir(directory)?;
        info!(config_dir=%config_dir, "Using config directory");

        let config_file_path = Path::new(&config_dir).join("config.yaml");
        let path = config_file_path.to_string_lossy().to_string();

        let mut config_value: Value = serde_yaml::from_str(DEFAULT_CONFIG)?;

        match fs::read(&path) {
            Ok(data) => {
                info!(config_file=%path, "Loaded config file");
                let external_value: Value = serde_yaml::from_slice(&data)?;
                merge_yaml(&mut config_value, &external_value);
            }
            Err(_) => {
                info!(config_file=%path, "Config file not found, using default embedded config");
            }
        }

        let mut config_value = Self::lower_keys_value(config_value);
        Self::apply_env_overrides(&mut config_value);

        let config = Config {
            config_dir,
            path: Some(path),
            data: Mutex::new(config_value),
        };

        config.save()?;
        Ok(config)
    }

    /// Configuration par défaut, sans fichier ni répertoire validé
    fn embedded() -> Self {
        let value = serde_yaml::from_str(DEFAULT_CONFIG).unwrap_or(Value::Mapping(Mapping::new()));
        Config {
            config_dir: CONFIG_DIR_NAME.to_string(),
            path: None,
            data: Mutex::new(Self::lower_keys_value(value)),
        }
    }

    /// Directory holding config.yaml and the relative data files.
    pub fn get_config_dir(&self) -> &str {
        &self.config_dir
    }

    fn lock(&self) -> Result<MutexGuard<'_, Value>> {
        self.data
            .lock()
            .map_err(|_| anyhow!("Configuration lock poisoned"))
    }

    /// Saves the current configuration to the config.yaml file
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let yaml = serde_yaml::to_string(&*self.lock()?)?;
        fs::write(path, yaml)?;
        Ok(())
    }

    /// Sets a configuration value at the specified path and saves it
    ///
    /// # Arguments
    ///
    /// * `path` - Array of keys representing the path (e.g., `&["host", "http_port"]`)
    /// * `value` - The YAML value to set
    pub fn set_value(&self, path: &[&str], value: Value) -> Result<()> {
        {
            let mut data = self.lock()?;
            Self::set_value_internal(&mut data, path, value)?;
        }
        self.save()
    }

    fn set_value_internal(data: &mut Value, path: &[&str], value: Value) -> Result<()> {
        if path.is_empty() {
            *data = value;
            return Ok(());
        }
        if let Value::Mapping(map) = data {
            let key_value = Value::String(path[0].to_lowercase());
            if path.len() == 1 {
                map.insert(key_value, value);
            } else {
                let entry = map
                    .entry(key_value)
                    .or_insert(Value::Mapping(Mapping::new()));
                Self::set_value_internal(entry, &path[1..], value)?;
            }
            Ok(())
        } else {
            Err(anyhow!("Current node is not a map"))
        }
    }

    /// Gets a configuration value at the specified path
    ///
    /// Returns an error if the path doesn't exist.
    pub fn get_value(&self, path: &[&str]) -> Result<Value> {
        let data = self.lock()?;
        Self::get_value_internal(&data, path)
    }

    fn get_value_internal(data: &Value, path: &[&str]) -> Result<Value> {
        let mut current = data;
        for (i, key) in path.iter().enumerate() {
            if let Value::Mapping(map) = current {
                match map.get(Value::String(key.to_lowercase())) {
                    Some(next) => current = next,
                    None => return Err(anyhow!("Path {} does not exist", path[..=i].join("."))),
                }
            } else {
                return Err(anyhow!("Path {} is not a mapping", path[..i].join(".")));
            }
        }
        Ok(current.clone())
    }

    fn apply_env_overrides(config: &mut Value) {
        for (key, value) in env::vars() {
            if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                let key_path = stripped.split("__").collect::<Vec<_>>();
                let yaml_value = Self::convert_env_value(&value);
                if let Err(e) = Self::set_value_internal(config, &key_path, yaml_value) {
                    warn!(env_var=%key, "Ignoring environment override: {}", e);
                }
            }
        }
    }

    fn convert_env_value(value: &str) -> Value {
        serde_yaml::from_str::<Value>(value).unwrap_or_else(|_| Value::String(value.to_string()))
    }

    fn lower_keys_value(value: Value) -> Value {
        match value {
            Value::Mapping(map) => Value::Mapping(
                map.into_iter()
                    .map(|(k, v)| {
                        let k = match k {
                            Value::String(s) => Value::String(s.to_lowercase()),
                            other => other,
                        };
                        (k, Self::lower_keys_value(v))
                    })
                    .collect(),
            ),
            Value::Sequence(seq) => {
                Value::Sequence(seq.into_iter().map(Self::lower_keys_value).collect())
            }
            _ => value,
        }
    }

    /// Résout un chemin relatif par rapport au répertoire de configuration
    fn resolve_path(&self, file_path: &str) -> PathBuf {
        let path = Path::new(file_path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            Path::new(&self.config_dir).join(path)
        }
    }

    /// Récupère un fichier géré par la configuration
    ///
    /// Le chemin peut être absolu ou relatif au répertoire de configuration.
    /// Le répertoire parent est créé s'il n'existe pas ; le fichier lui-même
    /// n'est pas touché.
    ///
    /// # Exemple
    ///
    /// ```no_run
    /// use pmoconfig::get_config;
    ///
    /// let config = get_config();
    /// let db = config.get_managed_file(&["jukebox", "database", "path"], "jukebox.db")?;
    /// println!("Database: {}", db.display());
    /// # Ok::<(), anyhow::Error>(())
    /// ```
    pub fn get_managed_file(&self, path: &[&str], default: &str) -> Result<PathBuf> {
        let file_path = match self.get_value(path) {
            Ok(Value::String(s)) if !s.trim().is_empty() => s,
            _ => {
                self.set_value(path, Value::String(default.to_string()))?;
                default.to_string()
            }
        };

        let resolved = self.resolve_path(&file_path);
        if let Some(parent) = resolved.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
                info!(directory=%parent.display(), "Created data directory");
            }
        }
        Ok(resolved)
    }

    /// Gets the base URL for the HTTP server
    ///
    /// Returns the configured host name, or `localhost` if not configured.
    pub fn get_base_url(&self) -> String {
        match self.get_value(&["host", "base_url"]) {
            Ok(Value::String(s)) if !s.is_empty() => s,
            Ok(_) => {
                warn!("Base URL is not a string or empty, using default {}", DEFAULT_BASE_URL);
                DEFAULT_BASE_URL.to_string()
            }
            Err(err) => {
                warn!("Failed to get base URL: {}, using default {}", err, DEFAULT_BASE_URL);
                DEFAULT_BASE_URL.to_string()
            }
        }
    }

    /// Gets the HTTP port from configuration
    ///
    /// Returns the configured HTTP port, or the default port (8080) if not
    /// configured or invalid.
    pub fn get_http_port(&self) -> u16 {
        let port = match self.get_value(&["host", "http_port"]) {
            Ok(Value::Number(n)) => n.as_u64().and_then(|p| u16::try_from(p).ok()),
            Ok(Value::String(s)) => s.trim().parse::<u16>().ok(),
            _ => None,
        };

        port.unwrap_or_else(|| {
            warn!("Invalid or missing HTTP port, using default {}", DEFAULT_HTTP_PORT);
            DEFAULT_HTTP_PORT
        })
    }

    pub fn set_http_port(&self, port: u16) -> Result<()> {
        let n = Number::from(port);
        self.set_value(&["host", "http_port"], Value::Number(n))
    }

    impl_usize_config!(
        get_log_cache_size,
        set_log_cache_size,
        &["host", "logger", "buffer_capacity"],
        DEFAULT_LOG_BUFFER_CAPACITY
    );

    impl_bool_config!(
        get_log_enable_console,
        set_log_enable_console,
        &["host", "logger", "enable_console"],
        DEFAULT_LOG_ENABLE_CONSOLE
    );

    impl_string_config!(
        get_log_min_level,
        set_log_min_level,
        &["host", "logger", "min_level"],
        DEFAULT_LOG_MIN_LEVEL
    );

    // Jukebox

    impl_string_config!(
        get_queue_policy,
        set_queue_policy,
        &["jukebox", "queue", "policy"],
        DEFAULT_QUEUE_POLICY
    );

    impl_bool_config!(
        get_queue_restore_on_start,
        set_queue_restore_on_start,
        &["jukebox", "queue", "restore_on_start"],
        DEFAULT_RESTORE_ON_START
    );

    /// Fichier de snapshot de la file (relatif au répertoire de configuration)
    pub fn get_queue_snapshot_path(&self) -> Result<PathBuf> {
        self.get_managed_file(&["jukebox", "queue", "snapshot"], DEFAULT_QUEUE_SNAPSHOT)
    }

    /// Base SQLite des utilisateurs et morceaux
    pub fn get_database_path(&self) -> Result<PathBuf> {
        self.get_managed_file(&["jukebox", "database", "path"], DEFAULT_DATABASE_PATH)
    }
}

/// Returns the global configuration instance
///
/// This function provides access to the singleton configuration instance,
/// which is lazily loaded on first access.
pub fn get_config() -> Arc<Config> {
    CONFIG.clone()
}

/// Merges external YAML configuration into default configuration
///
/// - For mappings (objects), it merges keys from external into default
/// - For scalars and sequences, external values replace default values
fn merge_yaml(default: &mut Value, external: &Value) {
    match (default, external) {
        (Value::Mapping(dmap), Value::Mapping(emap)) => {
            for (k, v) in emap {
                match dmap.get_mut(k) {
                    Some(dv) => merge_yaml(dv, v),
                    None => {
                        dmap.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        (d, e) => *d = e.clone(), // pour les scalaires ou séquences, on remplace
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_defaults() {
        let config = Config::embedded();
        assert_eq!(config.get_http_port(), 8080);
        assert_eq!(config.get_base_url(), "localhost");
        assert_eq!(config.get_queue_policy().unwrap(), "round_robin");
        assert!(config.get_queue_restore_on_start().unwrap());
        assert_eq!(config.get_log_min_level().unwrap(), "INFO");
        assert_eq!(config.get_log_cache_size().unwrap(), 1000);
    }

    #[test]
    fn test_merge_keeps_unspecified_defaults() {
        let mut base: Value = serde_yaml::from_str("host:\n  http_port: 8080\n  base_url: a\n").unwrap();
        let external: Value = serde_yaml::from_str("host:\n  http_port: 9000\n").unwrap();
        merge_yaml(&mut base, &external);

        let port = Config::get_value_internal(&base, &["host", "http_port"]).unwrap();
        let url = Config::get_value_internal(&base, &["host", "base_url"]).unwrap();
        assert_eq!(port, Value::Number(9000.into()));
        assert_eq!(url, Value::String("a".into()));
    }

    #[test]
    fn test_keys_are_case_insensitive() {
        let value: Value = serde_yaml::from_str("Jukebox:\n  Queue:\n    Policy: fifo\n").unwrap();
        let value = Config::lower_keys_value(value);
        let policy = Config::get_value_internal(&value, &["JUKEBOX", "queue", "POLICY"]).unwrap();
        assert_eq!(policy, Value::String("fifo".into()));
    }

    #[test]
    fn test_env_values_are_typed() {
        assert_eq!(Config::convert_env_value("9000"), Value::Number(9000.into()));
        assert_eq!(Config::convert_env_value("false"), Value::Bool(false));
        assert_eq!(Config::convert_env_value("fifo"), Value::String("fifo".into()));
    }

    #[test]
    fn test_load_config_writes_file_and_resolves_paths() -> Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let dir = temp_dir.path().to_string_lossy().to_string();
        fs::write(
            temp_dir.path().join("config.yaml"),
            "jukebox:\n  queue:\n    policy: fifo\n    snapshot: state/queue.bin\n",
        )?;

        let config = Config::load_config(&dir)?;
        assert_eq!(config.get_queue_policy()?, "fifo");

        let snapshot = config.get_queue_snapshot_path()?;
        assert_eq!(snapshot, temp_dir.path().join("state").join("queue.bin"));
        assert!(temp_dir.path().join("state").is_dir());

        config.set_http_port(9090)?;
        let reloaded = Config::load_config(&dir)?;
        assert_eq!(reloaded.get_http_port(), 9090);
        Ok(())
    }
}
