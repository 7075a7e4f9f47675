/*
 * Manages the user settings of the tool and the path of the last used session
 * file. Settings are stored as pretty JSON (`settings.json`) in the per-user
 * configuration directory; every field has a default, so a missing or partial
 * file still yields a complete `Settings`. The comparison engine only ever
 * reads settings.
 *
 * `ConfigManagerOperations` abstracts the storage so the command layer can be
 * tested against a temporary directory.
 */
use super::comparator::{ComparisonPolicy, FileComparator};
use super::external_tools::{CoreExternalToolLauncher, ExternalCommand};
use super::path_utils::{self, APP_NAME};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};

const SETTINGS_FILENAME: &str = "settings.json";
const LAST_SESSION_PATH_FILENAME: &str = "last_session_path.txt";
pub const DEFAULT_LOG_FILENAME: &str = "dir_compare.log";

#[derive(Debug)]
pub enum ConfigError {
    Io(io::Error),
    Serde(serde_json::Error),
    NoConfigDirectory,
}

impl From<io::Error> for ConfigError {
    fn from(err: io::Error) -> Self {
        ConfigError::Io(err)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Serde(err)
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "Configuration I/O error: {e}"),
            ConfigError::Serde(e) => write!(f, "Malformed settings file: {e}"),
            ConfigError::NoConfigDirectory => {
                write!(f, "Could not determine the configuration directory")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Serde(e) => Some(e),
            ConfigError::NoConfigDirectory => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub comparison_policy: ComparisonPolicy,
    /* Names skipped at every directory level when no other list is given. */
    pub ignore: Vec<String>,
    pub diff_command: ExternalCommand,
    pub file_manager_command: ExternalCommand,
    pub log_level: String,
    /* Relative paths are resolved against the configuration directory. */
    pub log_file: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            comparison_policy: ComparisonPolicy::Shallow,
            ignore: vec![".svn".to_string()],
            diff_command: ExternalCommand::default_diff(),
            file_manager_command: ExternalCommand::default_file_manager(),
            log_level: "debug".to_string(),
            log_file: None,
        }
    }
}

impl Settings {
    /* Unknown level names fall back to `Debug`. */
    pub fn log_level_filter(&self) -> log::LevelFilter {
        self.log_level.parse().unwrap_or_else(|_| {
            log::warn!(
                "Settings: Unknown log level '{}', using debug",
                self.log_level
            );
            log::LevelFilter::Debug
        })
    }

    pub fn comparator(&self) -> FileComparator {
        FileComparator::new(self.comparison_policy)
    }

    pub fn launcher(&self) -> CoreExternalToolLauncher {
        CoreExternalToolLauncher::new(
            self.diff_command.clone(),
            self.file_manager_command.clone(),
        )
    }

    /* Where the log file goes: the configured path, or the default name inside `config_dir`. */
    pub fn log_file_path(&self, config_dir: &Path) -> PathBuf {
        match &self.log_file {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => config_dir.join(path),
            None => config_dir.join(DEFAULT_LOG_FILENAME),
        }
    }
}

pub trait ConfigManagerOperations: Send + Sync {
    fn config_dir(&self) -> Result<PathBuf>;
    /* A missing settings file is not an error; defaults are returned. */
    fn load_settings(&self) -> Result<Settings>;
    fn save_settings(&self, settings: &Settings) -> Result<()>;
    fn load_last_session_path(&self) -> Result<Option<PathBuf>>;
    /* `None` clears the stored path. */
    fn save_last_session_path(&self, session_path: Option<&Path>) -> Result<()>;
}

pub struct CoreConfigManager {
    config_dir_override: Option<PathBuf>,
}

impl CoreConfigManager {
    pub fn new() -> Self {
        CoreConfigManager {
            config_dir_override: None,
        }
    }

    /* Stores everything in `config_dir` instead of the per-user directory. */
    pub fn with_config_dir(config_dir: PathBuf) -> Self {
        CoreConfigManager {
            config_dir_override: Some(config_dir),
        }
    }
}

impl Default for CoreConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigManagerOperations for CoreConfigManager {
    fn config_dir(&self) -> Result<PathBuf> {
        match &self.config_dir_override {
            Some(dir) => {
                path_utils::ensure_dir(dir)?;
                Ok(dir.clone())
            }
            None => path_utils::app_config_dir(APP_NAME).ok_or(ConfigError::NoConfigDirectory),
        }
    }

    fn load_settings(&self) -> Result<Settings> {
        let file_path = self.config_dir()?.join(SETTINGS_FILENAME);
        if !file_path.exists() {
            log::debug!("CoreConfigManager: No settings at {file_path:?}, using defaults.");
            return Ok(Settings::default());
        }
        let reader = BufReader::new(File::open(&file_path)?);
        let settings: Settings = serde_json::from_reader(reader)?;
        log::debug!("CoreConfigManager: Loaded settings from {file_path:?}.");
        Ok(settings)
    }

    fn save_settings(&self, settings: &Settings) -> Result<()> {
        let file_path = self.config_dir()?.join(SETTINGS_FILENAME);
        let writer = BufWriter::new(File::create(&file_path)?);
        serde_json::to_writer_pretty(writer, settings)?;
        log::debug!("CoreConfigManager: Saved settings to {file_path:?}.");
        Ok(())
    }

    fn load_last_session_path(&self) -> Result<Option<PathBuf>> {
        let file_path = self.config_dir()?.join(LAST_SESSION_PATH_FILENAME);
        if !file_path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&file_path)?;
        let path_text = contents.trim();
        if path_text.is_empty() {
            log::debug!("CoreConfigManager: Last session file {file_path:?} is empty.");
            return Ok(None);
        }
        log::debug!("CoreConfigManager: Last session is '{path_text}'.");
        Ok(Some(PathBuf::from(path_text)))
    }

    fn save_last_session_path(&self, session_path: Option<&Path>) -> Result<()> {
        let file_path = self.config_dir()?.join(LAST_SESSION_PATH_FILENAME);
        let contents = session_path
            .map(|path| path.to_string_lossy().into_owned())
            .unwrap_or_default();
        fs::write(&file_path, contents)?;
        log::debug!("CoreConfigManager: Saved last session path {session_path:?}.");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_settings_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let manager = CoreConfigManager::with_config_dir(dir.path().join("config"));

        let settings = manager.load_settings().unwrap();

        assert_eq!(settings, Settings::default());
        assert_eq!(settings.ignore, vec![".svn".to_string()]);
        assert_eq!(settings.comparison_policy, ComparisonPolicy::Shallow);
        assert_eq!(settings.diff_command.program, "gvim");
    }

    #[test]
    fn test_settings_save_and_load() {
        let dir = tempdir().unwrap();
        let manager = CoreConfigManager::with_config_dir(dir.path().to_path_buf());
        let settings = Settings {
            comparison_policy: ComparisonPolicy::Strict,
            ignore: vec![".git".to_string(), "target".to_string()],
            diff_command: ExternalCommand::new("meld", &[]),
            log_level: "info".to_string(),
            ..Default::default()
        };

        manager.save_settings(&settings).unwrap();

        assert_eq!(manager.load_settings().unwrap(), settings);
    }

    #[test]
    fn test_partial_settings_file_fills_defaults() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join(SETTINGS_FILENAME),
            r#"{ "comparison_policy": "strict" }"#,
        )
        .unwrap();
        let manager = CoreConfigManager::with_config_dir(dir.path().to_path_buf());

        let settings = manager.load_settings().unwrap();

        assert_eq!(settings.comparison_policy, ComparisonPolicy::Strict);
        assert_eq!(settings.ignore, vec![".svn".to_string()]);
    }

    #[test]
    fn test_malformed_settings_file_is_an_error() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(SETTINGS_FILENAME), "{ not json").unwrap();
        let manager = CoreConfigManager::with_config_dir(dir.path().to_path_buf());

        assert!(matches!(
            manager.load_settings(),
            Err(ConfigError::Serde(_))
        ));
    }

    #[test]
    fn test_last_session_path_round_trip_and_clear() {
        let dir = tempdir().unwrap();
        let manager = CoreConfigManager::with_config_dir(dir.path().to_path_buf());
        assert_eq!(manager.load_last_session_path().unwrap(), None);

        let session = PathBuf::from("/tmp/work.dcs");
        manager.save_last_session_path(Some(session.as_path())).unwrap();
        assert_eq!(manager.load_last_session_path().unwrap(), Some(session));

        manager.save_last_session_path(None).unwrap();
        assert_eq!(manager.load_last_session_path().unwrap(), None);
    }

    #[test]
    fn test_log_level_and_log_file() {
        let mut settings = Settings::default();
        assert_eq!(settings.log_level_filter(), log::LevelFilter::Debug);
        settings.log_level = "warn".to_string();
        assert_eq!(settings.log_level_filter(), log::LevelFilter::Warn);
        settings.log_level = "chatty".to_string();
        assert_eq!(settings.log_level_filter(), log::LevelFilter::Debug);

        let config_dir = Path::new("/cfg");
        assert_eq!(
            settings.log_file_path(config_dir),
            config_dir.join(DEFAULT_LOG_FILENAME)
        );
        settings.log_file = Some(PathBuf::from("custom.log"));
        assert_eq!(settings.log_file_path(config_dir), config_dir.join("custom.log"));
    }
}
