use anyhow::Result;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs::try_exists;

use crate::document::DEFAULT_FONT_FAMILY;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub editor: EditorConfig,
    pub autosave: AutosaveConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub stats: StatsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditorConfig {
    pub history_limit: usize,
    pub default_font: String,
    pub font_choices: Vec<FontChoice>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FontChoice {
    pub name: String,
    pub family: String,
}

impl FontChoice {
    fn new(name: &str, family: &str) -> Self {
        Self {
            name: name.to_string(),
            family: family.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutosaveConfig {
    pub enabled: bool,
    pub save_delay_ms: u64,
    pub font_save_delay_ms: u64,
    pub metrics_delay_ms: u64,
    pub selection_delay_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Overrides `QUILLPAD_DATA_DIR` and the platform data directory.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatsConfig {
    #[serde(default)]
    pub expanded: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            editor: EditorConfig {
                history_limit: 100,
                default_font: DEFAULT_FONT_FAMILY.to_string(),
                font_choices: vec![
                    FontChoice::new("Inter", DEFAULT_FONT_FAMILY),
                    FontChoice::new("Serif", "Georgia, serif"),
                    FontChoice::new("Mono", "Menlo, Monaco, Consolas, monospace"),
                    FontChoice::new("Nunito", "Nunito, sans-serif"),
                    FontChoice::new("Merriweather", "Merriweather, serif"),
                ],
            },
            autosave: AutosaveConfig::default(),
            storage: StorageConfig::default(),
            stats: StatsConfig::default(),
        }
    }
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            save_delay_ms: 5000,
            font_save_delay_ms: 2000,
            metrics_delay_ms: 300,
            selection_delay_ms: 200,
        }
    }
}

impl AutosaveConfig {
    pub fn save_delay(&self) -> Duration {
        Duration::from_millis(self.save_delay_ms)
    }

    pub fn font_save_delay(&self) -> Duration {
        Duration::from_millis(self.font_save_delay_ms)
    }

    pub fn metrics_delay(&self) -> Duration {
        Duration::from_millis(self.metrics_delay_ms)
    }

    pub fn selection_delay(&self) -> Duration {
        Duration::from_millis(self.selection_delay_ms)
    }
}

impl EditorConfig {
    /// Resolve a catalog name ("Serif") or pass a raw family stack through.
    pub fn resolve_font(&self, name: &str) -> String {
        let name = name.trim();
        self.font_choices
            .iter()
            .find(|choice| choice.name.eq_ignore_ascii_case(name))
            .map(|choice| choice.family.clone())
            .unwrap_or_else(|| name.to_string())
    }
}

impl Config {
    pub async fn load() -> Result<Self> {
        match Self::config_path() {
            Some(config_path) => Self::load_from(&config_path).await,
            None => Ok(Self::default()),
        }
    }

    pub async fn load_from(config_path: &Path) -> Result<Self> {
        if try_exists(config_path).await? {
            match tokio::fs::read_to_string(config_path).await {
                Ok(content) => {
                    if content.trim().is_empty() {
                        log::warn!("Config file is empty, creating new one");
                        let default_config = Self::default();
                        let _ = default_config.save_to(config_path).await;
                        return Ok(default_config);
                    }

                    match serde_json::from_str::<Self>(&content) {
                        Ok(mut config) => {
                            config.validate()?;
                            log::info!("Successfully loaded config from: {}", config_path.display());
                            return Ok(config);
                        }
                        Err(json_err) => {
                            log::error!("Failed to parse config file: {}", json_err);

                            let backup_path = config_path.with_extension("bak");
                            if let Err(e) = tokio::fs::copy(config_path, &backup_path).await {
                                log::warn!("Failed to backup broken config: {}", e);
                            } else {
                                log::info!("Backed up broken config to: {}", backup_path.display());
                            }

                            let default_config = Self::default();
                            let _ = default_config.save_to(config_path).await;
                            return Ok(default_config);
                        }
                    }
                }
                Err(io_err) => {
                    log::error!("Failed to read config file: {}", io_err);
                }
            }
        } else {
            log::info!("Config file does not exist, creating default");
        }

        let default_config = Self::default();
        let _ = default_config.save_to(config_path).await;
        Ok(default_config)
    }

    pub async fn save(&self) -> Result<()> {
        match Self::config_path() {
            Some(config_path) => self.save_to(&config_path).await,
            None => Ok(()),
        }
    }

    pub async fn save_to(&self, config_path: &Path) -> Result<()> {
        let mut config_to_save = self.clone();
        config_to_save.validate()?;

        if let Some(parent) = config_path.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                return Err(anyhow::anyhow!(
                    "設定ディレクトリの作成に失敗しました: {} - {}",
                    parent.display(),
                    e
                ));
            }
        }

        let content = serde_json::to_string_pretty(&config_to_save)
            .map_err(|e| anyhow::anyhow!("設定のシリアライズに失敗しました: {}", e))?;
        tokio::fs::write(config_path, content).await.map_err(|e| {
            anyhow::anyhow!(
                "設定ファイルの書き込みに失敗しました: {} - {}",
                config_path.display(),
                e
            )
        })?;
        log::info!("Successfully saved config to: {}", config_path.display());
        Ok(())
    }

    /// Validate configuration values and fix invalid ones
    pub fn validate(&mut self) -> Result<()> {
        let mut has_issues = false;
        let defaults = AutosaveConfig::default();

        if self.editor.history_limit == 0 || self.editor.history_limit > 10_000 {
            log::warn!("Invalid history limit: {}, using default", self.editor.history_limit);
            self.editor.history_limit = 100;
            has_issues = true;
        }

        if self.editor.default_font.trim().is_empty() {
            log::warn!("Empty default font, using default");
            self.editor.default_font = DEFAULT_FONT_FAMILY.to_string();
            has_issues = true;
        }

        let delays = [
            (&mut self.autosave.save_delay_ms, defaults.save_delay_ms, "save"),
            (&mut self.autosave.font_save_delay_ms, defaults.font_save_delay_ms, "font save"),
            (&mut self.autosave.metrics_delay_ms, defaults.metrics_delay_ms, "metrics"),
            (&mut self.autosave.selection_delay_ms, defaults.selection_delay_ms, "selection"),
        ];
        for (value, default, name) in delays {
            if *value == 0 || *value > 600_000 {
                log::warn!("Invalid {} delay: {}ms, using default", name, value);
                *value = default;
                has_issues = true;
            }
        }

        if has_issues {
            log::info!("Configuration validation completed with corrections");
        }

        Ok(())
    }

    pub fn config_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("QUILLPAD_CONFIG_PATH") {
            return Some(PathBuf::from(path));
        }

        if let Ok(dir) = std::env::var("QUILLPAD_CONFIG_DIR") {
            return Some(PathBuf::from(dir).join("config.json"));
        }

        ProjectDirs::from("com", "quillpad", "quillpad")
            .map(|dirs| dirs.config_dir().join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, OnceLock};
    use tempfile::TempDir;

    fn config_test_lock() -> &'static Mutex<()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        LOCK.get_or_init(|| Mutex::new(()))
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.editor.history_limit, 100);
        assert_eq!(config.editor.default_font, DEFAULT_FONT_FAMILY);
        assert_eq!(config.editor.font_choices.len(), 5);
        assert!(config.autosave.enabled);
        assert_eq!(config.autosave.save_delay(), Duration::from_millis(5000));
        assert_eq!(config.autosave.font_save_delay(), Duration::from_millis(2000));
        assert_eq!(config.autosave.metrics_delay(), Duration::from_millis(300));
        assert_eq!(config.autosave.selection_delay(), Duration::from_millis(200));
        assert!(config.storage.data_dir.is_none());
        assert!(!config.stats.expanded);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();

        let json = serde_json::to_string_pretty(&config).unwrap();
        assert!(json.contains("\"editor\""));
        assert!(json.contains("\"autosave\""));
        assert!(json.contains("\"save_delay_ms\": 5000"));

        let config_from_json: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(config.editor.history_limit, config_from_json.editor.history_limit);
        assert_eq!(config.editor.font_choices, config_from_json.editor.font_choices);
    }

    #[test]
    fn test_validate_fixes_invalid_values() {
        let mut config = Config::default();
        config.editor.history_limit = 0;
        config.editor.default_font = "  ".to_string();
        config.autosave.save_delay_ms = 0;
        config.autosave.selection_delay_ms = 10_000_000;

        config.validate().unwrap();

        assert_eq!(config.editor.history_limit, 100);
        assert_eq!(config.editor.default_font, DEFAULT_FONT_FAMILY);
        assert_eq!(config.autosave.save_delay_ms, 5000);
        assert_eq!(config.autosave.selection_delay_ms, 200);
    }

    #[test]
    fn test_resolve_font() {
        let editor = Config::default().editor;
        assert_eq!(editor.resolve_font("serif"), "Georgia, serif");
        assert_eq!(editor.resolve_font(" Courier New "), "Courier New");
    }

    #[tokio::test]
    async fn test_load_creates_default_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.json");

        let config = Config::load_from(&path).await.unwrap();
        assert_eq!(config.editor.history_limit, 100);
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_load_backs_up_broken_config() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        tokio::fs::write(&path, "{ not json").await.unwrap();

        let config = Config::load_from(&path).await.unwrap();
        assert!(config.autosave.enabled);
        assert!(temp_dir.path().join("config.bak").exists());

        let rewritten = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(serde_json::from_str::<Config>(&rewritten).is_ok());
    }

    #[tokio::test]
    async fn test_load_validates_stored_values() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        let mut stored = Config::default();
        stored.autosave.metrics_delay_ms = 0;
        stored.stats.expanded = true;
        tokio::fs::write(&path, serde_json::to_string(&stored).unwrap())
            .await
            .unwrap();

        let config = Config::load_from(&path).await.unwrap();
        assert_eq!(config.autosave.metrics_delay_ms, 300);
        assert!(config.stats.expanded);
    }

    #[test]
    fn test_config_path_env_override() {
        let _guard = config_test_lock().lock().unwrap();
        let previous_path = std::env::var("QUILLPAD_CONFIG_PATH").ok();
        let previous_dir = std::env::var("QUILLPAD_CONFIG_DIR").ok();

        std::env::remove_var("QUILLPAD_CONFIG_PATH");
        std::env::set_var("QUILLPAD_CONFIG_DIR", "/tmp/quillpad-test");
        assert_eq!(
            Config::config_path(),
            Some(PathBuf::from("/tmp/quillpad-test/config.json"))
        );

        std::env::set_var("QUILLPAD_CONFIG_PATH", "/tmp/custom.json");
        assert_eq!(Config::config_path(), Some(PathBuf::from("/tmp/custom.json")));

        match previous_path {
            Some(value) => std::env::set_var("QUILLPAD_CONFIG_PATH", value),
            None => std::env::remove_var("QUILLPAD_CONFIG_PATH"),
        }
        match previous_dir {
            Some(value) => std::env::set_var("QUILLPAD_CONFIG_DIR", value),
            None => std::env::remove_var("QUILLPAD_CONFIG_DIR"),
        }
    }
}
