use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::models::AppConfig;

/// 監視ツールのデータディレクトリ名（ホーム直下）
pub const DATA_DIR_NAME: &str = ".claude-monitor";

/// 永続化される設定ファイル
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConfigFile {
    /// アプリケーション設定
    #[serde(default)]
    pub app: AppConfig,

    /// ログ設定
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// ログ関連の設定
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoggingSettings {
    /// 詳細ログを有効にするか
    #[serde(default)]
    pub verbose: bool,
}

impl ConfigFile {
    /// 設定ファイルから読み込み
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: ConfigFile = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;

        Ok(config)
    }

    /// ファイルが無ければデフォルト値
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// 設定ファイルに保存
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        // ディレクトリが存在しない場合は作成
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    /// データディレクトリ（~/.claude-monitor）
    pub fn data_dir() -> Result<PathBuf> {
        let home_dir = home::home_dir().context("Failed to get home directory")?;
        Ok(home_dir.join(DATA_DIR_NAME))
    }

    /// デフォルトの設定ファイルパスを取得
    pub fn default_config_path() -> Result<PathBuf> {
        Ok(Self::data_dir()?.join("config.toml"))
    }

    /// 環境変数で設定を上書き
    pub fn apply_env_overrides(&mut self) {
        if let Ok(secs) = std::env::var("CLAUDE_MONITOR_POLL_SECS") {
            if let Ok(secs) = secs.trim().parse::<u64>() {
                self.app.polling_interval_secs = secs;
            }
        }

        if let Ok(verbose) = std::env::var("CLAUDE_MONITOR_VERBOSE") {
            self.logging.verbose = verbose == "1" || verbose.to_lowercase() == "true";
        }

        self.app = self.app.clone().sanitized();
    }
}
