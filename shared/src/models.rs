use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 実行中インスタンスの状態タグ
pub const STATUS_RUNNING: &str = "running";
/// 終了済みインスタンスの状態タグ
pub const STATUS_EXITED: &str = "exited";

/// 監視対象 CLI ツールの実行インスタンス
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    pub id: String,
    pub pid: u32,
    #[serde(default)]
    pub cwd: String,
    #[serde(default)]
    pub cmdline: String,
    pub status: String,
    pub start_time: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub cpu_percent: f64,
    pub memory_mb: f64,
}

impl Instance {
    pub fn is_running(&self) -> bool {
        self.status == STATUS_RUNNING
    }
}

/// インストール状態（毎回丸ごと置き換えるスナップショット）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct InstallationStatus {
    pub installed: bool,
    pub version: Option<String>,
    pub path: Option<String>,
}

impl InstallationStatus {
    pub fn not_installed() -> Self {
        Self::default()
    }
}

/// アプリケーション設定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub hook_enabled: bool,
    #[serde(default = "default_auto_start_monitor")]
    pub auto_start_monitor: bool,
    #[serde(default = "default_polling_interval_secs")]
    pub polling_interval_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            hook_enabled: false,
            auto_start_monitor: default_auto_start_monitor(),
            polling_interval_secs: default_polling_interval_secs(),
        }
    }
}

fn default_auto_start_monitor() -> bool {
    true
}

fn default_polling_interval_secs() -> u64 {
    5
}

impl AppConfig {
    /// ポーリング間隔を1秒以上に丸める
    pub fn sanitized(mut self) -> Self {
        self.polling_interval_secs = self.polling_interval_secs.max(1);
        self
    }

    pub fn polling_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.polling_interval_secs.max(1))
    }
}
