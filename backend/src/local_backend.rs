use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use claude_monitor_shared::{
    log_backend, AppConfig, Collaborator, CommandError, CommandResult, ConfigFile, Instance,
    InstallationStatus,
};

use crate::hooks::HookArtifacts;
use crate::installer;
use crate::process_scanner::{KillOutcome, ProcessScanner, ProcessTracker};

/// ローカルマシン上で動くコラボレーター実装
pub struct LocalBackend {
    config_path: PathBuf,
    hooks: HookArtifacts,
    scanner: Arc<Mutex<ProcessScanner>>,
    tracker: Mutex<ProcessTracker>,
}

impl LocalBackend {
    /// ~/.claude-monitor を使う標準構成
    pub fn new() -> Result<Self> {
        Ok(Self::with_data_dir(ConfigFile::data_dir()?))
    }

    /// データディレクトリを指定（テスト用）
    pub fn with_data_dir<P: AsRef<Path>>(data_dir: P) -> Self {
        let data_dir = data_dir.as_ref();
        Self {
            config_path: data_dir.join("config.toml"),
            hooks: HookArtifacts::new(data_dir),
            scanner: Arc::new(Mutex::new(ProcessScanner::new())),
            tracker: Mutex::new(ProcessTracker::new()),
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    async fn read_config_file(&self) -> CommandResult<ConfigFile> {
        let path = self.config_path.clone();
        tokio::task::spawn_blocking(move || ConfigFile::load_or_default(path))
            .await
            .map_err(|e| CommandError::failed(format!("config task failed: {e}")))?
            .map_err(CommandError::from)
    }

    /// sysinfo の更新はブロッキングなので専用スレッドで行う
    async fn with_scanner<T, F>(&self, f: F) -> CommandResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut ProcessScanner) -> T + Send + 'static,
    {
        let scanner = self.scanner.clone();
        tokio::task::spawn_blocking(move || {
            let mut scanner = scanner.lock().unwrap_or_else(|p| p.into_inner());
            f(&mut scanner)
        })
        .await
        .map_err(|e| CommandError::failed(format!("scan task failed: {e}")))
    }

    fn tracker(&self) -> std::sync::MutexGuard<'_, ProcessTracker> {
        self.tracker.lock().unwrap_or_else(|p| p.into_inner())
    }
}

#[async_trait]
impl Collaborator for LocalBackend {
    async fn get_instances(&self, active_only: bool) -> CommandResult<Vec<Instance>> {
        let processes = self.with_scanner(|scanner| scanner.scan()).await?;
        let mut tracker = self.tracker();
        let running = tracker.observe(processes, Utc::now());
        log_backend!(trace, "scan found {} running instance(s)", running.len());
        Ok(tracker.snapshot(active_only))
    }

    async fn kill_instance(&self, pid: u32) -> CommandResult<()> {
        match self.with_scanner(move |scanner| scanner.terminate(pid)).await? {
            KillOutcome::Sent => {
                self.tracker().forget(pid);
                log_backend!(info, "terminated pid {pid}");
                Ok(())
            }
            KillOutcome::NotFound => {
                Err(CommandError::NotFound(format!("Process not found: {pid}")))
            }
            KillOutcome::Refused => {
                Err(CommandError::failed(format!("Failed to kill process {pid}")))
            }
        }
    }

    async fn check_claude_installed(&self) -> CommandResult<InstallationStatus> {
        Ok(installer::check_installation().await)
    }

    async fn get_config(&self) -> CommandResult<AppConfig> {
        Ok(self.read_config_file().await?.app.sanitized())
    }

    async fn save_config(&self, config: &AppConfig) -> CommandResult<()> {
        // logging セクションは維持したまま app を丸ごと置き換える
        let mut file = self.read_config_file().await.unwrap_or_default();
        file.app = config.clone().sanitized();

        let path = self.config_path.clone();
        tokio::task::spawn_blocking(move || file.save_to_file(path))
            .await
            .map_err(|e| CommandError::failed(format!("config task failed: {e}")))?
            .map_err(CommandError::from)
    }

    async fn is_hook_installed(&self) -> CommandResult<bool> {
        Ok(self.hooks.is_installed().await)
    }

    async fn install_hook(&self) -> CommandResult<String> {
        Ok(self.hooks.install().await?)
    }

    async fn uninstall_hook(&self) -> CommandResult<String> {
        Ok(self.hooks.uninstall().await?)
    }

    async fn install_node(&self) -> CommandResult<String> {
        Ok(installer::install_node().await?)
    }

    async fn install_claude(&self) -> CommandResult<String> {
        Ok(installer::install_claude().await?)
    }
}
