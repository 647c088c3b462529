use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use claude_monitor_shared::{log_debug, log_info, logging::LogCategory, AppConfig, Collaborator};

use crate::config_store::ConfigStore;
use crate::dashboard::DashboardModel;
use crate::error::{ActionError, InstallTarget};
use crate::grouping::ExpandedGroups;
use crate::hook_toggle::HookToggle;
use crate::installer::InstallerTrigger;
use crate::registry::{InstanceRegistry, PollingHandle, RegistrySnapshot};

/// 画面の切り替え先
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Dashboard,
    Install,
    Hooks,
    History,
}

impl View {
    pub const ALL: [View; 4] = [View::Dashboard, View::Install, View::Hooks, View::History];

    pub fn label(&self) -> &'static str {
        match self {
            View::Dashboard => "Dashboard",
            View::Install => "Install",
            View::Hooks => "Hooks",
            View::History => "History",
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for View {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1" | "dashboard" => Ok(View::Dashboard),
            "2" | "install" => Ok(View::Install),
            "3" | "hooks" => Ok(View::Hooks),
            "4" | "history" => Ok(View::History),
            other => Err(format!("unknown view: {other}")),
        }
    }
}

/// 起動オプション
#[derive(Debug, Clone, Default)]
pub struct AppOptions {
    /// 設定のポーリング間隔より優先する
    pub interval_override: Option<Duration>,
}

/// 各コンポーネントをまとめ、画面遷移とポーリングの開始・停止を管理する
pub struct App {
    view: View,
    registry: InstanceRegistry,
    config: ConfigStore,
    hook: HookToggle,
    installer: InstallerTrigger,
    expanded: ExpandedGroups,
    pending_kill: Option<u32>,
    polling: Option<PollingHandle>,
    options: AppOptions,
    update_sender: broadcast::Sender<()>,
}

impl App {
    pub fn new(backend: Arc<dyn Collaborator>, options: AppOptions) -> Self {
        let (update_sender, _) = broadcast::channel(100);
        let config = ConfigStore::new(backend.clone(), update_sender.clone());
        Self {
            view: View::Dashboard,
            registry: InstanceRegistry::new(backend.clone(), update_sender.clone()),
            hook: HookToggle::new(backend.clone(), config.clone(), update_sender.clone()),
            installer: InstallerTrigger::new(backend, update_sender.clone()),
            config,
            expanded: ExpandedGroups::new(),
            pending_kill: None,
            polling: None,
            options,
            update_sender,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.update_sender.subscribe()
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn registry(&self) -> &InstanceRegistry {
        &self.registry
    }

    pub fn hook_toggle(&self) -> &HookToggle {
        &self.hook
    }

    pub fn installer(&self) -> &InstallerTrigger {
        &self.installer
    }

    pub fn expanded_groups(&self) -> &ExpandedGroups {
        &self.expanded
    }

    pub fn pending_kill(&self) -> Option<u32> {
        self.pending_kill
    }

    pub fn is_polling(&self) -> bool {
        self.registry.is_polling()
    }

    pub async fn config(&self) -> AppConfig {
        self.config.current().await
    }

    /// 設定読み込みと初回取得を並行に行い、監視ビューに入る
    pub async fn start(&mut self) {
        let (config, _) = tokio::join!(self.config.load(), self.registry.refresh());
        log_info!(
            LogCategory::System,
            "started (auto_start_monitor={}, interval={}s)",
            config.auto_start_monitor,
            config.polling_interval_secs
        );
        self.set_view(View::Dashboard).await;
    }

    pub async fn set_view(&mut self, view: View) {
        log_debug!(LogCategory::Display, "view: {} -> {}", self.view, view);
        self.view = view;
        self.sync_polling().await;
        let _ = self.update_sender.send(());
    }

    async fn sync_polling(&mut self) {
        if self.view != View::Dashboard {
            self.stop_polling();
            return;
        }

        let config = self.config.current().await;
        if !config.auto_start_monitor {
            self.stop_polling();
            return;
        }

        let interval = self
            .options
            .interval_override
            .unwrap_or_else(|| config.polling_interval());
        self.polling = Some(self.registry.start_polling(interval));
    }

    fn stop_polling(&mut self) {
        if let Some(handle) = self.polling.take() {
            handle.stop();
        }
    }

    /// 終了時に必ず呼ぶ
    pub fn shutdown(&mut self) {
        self.stop_polling();
        self.registry.stop_polling();
        self.pending_kill = None;
    }

    pub async fn snapshot(&self) -> RegistrySnapshot {
        self.registry.snapshot().await
    }

    pub async fn dashboard(&self) -> DashboardModel {
        DashboardModel::build(&self.registry.snapshot().await, &self.expanded)
    }

    /// 手動更新
    pub fn refresh(&self) -> impl Future<Output = ()> + Send + 'static {
        let registry = self.registry.clone();
        async move { registry.refresh().await }
    }

    pub fn toggle_group(&mut self, key: &str) -> bool {
        let expanded = self.expanded.toggle(key);
        let _ = self.update_sender.send(());
        expanded
    }

    /// 終了確認を待つ状態にする（既存の要求は置き換える）
    pub fn request_kill(&mut self, pid: u32) {
        self.pending_kill = Some(pid);
        let _ = self.update_sender.send(());
    }

    pub fn cancel_kill(&mut self) -> Option<u32> {
        let pid = self.pending_kill.take();
        let _ = self.update_sender.send(());
        pid
    }

    /// 確認済みの終了要求を実行する
    pub fn confirm_kill(
        &mut self,
    ) -> Result<impl Future<Output = Result<u32, ActionError>> + Send + 'static, ActionError> {
        let pid = self.pending_kill.take().ok_or(ActionError::NotConfirmed)?;
        let registry = self.registry.clone();
        Ok(async move {
            registry.kill_instance(pid).await?;
            Ok::<_, ActionError>(pid)
        })
    }

    pub fn toggle_hook(&self) -> impl Future<Output = Result<String, ActionError>> + Send + 'static {
        let hook = self.hook.clone();
        async move { hook.toggle().await }
    }

    /// Claude Code のインストール成功後は全体を取り直す
    pub fn install(
        &self,
        target: InstallTarget,
    ) -> impl Future<Output = Result<String, ActionError>> + Send + 'static {
        let installer = self.installer.clone();
        let registry = self.registry.clone();
        async move {
            let message = installer.install(target).await?;
            if target == InstallTarget::Claude {
                registry.refresh().await;
            }
            Ok::<_, ActionError>(message)
        }
    }
}

impl Drop for App {
    fn drop(&mut self) {
        self.shutdown();
    }
}
