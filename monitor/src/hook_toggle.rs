use std::sync::Arc;
use tokio::sync::broadcast;

use claude_monitor_shared::{log_hook, AppConfig, Collaborator};

use crate::busy::BusyFlag;
use crate::config_store::ConfigStore;
use crate::error::{ActionError, HookAction};

/// Hook の有効/無効を切り替える
///
/// 方向は config.hook_enabled から決める。外部操作と設定保存の間は busy を保持する。
#[derive(Clone)]
pub struct HookToggle {
    backend: Arc<dyn Collaborator>,
    store: ConfigStore,
    busy: BusyFlag,
}

impl HookToggle {
    pub fn new(
        backend: Arc<dyn Collaborator>,
        store: ConfigStore,
        update_sender: broadcast::Sender<()>,
    ) -> Self {
        Self {
            backend,
            store,
            busy: BusyFlag::new(update_sender),
        }
    }

    pub fn installing(&self) -> bool {
        self.busy.is_busy()
    }

    pub async fn toggle(&self) -> Result<String, ActionError> {
        let action = if self.store.current().await.hook_enabled {
            HookAction::Uninstall
        } else {
            HookAction::Install
        };
        self.run(action).await
    }

    pub async fn install(&self) -> Result<String, ActionError> {
        self.run(HookAction::Install).await
    }

    pub async fn uninstall(&self) -> Result<String, ActionError> {
        self.run(HookAction::Uninstall).await
    }

    async fn run(&self, action: HookAction) -> Result<String, ActionError> {
        let Some(_guard) = self.busy.try_acquire() else {
            log_hook!(debug, "{action} ignored: hook operation in flight");
            return Err(ActionError::Busy("hook operation"));
        };

        let result = match action {
            HookAction::Install => self.backend.install_hook().await,
            HookAction::Uninstall => self.backend.uninstall_hook().await,
        };
        let message = result.map_err(|source| {
            log_hook!(warn, "hook {action} failed: {source}");
            ActionError::Hook { action, source }
        })?;

        // 最新の設定に対して hook_enabled だけを書き換える
        let config = AppConfig {
            hook_enabled: action == HookAction::Install,
            ..self.store.current().await
        };
        self.store.save(config).await?;

        log_hook!(info, "hook {action}: {message}");
        Ok(message)
    }
}
