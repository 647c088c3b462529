use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

use claude_monitor_shared::{log_config, AppConfig, Collaborator};

use crate::error::ActionError;

#[derive(Debug)]
struct ConfigState {
    config: AppConfig,
    loaded: bool,
}

/// コラボレーターが永続化する AppConfig のメモリ上のコピー
#[derive(Clone)]
pub struct ConfigStore {
    backend: Arc<dyn Collaborator>,
    state: Arc<RwLock<ConfigState>>,
    update_sender: broadcast::Sender<()>,
}

impl ConfigStore {
    pub fn new(backend: Arc<dyn Collaborator>, update_sender: broadcast::Sender<()>) -> Self {
        Self {
            backend,
            state: Arc::new(RwLock::new(ConfigState {
                config: AppConfig::default(),
                loaded: false,
            })),
            update_sender,
        }
    }

    pub async fn current(&self) -> AppConfig {
        self.state.read().await.config.clone()
    }

    pub async fn is_loaded(&self) -> bool {
        self.state.read().await.loaded
    }

    /// 設定を読み込み、実在しない hook の有効フラグを落とす
    ///
    /// 逆方向（hook はあるが無効のまま）は補正しない。
    pub async fn load(&self) -> AppConfig {
        let (loaded, hook_present) =
            tokio::join!(self.backend.get_config(), self.backend.is_hook_installed());

        let hook_present = hook_present.unwrap_or_else(|e| {
            log_config!(warn, "hook presence check failed: {e}");
            false
        });

        let mut state = self.state.write().await;
        match loaded {
            Ok(config) => {
                let mut config = config.sanitized();
                if config.hook_enabled && !hook_present {
                    log_config!(info, "hook_enabled is set but the hook is missing; disabling");
                }
                config.hook_enabled = config.hook_enabled && hook_present;
                state.config = config;
            }
            Err(e) => {
                log_config!(warn, "config load failed, keeping current values: {e}");
            }
        }
        state.loaded = true;
        let config = state.config.clone();
        drop(state);

        let _ = self.update_sender.send(());
        config
    }

    /// 丸ごと保存し、成功した場合のみメモリ上の値を更新する
    pub async fn save(&self, config: AppConfig) -> Result<(), ActionError> {
        let config = config.sanitized();
        self.backend
            .save_config(&config)
            .await
            .map_err(ActionError::ConfigSave)?;

        log_config!(debug, "config saved: {:?}", config);
        self.state.write().await.config = config;
        let _ = self.update_sender.send(());
        Ok(())
    }
}
