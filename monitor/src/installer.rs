use std::sync::Arc;
use tokio::sync::broadcast;

use claude_monitor_shared::{log_info, log_warn, logging::LogCategory, Collaborator};

use crate::busy::BusyFlag;
use crate::error::{ActionError, InstallTarget};

/// Node.js / Claude Code のインストーラー起動（対象ごとに独立した busy）
#[derive(Clone)]
pub struct InstallerTrigger {
    backend: Arc<dyn Collaborator>,
    node: BusyFlag,
    claude: BusyFlag,
}

impl InstallerTrigger {
    pub fn new(backend: Arc<dyn Collaborator>, update_sender: broadcast::Sender<()>) -> Self {
        Self {
            backend,
            node: BusyFlag::new(update_sender.clone()),
            claude: BusyFlag::new(update_sender),
        }
    }

    pub fn installing_node(&self) -> bool {
        self.node.is_busy()
    }

    pub fn installing_claude(&self) -> bool {
        self.claude.is_busy()
    }

    pub fn installing(&self, target: InstallTarget) -> bool {
        match target {
            InstallTarget::Node => self.installing_node(),
            InstallTarget::Claude => self.installing_claude(),
        }
    }

    pub async fn install(&self, target: InstallTarget) -> Result<String, ActionError> {
        let flag = match target {
            InstallTarget::Node => &self.node,
            InstallTarget::Claude => &self.claude,
        };
        let Some(_guard) = flag.try_acquire() else {
            return Err(ActionError::Busy(match target {
                InstallTarget::Node => "Node.js installation",
                InstallTarget::Claude => "Claude Code installation",
            }));
        };

        log_info!(LogCategory::Installer, "installing {target}");
        let result = match target {
            InstallTarget::Node => self.backend.install_node().await,
            InstallTarget::Claude => self.backend.install_claude().await,
        };

        result.map_err(|source| {
            log_warn!(LogCategory::Installer, "{target} installation failed: {source}");
            ActionError::Installer { target, source }
        })
    }

    pub async fn install_node(&self) -> Result<String, ActionError> {
        self.install(InstallTarget::Node).await
    }

    pub async fn install_claude(&self) -> Result<String, ActionError> {
        self.install(InstallTarget::Claude).await
    }
}
