use claude_monitor_shared::{log_gate, Collaborator, InstallationStatus};

/// CLI ツールのインストール状態（最後のスナップショットのみ保持）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallationGate {
    status: Option<InstallationStatus>,
}

impl InstallationGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// スナップショットを丸ごと置き換える
    pub fn apply(&mut self, status: InstallationStatus) {
        self.status = Some(status);
    }

    /// まだ一度も確認できていなければ None
    pub fn status(&self) -> Option<&InstallationStatus> {
        self.status.as_ref()
    }

    pub fn is_checked(&self) -> bool {
        self.status.is_some()
    }

    /// 未確認も含め、installed=false なら監視ビューは使えない
    pub fn monitoring_available(&self) -> bool {
        self.status.as_ref().is_some_and(|s| s.installed)
    }
}

/// インストール状態を問い合わせる。失敗はログのみで None
pub async fn fetch_installation(backend: &dyn Collaborator) -> Option<InstallationStatus> {
    match backend.check_claude_installed().await {
        Ok(status) => {
            log_gate!(
                debug,
                "installed={} version={}",
                status.installed,
                status.version.as_deref().unwrap_or("-")
            );
            Some(status)
        }
        Err(e) => {
            log_gate!(warn, "installation check failed: {e}");
            None
        }
    }
}
