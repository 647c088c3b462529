use std::fmt;
use thiserror::Error;

use claude_monitor_shared::CommandError;

/// Hook 操作の方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookAction {
    Install,
    Uninstall,
}

impl fmt::Display for HookAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookAction::Install => write!(f, "install"),
            HookAction::Uninstall => write!(f, "uninstall"),
        }
    }
}

/// インストーラーの対象
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallTarget {
    Node,
    Claude,
}

impl fmt::Display for InstallTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstallTarget::Node => write!(f, "Node.js"),
            InstallTarget::Claude => write!(f, "Claude Code"),
        }
    }
}

/// ユーザー操作の失敗（呼び出し元へ返して通知させる）
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("{0} is already in progress")]
    Busy(&'static str),

    #[error("failed to terminate PID {pid}: {source}")]
    Kill { pid: u32, source: CommandError },

    #[error("failed to {action} hook: {source}")]
    Hook {
        action: HookAction,
        source: CommandError,
    },

    #[error("failed to install {target}: {source}")]
    Installer {
        target: InstallTarget,
        source: CommandError,
    },

    #[error("failed to save config: {0}")]
    ConfigSave(#[source] CommandError),

    #[error("no termination is awaiting confirmation")]
    NotConfirmed,
}
