// hooks.rs - Hook スクリプトと wrapper の配置・削除

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

pub const HOOK_SCRIPT_NAME: &str = "hook.sh";
pub const WRAPPER_SCRIPT_NAME: &str = "claude-with-hook";

/// Hook 成果物（~/.claude-monitor 配下）
#[derive(Debug, Clone)]
pub struct HookArtifacts {
    dir: PathBuf,
}

impl HookArtifacts {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    pub fn hook_path(&self) -> PathBuf {
        self.dir.join(HOOK_SCRIPT_NAME)
    }

    pub fn wrapper_path(&self) -> PathBuf {
        self.dir.join(WRAPPER_SCRIPT_NAME)
    }

    pub fn events_log_path(&self) -> PathBuf {
        self.dir.join("events.log")
    }

    /// hook.sh の有無が Hook 有効状態の真実
    pub async fn is_installed(&self) -> bool {
        tokio::fs::try_exists(self.hook_path()).await.unwrap_or(false)
    }

    /// hook.sh と wrapper を書き出す
    pub async fn install(&self) -> Result<String> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create hook directory: {}", self.dir.display()))?;

        let hook_path = self.hook_path();
        write_executable(&hook_path, &self.hook_script()).await?;

        let wrapper_path = self.wrapper_path();
        write_executable(&wrapper_path, &wrapper_script(&hook_path)).await?;

        Ok(format!(
            "Hook installed successfully.\nHook script: {}\nWrapper: {}",
            hook_path.display(),
            wrapper_path.display()
        ))
    }

    /// hook.sh と wrapper のみ削除（設定ファイルは残す）
    pub async fn uninstall(&self) -> Result<String> {
        let mut removed = 0;
        for path in [self.hook_path(), self.wrapper_path()] {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(e).with_context(|| format!("Failed to remove {}", path.display()))
                }
            }
        }

        if removed == 0 {
            Ok("Hook not installed".to_string())
        } else {
            Ok("Hook uninstalled successfully".to_string())
        }
    }

    fn hook_script(&self) -> String {
        let log_path = self.events_log_path();
        format!(
            r#"#!/bin/sh
# claude-monitor hook: appends one JSON line per event
LOG_FILE="{log}"

EVENT="${{1:-unknown}}"
PAYLOAD="${{2:-}}"
TS="$(date +%s)"

printf '{{"event":"%s","pid":%s,"cwd":"%s","timestamp":%s,"data":"%s"}}\n' \
    "$EVENT" "$PPID" "$(pwd)" "$TS" "$PAYLOAD" >> "$LOG_FILE" 2>/dev/null || true
"#,
            log = log_path.display()
        )
    }
}

fn wrapper_script(hook_path: &Path) -> String {
    format!(
        r#"#!/bin/sh
# claude-monitor wrapper: runs claude with the hook attached
export CLAUDE_CODE_HOOKS="{hook}"
exec claude "$@"
"#,
        hook = hook_path.display()
    )
}

async fn write_executable(path: &Path, content: &str) -> Result<()> {
    tokio::fs::write(path, content)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o755);
        tokio::fs::set_permissions(path, perms)
            .await
            .with_context(|| format!("Failed to set permissions on {}", path.display()))?;
    }

    Ok(())
}
