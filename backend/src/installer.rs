// installer.rs - Claude Code / Node.js のインストール状態確認とインストール

use anyhow::{anyhow, Context, Result};
use tokio::process::Command;

use claude_monitor_shared::{log_backend, InstallationStatus};

pub const CLAUDE_PACKAGE: &str = "@anthropic-ai/claude-code";

/// インストール状態を確認（見つからなければ installed=false）
pub async fn check_installation() -> InstallationStatus {
    let checks: [(&str, &[&str]); 2] = [
        ("claude", &["--version"]),
        ("npx", &[CLAUDE_PACKAGE, "--version"]),
    ];

    for (cmd, args) in checks {
        if let Some(version) = run_for_stdout(cmd, args).await {
            let path = which::which(cmd)
                .ok()
                .map(|p| p.to_string_lossy().to_string());
            log_backend!(debug, "found {cmd} ({version})");
            return InstallationStatus {
                installed: true,
                version: Some(version),
                path,
            };
        }
    }

    // npm のグローバルパッケージとして入っている場合
    if let Ok(output) = Command::new("npm")
        .args(["list", "-g", CLAUDE_PACKAGE])
        .output()
        .await
    {
        if String::from_utf8_lossy(&output.stdout).contains("claude-code") {
            return InstallationStatus {
                installed: true,
                version: Some("global".to_string()),
                path: None,
            };
        }
    }

    InstallationStatus::not_installed()
}

async fn run_for_stdout(cmd: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(cmd).args(args).output().await.ok()?;
    if !output.status.success() {
        return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// npm でグローバルインストール
pub async fn install_claude() -> Result<String> {
    let output = Command::new("npm")
        .args(["install", "-g", CLAUDE_PACKAGE])
        .output()
        .await
        .context("Failed to run npm install")?;

    if output.status.success() {
        Ok("Claude Code installed successfully".to_string())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(anyhow!("Installation failed: {}", stderr.trim()))
    }
}

/// Node.js をインストール（未導入の場合のみ）
pub async fn install_node() -> Result<String> {
    #[cfg(windows)]
    let output = Command::new("powershell")
        .args(["-NoProfile", "-Command", NODE_INSTALL_POWERSHELL])
        .output()
        .await
        .context("Failed to run PowerShell")?;

    #[cfg(not(windows))]
    let output = Command::new("bash")
        .args(["-c", NODE_INSTALL_SH])
        .output()
        .await
        .context("Failed to run bash")?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    } else {
        Err(anyhow!(
            "{}",
            String::from_utf8_lossy(&output.stderr).trim().to_string()
        ))
    }
}

#[cfg(not(windows))]
const NODE_INSTALL_SH: &str = r#"
if command -v node >/dev/null 2>&1; then
    echo "Node.js already installed: $(node --version)"
    exit 0
fi
if [ "$(uname)" = "Darwin" ]; then
    if command -v brew >/dev/null 2>&1; then
        brew install node
    else
        echo "Homebrew is required: https://brew.sh" >&2
        exit 1
    fi
else
    curl -fsSL https://deb.nodesource.com/setup_20.x | sudo -E bash - && sudo apt-get install -y nodejs
fi
echo "Node.js installed successfully"
"#;

#[cfg(windows)]
const NODE_INSTALL_POWERSHELL: &str = r#"
if (Get-Command node -ErrorAction SilentlyContinue) {
    Write-Host "Node.js already installed"
    exit 0
}
$msi = "$env:TEMP\nodejs.msi"
Invoke-WebRequest -Uri "https://nodejs.org/dist/v20.10.0/node-v20.10.0-x64.msi" -OutFile $msi
Start-Process -Wait -FilePath "msiexec.exe" -ArgumentList "/i", $msi, "/quiet", "/norestart"
Remove-Item $msi
Write-Host "Node.js installed successfully"
"#;
