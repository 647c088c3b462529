use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CommandError, CommandResult};
use crate::models::{AppConfig, Instance, InstallationStatus};

/// 外部コラボレーター（プロセス監視・インストーラー・設定ストア）の共通インターフェース
///
/// 監視コアはこのトレイト経由でのみ OS に触れる。すべて非同期で、
/// 呼び出し元のタスクだけを中断させる。
#[async_trait]
pub trait Collaborator: Send + Sync {
    /// インスタンス一覧（`active_only` なら実行中のみ）
    async fn get_instances(&self, active_only: bool) -> CommandResult<Vec<Instance>>;

    async fn kill_instance(&self, pid: u32) -> CommandResult<()>;

    async fn check_claude_installed(&self) -> CommandResult<InstallationStatus>;

    async fn get_config(&self) -> CommandResult<AppConfig>;

    /// 部分更新ではなく全体の上書き
    async fn save_config(&self, config: &AppConfig) -> CommandResult<()>;

    async fn is_hook_installed(&self) -> CommandResult<bool>;

    async fn install_hook(&self) -> CommandResult<String>;

    async fn uninstall_hook(&self) -> CommandResult<String>;

    async fn install_node(&self) -> CommandResult<String>;

    async fn install_claude(&self) -> CommandResult<String>;
}

/// コマンド要求（JSON表現: `{"cmd": "get_instances", "args": {"activeOnly": true}}`）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", content = "args", rename_all = "snake_case")]
pub enum Request {
    GetInstances {
        #[serde(rename = "activeOnly", default)]
        active_only: bool,
    },
    KillInstance {
        pid: u32,
    },
    CheckClaudeInstalled,
    GetConfig,
    SaveConfig {
        config: AppConfig,
    },
    IsHookInstalled,
    InstallHook,
    UninstallHook,
    InstallNode,
    InstallClaude,
}

impl Request {
    /// コマンド名と引数JSONから要求を組み立てる
    pub fn from_parts(command: &str, args: Option<Value>) -> CommandResult<Self> {
        let known = [
            "get_instances",
            "kill_instance",
            "check_claude_installed",
            "get_config",
            "save_config",
            "is_hook_installed",
            "install_hook",
            "uninstall_hook",
            "install_node",
            "install_claude",
        ];
        if !known.contains(&command) {
            return Err(CommandError::UnknownCommand(command.to_string()));
        }

        let mut envelope = serde_json::Map::new();
        envelope.insert("cmd".to_string(), Value::String(command.to_string()));
        if let Some(args) = args {
            envelope.insert("args".to_string(), args);
        } else if command == "get_instances" {
            envelope.insert("args".to_string(), Value::Object(serde_json::Map::new()));
        }

        Ok(serde_json::from_value(Value::Object(envelope))?)
    }

    pub fn command_name(&self) -> &'static str {
        match self {
            Request::GetInstances { .. } => "get_instances",
            Request::KillInstance { .. } => "kill_instance",
            Request::CheckClaudeInstalled => "check_claude_installed",
            Request::GetConfig => "get_config",
            Request::SaveConfig { .. } => "save_config",
            Request::IsHookInstalled => "is_hook_installed",
            Request::InstallHook => "install_hook",
            Request::UninstallHook => "uninstall_hook",
            Request::InstallNode => "install_node",
            Request::InstallClaude => "install_claude",
        }
    }
}

/// 要求をコラボレーターへ振り分け、応答をJSONで返す
pub async fn dispatch(backend: &dyn Collaborator, request: Request) -> CommandResult<Value> {
    let value = match request {
        Request::GetInstances { active_only } => {
            serde_json::to_value(backend.get_instances(active_only).await?)?
        }
        Request::KillInstance { pid } => {
            backend.kill_instance(pid).await?;
            Value::Null
        }
        Request::CheckClaudeInstalled => {
            serde_json::to_value(backend.check_claude_installed().await?)?
        }
        Request::GetConfig => serde_json::to_value(backend.get_config().await?)?,
        Request::SaveConfig { config } => {
            backend.save_config(&config).await?;
            Value::Null
        }
        Request::IsHookInstalled => Value::Bool(backend.is_hook_installed().await?),
        Request::InstallHook => Value::String(backend.install_hook().await?),
        Request::UninstallHook => Value::String(backend.uninstall_hook().await?),
        Request::InstallNode => Value::String(backend.install_node().await?),
        Request::InstallClaude => Value::String(backend.install_claude().await?),
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_format() {
        let json = r#"{"cmd":"get_instances","args":{"activeOnly":true}}"#;
        let request: Request = serde_json::from_str(json).unwrap();
        assert_eq!(request, Request::GetInstances { active_only: true });

        let json = r#"{"cmd":"kill_instance","args":{"pid":101}}"#;
        let request: Request = serde_json::from_str(json).unwrap();
        assert_eq!(request, Request::KillInstance { pid: 101 });

        let json = r#"{"cmd":"is_hook_installed"}"#;
        let request: Request = serde_json::from_str(json).unwrap();
        assert_eq!(request, Request::IsHookInstalled);
    }

    #[test]
    fn test_request_from_parts() {
        let request = Request::from_parts("get_instances", None).unwrap();
        assert_eq!(request, Request::GetInstances { active_only: false });

        let request =
            Request::from_parts("kill_instance", Some(serde_json::json!({ "pid": 42 }))).unwrap();
        assert_eq!(request.command_name(), "kill_instance");

        let err = Request::from_parts("get_history", None).unwrap_err();
        assert!(matches!(err, CommandError::UnknownCommand(name) if name == "get_history"));
    }

    #[test]
    fn test_save_config_requires_config() {
        assert!(Request::from_parts("save_config", None).is_err());

        let request = Request::from_parts(
            "save_config",
            Some(serde_json::json!({ "config": { "hook_enabled": true } })),
        )
        .unwrap();
        match request {
            Request::SaveConfig { config } => {
                assert!(config.hook_enabled);
                assert_eq!(config.polling_interval_secs, 5);
            }
            other => panic!("unexpected request: {other:?}"),
        }
    }

    struct StubBackend;

    #[async_trait]
    impl Collaborator for StubBackend {
        async fn get_instances(&self, active_only: bool) -> CommandResult<Vec<Instance>> {
            let now = chrono::Utc::now();
            let status = if active_only { "running" } else { "exited" };
            Ok(vec![Instance {
                id: "stub".to_string(),
                pid: 1,
                cwd: "/tmp".to_string(),
                cmdline: "claude".to_string(),
                status: status.to_string(),
                start_time: now,
                last_seen: now,
                cpu_percent: 0.0,
                memory_mb: 0.0,
            }])
        }

        async fn kill_instance(&self, pid: u32) -> CommandResult<()> {
            Err(CommandError::NotFound(format!("pid {pid}")))
        }

        async fn check_claude_installed(&self) -> CommandResult<InstallationStatus> {
            Ok(InstallationStatus::not_installed())
        }

        async fn get_config(&self) -> CommandResult<AppConfig> {
            Ok(AppConfig::default())
        }

        async fn save_config(&self, _config: &AppConfig) -> CommandResult<()> {
            Ok(())
        }

        async fn is_hook_installed(&self) -> CommandResult<bool> {
            Ok(true)
        }

        async fn install_hook(&self) -> CommandResult<String> {
            Ok("installed".to_string())
        }

        async fn uninstall_hook(&self) -> CommandResult<String> {
            Ok("removed".to_string())
        }

        async fn install_node(&self) -> CommandResult<String> {
            Err(CommandError::failed("no network"))
        }

        async fn install_claude(&self) -> CommandResult<String> {
            Ok("ok".to_string())
        }
    }

    #[tokio::test]
    async fn test_dispatch_routes_to_backend() {
        let backend = StubBackend;

        let value = dispatch(&backend, Request::GetInstances { active_only: true })
            .await
            .unwrap();
        assert_eq!(value[0]["status"], "running");
        assert_eq!(value[0]["pid"], 1);

        let value = dispatch(&backend, Request::IsHookInstalled).await.unwrap();
        assert_eq!(value, Value::Bool(true));

        let value = dispatch(&backend, Request::GetConfig).await.unwrap();
        assert_eq!(value["polling_interval_secs"], 5);

        let err = dispatch(&backend, Request::KillInstance { pid: 9 })
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::NotFound(_)));

        let err = dispatch(&backend, Request::InstallNode).await.unwrap_err();
        assert_eq!(err.to_string(), "no network");
    }
}
