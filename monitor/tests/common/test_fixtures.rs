// テストフィクスチャとダミーデータ生成
// Note: 統合テストは個別にコンパイルされるため、使わない関数の dead_code 警告を抑制。

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, Notify};

use claude_monitor_shared::{
    AppConfig, Collaborator, CommandError, CommandResult, Instance, InstallationStatus,
    STATUS_RUNNING,
};

/// テスト用インスタンス
pub fn create_test_instance(pid: u32, cwd: &str, cpu: f64, mem: f64) -> Instance {
    let now = Utc::now();
    Instance {
        id: generate_test_id(),
        pid,
        cwd: cwd.to_string(),
        cmdline: format!("node /usr/lib/node_modules/@anthropic-ai/claude-code/cli.js #{pid}"),
        status: STATUS_RUNNING.to_string(),
        start_time: now,
        last_seen: now,
        cpu_percent: cpu,
        memory_mb: mem,
    }
}

/// 仕様例の3インスタンス（/a に2つ、/b に1つ）
pub fn scenario_instances() -> Vec<Instance> {
    vec![
        create_test_instance(100, "/a", 10.0, 100.0),
        create_test_instance(101, "/a", 20.0, 200.0),
        create_test_instance(102, "/b", 30.0, 300.0),
    ]
}

pub fn installed_status() -> InstallationStatus {
    InstallationStatus {
        installed: true,
        version: Some("1.0.17 (Claude Code)".to_string()),
        path: Some("/usr/local/bin/claude".to_string()),
    }
}

/// 一意なテストIDを生成
pub fn generate_test_id() -> String {
    format!("test_{}", uuid::Uuid::new_v4())
}

pub fn update_channel() -> broadcast::Sender<()> {
    broadcast::channel(256).0
}

/// 応答を差し替えられるコラボレーター
#[derive(Default)]
pub struct FakeBackend {
    pub instances: Mutex<Vec<Instance>>,
    /// None なら check_claude_installed は失敗する
    pub installation: Mutex<Option<InstallationStatus>>,
    pub config: Mutex<AppConfig>,
    pub hook_present: AtomicBool,

    pub list_fails: AtomicBool,
    pub kill_fails: AtomicBool,
    pub hook_fails: AtomicBool,
    pub save_fails: AtomicBool,
    pub installer_fails: AtomicBool,

    /// 設定されていれば通知されるまで応答を止める
    pub list_gate: Mutex<Option<Arc<Notify>>>,
    pub hook_gate: Mutex<Option<Arc<Notify>>>,
    pub installer_gate: Mutex<Option<Arc<Notify>>>,

    pub list_calls: AtomicUsize,
    pub install_checks: AtomicUsize,
    pub kill_calls: AtomicUsize,
    pub hook_calls: AtomicUsize,
    pub save_calls: AtomicUsize,
    pub node_calls: AtomicUsize,
    pub claude_calls: AtomicUsize,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// インストール済みで instances を返す状態
    pub fn with_instances(instances: Vec<Instance>) -> Arc<Self> {
        let backend = Self::default();
        *backend.instances.lock().unwrap() = instances;
        *backend.installation.lock().unwrap() = Some(installed_status());
        Arc::new(backend)
    }

    pub fn set_instances(&self, instances: Vec<Instance>) {
        *self.instances.lock().unwrap() = instances;
    }

    pub fn set_installation(&self, status: Option<InstallationStatus>) {
        *self.installation.lock().unwrap() = status;
    }

    pub fn set_config(&self, config: AppConfig) {
        *self.config.lock().unwrap() = config;
    }

    pub fn saved_config(&self) -> AppConfig {
        self.config.lock().unwrap().clone()
    }

    pub fn calls(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    /// ゲートを設置して返す
    pub fn block(gate: &Mutex<Option<Arc<Notify>>>) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *gate.lock().unwrap() = Some(notify.clone());
        notify
    }

    async fn pass(gate: &Mutex<Option<Arc<Notify>>>) {
        let notify = gate.lock().unwrap().clone();
        if let Some(notify) = notify {
            notify.notified().await;
        }
    }

    fn fail_if(flag: &AtomicBool, message: &str) -> CommandResult<()> {
        if flag.load(Ordering::SeqCst) {
            Err(CommandError::failed(message))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Collaborator for FakeBackend {
    async fn get_instances(&self, active_only: bool) -> CommandResult<Vec<Instance>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Self::pass(&self.list_gate).await;
        Self::fail_if(&self.list_fails, "process scan failed")?;

        let instances = self.instances.lock().unwrap().clone();
        Ok(instances
            .into_iter()
            .filter(|i| !active_only || i.is_running())
            .collect())
    }

    async fn kill_instance(&self, pid: u32) -> CommandResult<()> {
        self.kill_calls.fetch_add(1, Ordering::SeqCst);
        Self::fail_if(&self.kill_fails, "permission denied")?;

        let mut instances = self.instances.lock().unwrap();
        let before = instances.len();
        instances.retain(|i| i.pid != pid);
        if instances.len() == before {
            return Err(CommandError::NotFound(format!("Process not found: {pid}")));
        }
        Ok(())
    }

    async fn check_claude_installed(&self) -> CommandResult<InstallationStatus> {
        self.install_checks.fetch_add(1, Ordering::SeqCst);
        self.installation
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| CommandError::failed("claude --version failed"))
    }

    async fn get_config(&self) -> CommandResult<AppConfig> {
        Ok(self.config.lock().unwrap().clone())
    }

    async fn save_config(&self, config: &AppConfig) -> CommandResult<()> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        Self::fail_if(&self.save_fails, "disk full")?;
        *self.config.lock().unwrap() = config.clone();
        Ok(())
    }

    async fn is_hook_installed(&self) -> CommandResult<bool> {
        Ok(self.hook_present.load(Ordering::SeqCst))
    }

    async fn install_hook(&self) -> CommandResult<String> {
        self.hook_calls.fetch_add(1, Ordering::SeqCst);
        Self::pass(&self.hook_gate).await;
        Self::fail_if(&self.hook_fails, "cannot write hook script")?;
        self.hook_present.store(true, Ordering::SeqCst);
        Ok("Hook installed successfully".to_string())
    }

    async fn uninstall_hook(&self) -> CommandResult<String> {
        self.hook_calls.fetch_add(1, Ordering::SeqCst);
        Self::pass(&self.hook_gate).await;
        Self::fail_if(&self.hook_fails, "cannot remove hook script")?;
        self.hook_present.store(false, Ordering::SeqCst);
        Ok("Hook uninstalled successfully".to_string())
    }

    async fn install_node(&self) -> CommandResult<String> {
        self.node_calls.fetch_add(1, Ordering::SeqCst);
        Self::pass(&self.installer_gate).await;
        Self::fail_if(&self.installer_fails, "download failed")?;
        Ok("Node.js installed successfully".to_string())
    }

    async fn install_claude(&self) -> CommandResult<String> {
        self.claude_calls.fetch_add(1, Ordering::SeqCst);
        Self::pass(&self.installer_gate).await;
        Self::fail_if(&self.installer_fails, "npm install failed")?;
        self.set_installation(Some(installed_status()));
        Ok("Claude Code installed successfully".to_string())
    }
}
