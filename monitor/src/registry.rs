use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use claude_monitor_shared::{
    log_poller, log_registry, Collaborator, Instance, InstallationStatus,
};

use crate::error::ActionError;
use crate::gate::{fetch_installation, InstallationGate};

/// 外部から見える一貫した状態
#[derive(Debug, Clone, Default)]
pub struct RegistrySnapshot {
    pub instances: Vec<Instance>,
    pub gate: InstallationGate,
    pub loading: bool,
}

#[derive(Debug, Default)]
struct RegistryState {
    instances: Vec<Instance>,
    gate: InstallationGate,
    /// 実行中の refresh() の数
    refreshes_in_flight: usize,
}

/// ポーリングタスクと共有するデータ部分
#[derive(Clone)]
struct RegistryCore {
    backend: Arc<dyn Collaborator>,
    state: Arc<RwLock<RegistryState>>,
    update_sender: broadcast::Sender<()>,
}

impl RegistryCore {
    fn notify(&self) {
        let _ = self.update_sender.send(());
    }

    async fn fetch_instances(&self) -> Option<Vec<Instance>> {
        match self.backend.get_instances(true).await {
            Ok(instances) => Some(instances),
            Err(e) => {
                log_registry!(warn, "instance fetch failed, keeping previous list: {e}");
                None
            }
        }
    }

    async fn load_instances(&self) {
        let Some(instances) = self.fetch_instances().await else {
            return;
        };
        log_registry!(debug, "loaded {} instance(s)", instances.len());
        self.state.write().await.instances = instances;
        self.notify();
    }

    async fn refresh(&self) {
        self.state.write().await.refreshes_in_flight += 1;
        self.notify();

        let (installation, instances) = tokio::join!(
            fetch_installation(self.backend.as_ref()),
            self.fetch_instances()
        );

        // 両方の結果を同じロックの中で反映してから loading を下ろす
        {
            let mut state = self.state.write().await;
            if let Some(status) = installation {
                state.gate.apply(status);
            }
            if let Some(instances) = instances {
                state.instances = instances;
            }
            state.refreshes_in_flight = state.refreshes_in_flight.saturating_sub(1);
        }
        self.notify();
    }
}

#[derive(Default)]
struct PollSlot {
    task: Option<JoinHandle<()>>,
    generation: u64,
}

impl PollSlot {
    fn stop(&mut self) -> bool {
        match self.task.take() {
            Some(task) => {
                task.abort();
                true
            }
            None => false,
        }
    }
}

impl Drop for PollSlot {
    fn drop(&mut self) {
        self.stop();
    }
}

fn lock_slot(slot: &Mutex<PollSlot>) -> MutexGuard<'_, PollSlot> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// start_polling が返す停止ハンドル
///
/// 自分が開始したタイマーだけを止める。後から再開されたタイマーには影響しない。
#[derive(Debug, Clone)]
pub struct PollingHandle {
    slot: Weak<Mutex<PollSlot>>,
    generation: u64,
}

impl PollingHandle {
    pub fn stop(&self) {
        let Some(slot) = self.slot.upgrade() else {
            return;
        };
        let mut slot = lock_slot(&slot);
        if slot.generation == self.generation && slot.stop() {
            log_poller!(debug, "polling stopped (generation {})", self.generation);
        }
    }
}

impl std::fmt::Debug for PollSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollSlot")
            .field("running", &self.task.is_some())
            .field("generation", &self.generation)
            .finish()
    }
}

/// 実行中インスタンスの一覧を保持し、外部コラボレーターと同期する
///
/// クローンは同じ状態とタイマーを共有する。最後のクローンが落ちるとタイマーも止まる。
#[derive(Clone)]
pub struct InstanceRegistry {
    core: RegistryCore,
    poller: Arc<Mutex<PollSlot>>,
}

impl InstanceRegistry {
    pub fn new(backend: Arc<dyn Collaborator>, update_sender: broadcast::Sender<()>) -> Self {
        Self {
            core: RegistryCore {
                backend,
                state: Arc::new(RwLock::new(RegistryState::default())),
                update_sender,
            },
            poller: Arc::new(Mutex::new(PollSlot::default())),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.core.update_sender.subscribe()
    }

    pub async fn snapshot(&self) -> RegistrySnapshot {
        let state = self.core.state.read().await;
        RegistrySnapshot {
            instances: state.instances.clone(),
            gate: state.gate.clone(),
            loading: state.refreshes_in_flight > 0,
        }
    }

    pub async fn instances(&self) -> Vec<Instance> {
        self.core.state.read().await.instances.clone()
    }

    pub async fn is_loading(&self) -> bool {
        self.core.state.read().await.refreshes_in_flight > 0
    }

    /// インストール状態と一覧を並行に取り直す
    pub async fn refresh(&self) {
        self.core.refresh().await;
    }

    /// 一覧のみ取り直す
    pub async fn load_instances(&self) {
        self.core.load_instances().await;
    }

    /// インストール状態のみ確認する
    pub async fn check_installation(&self) -> Option<InstallationStatus> {
        let status = fetch_installation(self.core.backend.as_ref()).await?;
        self.core.state.write().await.gate.apply(status.clone());
        self.core.notify();
        Some(status)
    }

    /// プロセスを終了し、成功したら一覧を取り直す
    pub async fn kill_instance(&self, pid: u32) -> Result<(), ActionError> {
        if let Err(source) = self.core.backend.kill_instance(pid).await {
            log_registry!(warn, "kill {pid} failed: {source}");
            return Err(ActionError::Kill { pid, source });
        }
        log_registry!(info, "killed instance pid={pid}");
        self.core.load_instances().await;
        Ok(())
    }

    /// 一覧の定期取得を開始する。既存のタイマーは先に止める
    pub fn start_polling(&self, interval: Duration) -> PollingHandle {
        let period = interval.max(Duration::from_millis(1));
        let mut slot = lock_slot(&self.poller);
        slot.stop();
        slot.generation += 1;

        let core = self.core.clone();
        slot.task = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                log_poller!(trace, "tick");
                core.load_instances().await;
            }
        }));
        log_poller!(
            debug,
            "polling every {:?} (generation {})",
            period,
            slot.generation
        );

        PollingHandle {
            slot: Arc::downgrade(&self.poller),
            generation: slot.generation,
        }
    }

    /// 動いていなければ何もしない
    pub fn stop_polling(&self) {
        if lock_slot(&self.poller).stop() {
            log_poller!(debug, "polling stopped");
        }
    }

    pub fn is_polling(&self) -> bool {
        lock_slot(&self.poller)
            .task
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }
}
