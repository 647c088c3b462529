use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

/// 実行中の操作への再入を防ぐラッチ
#[derive(Debug, Clone)]
pub struct BusyFlag {
    flag: Arc<AtomicBool>,
    updates: broadcast::Sender<()>,
}

impl BusyFlag {
    pub fn new(updates: broadcast::Sender<()>) -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            updates,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// 空いていればラッチを取る。ガードが落ちると解放される
    pub fn try_acquire(&self) -> Option<BusyGuard> {
        self.flag
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        let _ = self.updates.send(());
        Some(BusyGuard { owner: self.clone() })
    }
}

/// 成功・失敗に関わらず drop で解放
#[derive(Debug)]
pub struct BusyGuard {
    owner: BusyFlag,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.owner.flag.store(false, Ordering::Release);
        let _ = self.owner.updates.send(());
    }
}
