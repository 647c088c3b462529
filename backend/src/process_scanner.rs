use chrono::{DateTime, Utc};
use regex::Regex;
use std::collections::{HashMap, VecDeque};
use std::ffi::OsString;
use std::sync::OnceLock;
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, Signal, System, UpdateKind};

use claude_monitor_shared::{Instance, STATUS_EXITED, STATUS_RUNNING};

/// 終了済みインスタンスの保持上限
pub const MAX_EXITED_HISTORY: usize = 100;

/// OSから取得した1プロセス分の生データ
#[derive(Debug, Clone, Default)]
pub struct RawProcess {
    pub pid: u32,
    pub name: String,
    pub cmdline: String,
    pub cwd: Option<String>,
    pub cpu_percent: f64,
    pub memory_bytes: u64,
    pub start_time: Option<DateTime<Utc>>,
}

fn indicator_regex() -> Option<&'static Regex> {
    static INDICATOR: OnceLock<Option<Regex>> = OnceLock::new();
    INDICATOR
        .get_or_init(|| {
            Regex::new(r"(?i)(@anthropic-ai/claude-code|claude-code|(^|[/\\\s])claude(\.exe|\.cmd)?(\s|$))")
                .ok()
        })
        .as_ref()
}

/// 監視対象（Claude Code）のプロセスか判定
pub fn is_claude_process(name: &str, cmdline: &str) -> bool {
    let name = name.to_lowercase();

    // 自分自身（claude-monitor）は対象外
    if name.starts_with("claude-monitor") {
        return false;
    }

    if name.contains("claude") {
        return true;
    }

    let is_node = name.contains("node") || name.contains("npm");
    is_node && indicator_regex().is_some_and(|re| re.is_match(cmdline))
}

/// 引数列を1行のコマンドラインにする
pub fn join_cmdline(args: &[OsString]) -> String {
    args.iter()
        .map(|arg| arg.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ")
}

/// sysinfo の System を保持するスキャナー
///
/// CPU使用率は前回の更新との差分で決まるため、同じ System を使い回す。
pub struct ProcessScanner {
    system: System,
}

/// kill の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KillOutcome {
    Sent,
    NotFound,
    Refused,
}

impl ProcessScanner {
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }

    fn refresh_kind() -> ProcessRefreshKind {
        ProcessRefreshKind::new()
            .with_cpu()
            .with_memory()
            .with_cmd(UpdateKind::OnlyIfNotSet)
            .with_cwd(UpdateKind::OnlyIfNotSet)
            .with_exe(UpdateKind::OnlyIfNotSet)
    }

    /// 全プロセスを更新して一覧を返す
    pub fn scan(&mut self) -> Vec<RawProcess> {
        self.system
            .refresh_processes_specifics(ProcessesToUpdate::All, true, Self::refresh_kind());

        self.system
            .processes()
            .iter()
            .map(|(pid, process)| RawProcess {
                pid: pid.as_u32(),
                name: process.name().to_string_lossy().to_string(),
                cmdline: join_cmdline(process.cmd()),
                cwd: process.cwd().map(|path| path.to_string_lossy().to_string()),
                cpu_percent: process.cpu_usage() as f64,
                memory_bytes: process.memory(),
                start_time: DateTime::<Utc>::from_timestamp(process.start_time() as i64, 0)
                    .filter(|_| process.start_time() > 0),
            })
            .collect()
    }

    /// SIGTERM を送る。シグナルのないOSでは強制終了
    pub fn terminate(&mut self, pid: u32) -> KillOutcome {
        let target = Pid::from_u32(pid);
        self.system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[target]),
            true,
            ProcessRefreshKind::new(),
        );

        let Some(process) = self.system.process(target) else {
            return KillOutcome::NotFound;
        };
        let sent = process
            .kill_with(Signal::Term)
            .unwrap_or_else(|| process.kill());
        if sent {
            KillOutcome::Sent
        } else {
            KillOutcome::Refused
        }
    }
}

impl Default for ProcessScanner {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
struct Tracked {
    id: String,
    start_time: DateTime<Utc>,
    last_instance: Option<Instance>,
}

/// スキャン結果からインスタンス一覧を組み立てる追跡器
///
/// pid ごとに uuid を払い出し、pid が生きている間は同じ id を返す。
/// 消えた pid は `exited` として履歴に残す。
#[derive(Debug, Default)]
pub struct ProcessTracker {
    tracked: HashMap<u32, Tracked>,
    exited: VecDeque<Instance>,
    self_pid: u32,
}

impl ProcessTracker {
    pub fn new() -> Self {
        Self {
            tracked: HashMap::new(),
            exited: VecDeque::new(),
            self_pid: std::process::id(),
        }
    }

    /// スキャン結果を反映し、実行中インスタンスを返す
    pub fn observe(&mut self, processes: Vec<RawProcess>, now: DateTime<Utc>) -> Vec<Instance> {
        let mut running = Vec::new();

        for process in processes {
            if process.pid == self.self_pid || !is_claude_process(&process.name, &process.cmdline)
            {
                continue;
            }

            let tracked = self.tracked.entry(process.pid).or_insert_with(|| Tracked {
                id: uuid::Uuid::new_v4().to_string(),
                start_time: process.start_time.unwrap_or(now),
                last_instance: None,
            });

            let instance = Instance {
                id: tracked.id.clone(),
                pid: process.pid,
                cwd: process.cwd.unwrap_or_default(),
                cmdline: process.cmdline,
                status: STATUS_RUNNING.to_string(),
                start_time: tracked.start_time,
                last_seen: now,
                cpu_percent: process.cpu_percent.max(0.0),
                memory_mb: process.memory_bytes as f64 / 1024.0 / 1024.0,
            };
            tracked.last_instance = Some(instance.clone());
            running.push(instance);
        }

        // 消えたプロセスを履歴へ移す
        let live: Vec<u32> = running.iter().map(|i| i.pid).collect();
        let gone: Vec<u32> = self
            .tracked
            .keys()
            .filter(|pid| !live.contains(pid))
            .copied()
            .collect();
        for pid in gone {
            self.forget(pid);
        }

        running
    }

    /// 実行中インスタンス（と必要なら終了済み履歴）を last_seen 降順で返す
    pub fn snapshot(&self, active_only: bool) -> Vec<Instance> {
        let mut instances: Vec<Instance> = self
            .tracked
            .values()
            .filter_map(|t| t.last_instance.clone())
            .collect();
        if !active_only {
            instances.extend(self.exited.iter().cloned());
        }
        instances.sort_by(|a, b| b.last_seen.cmp(&a.last_seen).then(a.pid.cmp(&b.pid)));
        instances
    }

    /// 終了させた pid を即座に履歴へ移す
    pub fn forget(&mut self, pid: u32) {
        if let Some(instance) = self.tracked.remove(&pid).and_then(|t| t.last_instance) {
            self.push_exited(instance);
        }
    }

    fn push_exited(&mut self, mut instance: Instance) {
        instance.status = STATUS_EXITED.to_string();
        instance.cpu_percent = 0.0;
        self.exited.push_front(instance);
        self.exited.truncate(MAX_EXITED_HISTORY);
    }
}
