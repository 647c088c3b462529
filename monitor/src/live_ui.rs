use chrono::Local;
use std::collections::VecDeque;
use std::future::Future;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{broadcast, mpsc};

use claude_monitor_shared::{logging, AppConfig};

use crate::app::{App, View};
use crate::dashboard::DashboardModel;
use crate::error::{ActionError, InstallTarget};
use crate::gate::InstallationGate;
use crate::unicode_utils::{pad_to_width, truncate_str};

/// ターミナル幅を取得（デフォルト80）
fn get_terminal_width() -> usize {
    if let Some((width, _)) = term_size::dimensions() {
        width.max(40) // 最低40文字は確保
    } else {
        80
    }
}

/// 標準入力から受け付けるコマンド
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiCommand {
    Refresh,
    SwitchView(View),
    /// 1始まりのグループ番号
    ToggleGroup(usize),
    Kill(u32),
    Confirm,
    Cancel,
    ToggleHook,
    Install(InstallTarget),
    Help,
    Quit,
}

/// 1行分の入力を解釈する。空行は None
pub fn parse_command(line: &str) -> Option<Result<UiCommand, String>> {
    let mut parts = line.split_whitespace();
    let head = parts.next()?.to_lowercase();
    let arg = parts.next();

    let command = match (head.as_str(), arg) {
        ("r" | "refresh", None) => Ok(UiCommand::Refresh),
        ("e" | "expand", Some(n)) => n
            .parse()
            .map(UiCommand::ToggleGroup)
            .map_err(|_| format!("invalid group number: {n}")),
        ("k" | "kill", Some(pid)) => pid
            .parse()
            .map(UiCommand::Kill)
            .map_err(|_| format!("invalid PID: {pid}")),
        ("y" | "yes", None) => Ok(UiCommand::Confirm),
        ("n" | "no", None) => Ok(UiCommand::Cancel),
        ("t" | "toggle", None) => Ok(UiCommand::ToggleHook),
        ("i" | "install", Some("node")) => Ok(UiCommand::Install(InstallTarget::Node)),
        ("i" | "install", Some("claude")) => Ok(UiCommand::Install(InstallTarget::Claude)),
        ("h" | "help" | "?", None) => Ok(UiCommand::Help),
        ("q" | "quit" | "exit", None) => Ok(UiCommand::Quit),
        (view, None) => view
            .parse()
            .map(UiCommand::SwitchView)
            .map_err(|_| format!("unknown command: {}", line.trim())),
        _ => Err(format!("unknown command: {}", line.trim())),
    };
    Some(command)
}

/// ライブ表示中はログを画面下部に出すためのリングバッファ
#[derive(Debug, Clone)]
pub struct LogBuffer {
    lines: Arc<Mutex<VecDeque<String>>>,
    capacity: usize,
}

impl LogBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    pub fn push(&self, line: &str) {
        let mut lines = self.lines.lock().unwrap_or_else(|p| p.into_inner());
        if lines.len() == self.capacity {
            lines.pop_front();
        }
        lines.push_back(line.to_string());
    }

    pub fn lines(&self) -> Vec<String> {
        let lines = self.lines.lock().unwrap_or_else(|p| p.into_inner());
        lines.iter().cloned().collect()
    }

    /// グローバルなログ出力先にする（プロセスで最初の1回のみ有効）
    pub fn attach(&self) -> bool {
        let buffer = self.clone();
        logging::set_log_output(move |line| buffer.push(line))
    }
}

/// ライブUI管理
pub struct LiveUI {
    app: App,
    update_receiver: broadcast::Receiver<()>,
    status_sender: mpsc::UnboundedSender<String>,
    status_receiver: mpsc::UnboundedReceiver<String>,
    status: Option<String>,
    logs: LogBuffer,
    verbose: bool,
}

enum Flow {
    Continue,
    Quit,
}

impl LiveUI {
    pub fn new(app: App, logs: LogBuffer, verbose: bool) -> Self {
        let update_receiver = app.subscribe();
        let (status_sender, status_receiver) = mpsc::unbounded_channel();
        Self {
            app,
            update_receiver,
            status_sender,
            status_receiver,
            status: None,
            logs,
            verbose,
        }
    }

    /// UI表示ループ開始
    pub async fn run(&mut self) -> anyhow::Result<()> {
        self.app.start().await;
        self.render_ui().await;

        let mut input = BufReader::new(tokio::io::stdin()).lines();
        let mut input_open = true;

        loop {
            tokio::select! {
                result = self.update_receiver.recv() => {
                    if let Err(broadcast::error::RecvError::Closed) = result {
                        break;
                    }
                    self.render_ui().await;
                }

                Some(message) = self.status_receiver.recv() => {
                    self.status = Some(message);
                    self.render_ui().await;
                }

                line = input.next_line(), if input_open => {
                    match line? {
                        Some(line) => {
                            if let Flow::Quit = self.handle_line(&line).await {
                                break;
                            }
                            self.render_ui().await;
                        }
                        // 入力が閉じても表示は続ける
                        None => input_open = false,
                    }
                }

                // 経過時間の表示更新
                _ = tokio::time::sleep(tokio::time::Duration::from_secs(1)) => {
                    self.render_ui().await;
                }

                _ = tokio::signal::ctrl_c() => {
                    break;
                }
            }
        }

        self.app.shutdown();
        println!("\n👋 Shutting down Live UI...");
        Ok(())
    }

    async fn handle_line(&mut self, line: &str) -> Flow {
        let command = match parse_command(line) {
            None => return Flow::Continue,
            Some(Ok(command)) => command,
            Some(Err(message)) => {
                self.status = Some(format!("❓ {message}"));
                return Flow::Continue;
            }
        };

        match command {
            UiCommand::Refresh => {
                tokio::spawn(self.app.refresh());
            }
            UiCommand::SwitchView(view) => self.app.set_view(view).await,
            UiCommand::ToggleGroup(number) => {
                let model = self.app.dashboard().await;
                match model.group(number) {
                    Some(group) => {
                        let key = group.key.clone();
                        self.app.toggle_group(&key);
                    }
                    None => self.status = Some(format!("❓ no group #{number}")),
                }
            }
            UiCommand::Kill(pid) => {
                let listed = self
                    .app
                    .snapshot()
                    .await
                    .instances
                    .iter()
                    .any(|i| i.pid == pid);
                if listed {
                    self.app.request_kill(pid);
                } else {
                    self.status = Some(format!("❓ PID {pid} is not in the list"));
                }
            }
            UiCommand::Confirm => match self.app.confirm_kill() {
                Ok(kill) => self.report(async move {
                    kill.await.map(|pid| format!("Terminated PID {pid}"))
                }),
                Err(e) => self.status = Some(format!("❌ {e}")),
            },
            UiCommand::Cancel => {
                if let Some(pid) = self.app.cancel_kill() {
                    self.status = Some(format!("Termination of PID {pid} cancelled"));
                }
            }
            UiCommand::ToggleHook => self.report(self.app.toggle_hook()),
            UiCommand::Install(target) => {
                self.status = Some(format!("⏳ Installing {target}..."));
                self.report(self.app.install(target));
            }
            UiCommand::Help => self.status = Some(HELP_LINE.to_string()),
            UiCommand::Quit => return Flow::Quit,
        }
        Flow::Continue
    }

    /// 実行中も入力を受け付けられるよう別タスクで動かし、結果をステータス行に出す
    fn report<F>(&self, action: F)
    where
        F: Future<Output = Result<String, ActionError>> + Send + 'static,
    {
        let sender = self.status_sender.clone();
        tokio::spawn(async move {
            let message = match action.await {
                Ok(message) => format!("✅ {message}"),
                Err(e) => format!("❌ {e}"),
            };
            let _ = sender.send(message);
        });
    }

    /// UI描画
    async fn render_ui(&mut self) {
        let width = get_terminal_width();
        let mut lines = render_header(self.app.view(), width);

        match self.app.view() {
            View::Dashboard => {
                let model = self.app.dashboard().await;
                lines.extend(render_dashboard(&model, self.app.pending_kill(), width));
            }
            View::Install => {
                let snapshot = self.app.snapshot().await;
                let installer = self.app.installer();
                lines.extend(render_install(
                    &snapshot.gate,
                    installer.installing_node(),
                    installer.installing_claude(),
                ));
            }
            View::Hooks => {
                let config = self.app.config().await;
                lines.extend(render_hooks(&config, self.app.hook_toggle().installing()));
            }
            View::History => lines.extend(render_history()),
        }

        lines.push(String::new());
        if let Some(status) = &self.status {
            lines.push(truncate_str(status, width));
        }
        if self.verbose {
            lines.extend(self.logs.lines().iter().map(|l| truncate_str(l, width)));
        }

        let now = Local::now();
        lines.push(format!(
            "🔄 Last update: {} | Polling: {} | {}",
            now.format("%H:%M:%S"),
            if self.app.is_polling() { "on" } else { "off" },
            HELP_LINE
        ));

        // ANSI: 画面クリア + カーソルを左上に移動
        let mut stdout = io::stdout().lock();
        let _ = write!(stdout, "\x1b[2J\x1b[H{}\n> ", lines.join("\n"));
        let _ = stdout.flush();
    }
}

const HELP_LINE: &str =
    "r refresh · 1-4 view · e <n> expand · k <pid> kill · t hook · i node|claude · q quit";

pub fn render_header(current: View, width: usize) -> Vec<String> {
    let tabs: Vec<String> = View::ALL
        .iter()
        .enumerate()
        .map(|(i, view)| {
            if *view == current {
                format!("[{} {}]", i + 1, view.label())
            } else {
                format!(" {} {} ", i + 1, view.label())
            }
        })
        .collect();

    vec![
        "🔥 Claude Instance Monitor".to_string(),
        tabs.join(" "),
        "═".repeat(width),
    ]
}

pub fn render_dashboard(
    model: &DashboardModel,
    pending_kill: Option<u32>,
    width: usize,
) -> Vec<String> {
    let mut lines = Vec::new();

    match model {
        DashboardModel::NotInstalled => {
            lines.push("⚠️  Claude Code is not installed".to_string());
            lines.push("💡 Open the Install view (2) to set it up".to_string());
            return lines;
        }
        DashboardModel::Empty { loading } => {
            if *loading {
                lines.push("🔄 Loading...".to_string());
            }
            lines.push("⏳ No running Claude Code instances".to_string());
        }
        DashboardModel::Groups {
            loading,
            instance_count,
            groups,
        } => {
            lines.push(format!(
                "📊 Instances: {instance_count}  Groups: {}{}",
                groups.len(),
                if *loading { "  🔄" } else { "" }
            ));
            lines.push(String::new());

            for (index, group) in groups.iter().enumerate() {
                let marker = if group.expanded { "▼" } else { "▶" };
                let key = truncate_str(&group.key, width.saturating_sub(50).max(10));
                lines.push(format!(
                    "{marker} [{}] 📁 {}  ({})  CPU {:.1}%  MEM {:.1} MB",
                    index + 1,
                    key,
                    group.count,
                    group.total_cpu,
                    group.total_mem
                ));

                if !group.expanded {
                    continue;
                }
                for member in &group.members {
                    lines.push(format!(
                        "      PID {}  CPU {:>5.1}%  MEM {:>7.1} MB  {}  {}",
                        pad_to_width(&member.pid.to_string(), 7),
                        member.cpu_percent,
                        member.memory_mb,
                        member.started,
                        member.cmdline
                    ));
                }
            }
        }
    }

    if let Some(pid) = pending_kill {
        lines.push(String::new());
        lines.push(format!("⚠️  Terminate PID {pid}? (y/n)"));
    }
    lines
}

pub fn render_install(gate: &InstallationGate, installing_node: bool, installing_claude: bool) -> Vec<String> {
    let mut lines = Vec::new();

    match gate.status() {
        None => lines.push("🔄 Checking installation...".to_string()),
        Some(status) if status.installed => {
            lines.push(format!(
                "✅ Claude Code installed ({})",
                status.version.as_deref().unwrap_or("unknown version")
            ));
            if let Some(path) = &status.path {
                lines.push(format!("   📍 {path}"));
            }
        }
        Some(_) => lines.push("⚠️  Claude Code is not installed".to_string()),
    }

    lines.push(String::new());
    let busy = |flag: bool| if flag { "  ⏳ installing..." } else { "" };
    lines.push(format!("   i node    Install Node.js{}", busy(installing_node)));
    lines.push(format!(
        "   i claude  Install Claude Code{}",
        busy(installing_claude)
    ));
    lines
}

pub fn render_hooks(config: &AppConfig, installing: bool) -> Vec<String> {
    let state = if config.hook_enabled { "✅ enabled" } else { "⬜ disabled" };
    let mut lines = vec![format!("🪝 Hook: {state}")];
    if installing {
        lines.push("   ⏳ working...".to_string());
    } else {
        lines.push("   t  toggle hook".to_string());
    }
    lines.push(String::new());
    lines.push(format!("   Auto-start monitor: {}", config.auto_start_monitor));
    lines.push(format!(
        "   Polling interval: {}s",
        config.polling_interval_secs
    ));
    lines
}

pub fn render_history() -> Vec<String> {
    vec!["🚧 History is not implemented yet".to_string()]
}

/// 非インタラクティブ表示（1回だけ取得して出力）
pub async fn print_snapshot(app: &mut App) {
    app.start().await;
    app.shutdown();

    let width = get_terminal_width();
    println!("📊 Claude Instance Monitor - Snapshot");
    println!("{}", "═".repeat(width.min(50)));
    for line in render_dashboard(&app.dashboard().await, None, width) {
        println!("{line}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::{GroupRow, InstanceRow};
    use claude_monitor_shared::InstallationStatus;

    fn row(key: &str, expanded: bool) -> GroupRow {
        GroupRow {
            key: key.to_string(),
            count: 1,
            total_cpu: 12.5,
            total_mem: 256.0,
            expanded,
            members: vec![InstanceRow {
                id: "a1".to_string(),
                pid: 4242,
                cmdline: "claude --continue".to_string(),
                cpu_percent: 12.5,
                memory_mb: 256.0,
                started: "09:15:00".to_string(),
            }],
        }
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse_command("  "), None);
        assert_eq!(parse_command("r"), Some(Ok(UiCommand::Refresh)));
        assert_eq!(parse_command("e 2"), Some(Ok(UiCommand::ToggleGroup(2))));
        assert_eq!(parse_command("k 101"), Some(Ok(UiCommand::Kill(101))));
        assert_eq!(parse_command("Y"), Some(Ok(UiCommand::Confirm)));
        assert_eq!(
            parse_command("i claude"),
            Some(Ok(UiCommand::Install(InstallTarget::Claude)))
        );
        assert_eq!(
            parse_command("3"),
            Some(Ok(UiCommand::SwitchView(View::Hooks)))
        );
        assert_eq!(
            parse_command("history"),
            Some(Ok(UiCommand::SwitchView(View::History)))
        );
        assert!(matches!(parse_command("k abc"), Some(Err(_))));
        assert!(matches!(parse_command("i python"), Some(Err(_))));
        assert!(matches!(parse_command("bogus"), Some(Err(_))));
    }

    #[test]
    fn test_render_not_installed_placeholder() {
        let lines = render_dashboard(&DashboardModel::NotInstalled, Some(1), 80);
        assert!(lines[0].contains("not installed"));
        assert!(!lines.iter().any(|l| l.contains("PID")));
    }

    #[test]
    fn test_render_collapsed_and_expanded_groups() {
        let model = DashboardModel::Groups {
            loading: false,
            instance_count: 2,
            groups: vec![row("/a", false), row("/b", true)],
        };
        let lines = render_dashboard(&model, Some(4242), 80);
        let text = lines.join("\n");

        assert!(text.contains("▶ [1] 📁 /a  (1)  CPU 12.5%  MEM 256.0 MB"));
        assert!(text.contains("▼ [2] 📁 /b"));
        assert_eq!(text.matches("claude --continue").count(), 1);
        assert!(text.contains("Terminate PID 4242? (y/n)"));
    }

    #[test]
    fn test_render_install_and_hooks() {
        let mut gate = InstallationGate::new();
        assert!(render_install(&gate, false, false)[0].contains("Checking"));

        gate.apply(InstallationStatus {
            installed: true,
            version: Some("1.0.3".to_string()),
            path: Some("/usr/bin/claude".to_string()),
        });
        let lines = render_install(&gate, false, true);
        assert!(lines[0].contains("1.0.3"));
        assert!(lines.iter().any(|l| l.contains("Claude Code  ⏳")));

        let hooks = render_hooks(&AppConfig::default(), true);
        assert!(hooks[0].contains("disabled"));
        assert!(hooks[1].contains("working"));
    }

    #[test]
    fn test_log_buffer_keeps_latest_lines() {
        let buffer = LogBuffer::new(2);
        buffer.push("one");
        buffer.push("two");
        buffer.push("three");
        assert_eq!(buffer.lines(), vec!["two", "three"]);
    }
}
