use anyhow::Context;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;

use claude_monitor::app::{App, AppOptions};
use claude_monitor::live_ui::{print_snapshot, LiveUI, LogBuffer};
use claude_monitor_backend::LocalBackend;
use claude_monitor_shared::logging::{set_log_level, LogLevel};
use claude_monitor_shared::{dispatch, log_debug, logging::LogCategory, ConfigFile, Request};

#[derive(Parser)]
#[command(name = "claude-monitor")]
#[command(about = "Monitor running Claude Code instances in real-time")]
struct Cli {
    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Polling interval in seconds (overrides config)
    #[arg(short, long)]
    interval: Option<u64>,

    /// Print the dashboard once and exit
    #[arg(long)]
    snapshot: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a single command to the local backend and print the JSON result
    Invoke {
        /// Command name (e.g. get_instances, kill_instance)
        command: String,

        /// Arguments as a JSON object
        #[arg(long)]
        args: Option<String>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut file = ConfigFile::default_config_path()
        .and_then(ConfigFile::load_or_default)
        .unwrap_or_default();
    file.apply_env_overrides();

    let verbose = cli.verbose || file.logging.verbose;
    set_log_level(if verbose { LogLevel::Debug } else { LogLevel::Info });

    let backend = Arc::new(LocalBackend::new()?);
    log_debug!(
        LogCategory::System,
        "config file: {}",
        backend.config_path().display()
    );

    if let Some(Commands::Invoke { command, args }) = cli.command {
        return run_invoke(backend.as_ref(), &command, args.as_deref()).await;
    }

    let interval_override = cli
        .interval
        .map(|secs| Duration::from_secs(secs.max(1)))
        .or_else(|| {
            std::env::var("CLAUDE_MONITOR_POLL_SECS")
                .is_ok()
                .then(|| file.app.polling_interval())
        });
    let mut app = App::new(backend, AppOptions { interval_override });

    if cli.snapshot {
        print_snapshot(&mut app).await;
        return Ok(());
    }

    run_live_mode(app, verbose).await
}

/// 1コマンドだけ実行
async fn run_invoke(
    backend: &LocalBackend,
    command: &str,
    args: Option<&str>,
) -> anyhow::Result<()> {
    let args = args
        .map(serde_json::from_str)
        .transpose()
        .context("--args must be a JSON object")?;
    let request = Request::from_parts(command, args)?;
    log_debug!(LogCategory::System, "invoke: {}", request.command_name());

    let value = dispatch(backend, request).await?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

/// ライブモード実行
async fn run_live_mode(app: App, verbose: bool) -> anyhow::Result<()> {
    // 画面を崩さないようログはバッファへ
    let logs = LogBuffer::new(5);
    logs.attach();

    let mut live_ui = LiveUI::new(app, logs, verbose);
    if let Err(e) = live_ui.run().await {
        eprintln!("❌ Live UI error: {e}");
        return Err(e);
    }
    Ok(())
}
