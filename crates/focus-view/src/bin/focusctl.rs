//! focusctl - command-line view for focusd
//!
//! One-shot commands print the daemon's reply. `watch` mounts a terminal
//! view that follows the timer like the popup or overlay would.

use anyhow::{bail, Result};
use clap::{Parser, Subcommand, ValueEnum};
use focus_api::{
    Command, ConfigChange, HistoryEntry, Interval, ResponsePayload, TimerReply, TimerState,
};
use focus_ipc::IpcClient;
use focus_util::default_socket_path;
use focus_view::{
    render, CountdownDisplay, SharedState, ViewClient, ViewKind, ViewRenderer, ViewSynchronizer,
};
use std::io::Write;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

/// focusctl - talk to the focusd daemon
#[derive(Parser, Debug)]
#[command(name = "focusctl")]
#[command(about = "Command-line client for focusd", long_about = None)]
struct Args {
    /// Socket path for focusd connection (or set FOCUS_SOCKET env var)
    #[arg(short, long, env = "FOCUS_SOCKET")]
    socket: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "warn")]
    log_level: String,

    /// Print raw JSON replies
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Show the timer
    Status,
    /// Start focusing, or resume after a pause
    Start,
    Pause,
    Reset,
    /// Start the next interval after one completed
    Advance {
        #[arg(long, value_enum)]
        to: Option<IntervalArg>,
    },
    /// Change a setting while idle: work <minutes>, break <minutes> or goal <text>
    Set { field: String, value: String },
    /// Follow the timer in the terminal
    Watch {
        /// Render like the on-page overlay instead of the popup
        #[arg(long)]
        overlay: bool,
    },
    /// Close a finished overlay (resets the timer)
    Dismiss,
    /// Keyword blocking
    Block {
        #[command(subcommand)]
        action: BlockCmd,
    },
    /// Check whether a URL would be blocked
    Check { url: String },
    /// Background audio player
    Audio {
        #[command(subcommand)]
        action: AudioCmd,
    },
    /// Recent history, newest first
    History {
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
    },
    Health,
    Ping,
}

#[derive(Subcommand, Debug)]
enum BlockCmd {
    On,
    Off,
    Add { site: String },
    Remove { site: String },
    List,
}

#[derive(Subcommand, Debug)]
enum AudioCmd {
    Play,
    Stop,
    Status,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum IntervalArg {
    Work,
    Break,
}

impl From<IntervalArg> for Interval {
    fn from(arg: IntervalArg) -> Self {
        match arg {
            IntervalArg::Work => Interval::Work,
            IntervalArg::Break => Interval::Break,
        }
    }
}

fn to_command(cmd: Cmd) -> Result<Command> {
    Ok(match cmd {
        Cmd::Status => Command::GetState,
        Cmd::Start => Command::StartTimer,
        Cmd::Pause => Command::PauseTimer,
        Cmd::Reset | Cmd::Dismiss => Command::ResetTimer,
        Cmd::Advance { to } => Command::AdvanceTimer {
            next: to.map(Interval::from),
        },
        Cmd::Set { field, value } => Command::ConfigureTimer {
            change: ConfigChange::parse(&field, &value)?,
        },
        Cmd::Block { action } => match action {
            BlockCmd::On => Command::SetBlockingEnabled { enabled: true },
            BlockCmd::Off => Command::SetBlockingEnabled { enabled: false },
            BlockCmd::Add { site } => Command::AddBlockedSite { site },
            BlockCmd::Remove { site } => Command::RemoveBlockedSite { site },
            BlockCmd::List => Command::GetState,
        },
        Cmd::Check { url } => Command::CheckUrl { url },
        Cmd::Audio { action } => match action {
            AudioCmd::Play => Command::PlayAudio,
            AudioCmd::Stop => Command::StopAudio,
            AudioCmd::Status => Command::GetAudioStatus,
        },
        Cmd::History { limit } => Command::GetHistory { limit },
        Cmd::Health => Command::GetHealth,
        Cmd::Ping => Command::Ping,
        Cmd::Watch { .. } => bail!("watch is not a single command"),
    })
}

fn print_timer(timer: &TimerState) {
    let display = render(ViewKind::Popup, timer, focus_util::now());
    print!("{} {}", display.status_label, display.time_text);
    if let Some(goal) = &display.goal {
        print!("  Target: {}", goal);
    }
    println!();
}

fn print_history(entries: &[HistoryEntry]) {
    for entry in entries {
        let event = serde_json::to_string(&entry.event).unwrap_or_default();
        println!("{}  {}", entry.timestamp.format("%Y-%m-%d %H:%M:%S"), event);
    }
}

fn print_payload(payload: &ResponsePayload, blocking_only: bool) {
    match payload {
        ResponsePayload::State(snapshot) if blocking_only => {
            let state = if snapshot.blocking.enabled { "on" } else { "off" };
            println!("blocking {}", state);
            for site in &snapshot.blocking.sites {
                println!("  {}", site);
            }
        }
        ResponsePayload::State(snapshot) => print_timer(&snapshot.timer),
        ResponsePayload::Timer(TimerReply::Applied { state }) => print_timer(state),
        ResponsePayload::Timer(TimerReply::Rejected { state, reason }) => {
            println!("rejected: {}", reason.message());
            print_timer(state);
        }
        ResponsePayload::Blocking(settings) => {
            let state = if settings.enabled { "on" } else { "off" };
            println!("blocking {} ({} sites)", state, settings.sites.len());
        }
        ResponsePayload::UrlVerdict(verdict) => match &verdict.keyword {
            Some(keyword) => println!("blocked by '{}'", keyword),
            None => println!("allowed"),
        },
        ResponsePayload::AudioStatus { playing } => {
            println!("{}", if *playing { "playing" } else { "stopped" });
        }
        ResponsePayload::History { entries } => print_history(entries),
        ResponsePayload::Health(health) => {
            println!(
                "live={} ready={} store_ok={} host_ok={}",
                health.live, health.ready, health.store_ok, health.host_ok
            );
        }
        ResponsePayload::Pong => println!("pong"),
        ResponsePayload::Subscribed { .. } | ResponsePayload::Unsubscribed => {}
    }
}

/// Redraws one terminal line
struct TerminalRenderer;

impl ViewRenderer for TerminalRenderer {
    fn render(&mut self, display: &CountdownDisplay) {
        let mut line = if display.visible {
            format!("{:>9}  {}", display.status_label, display.time_text)
        } else {
            String::from("     IDLE")
        };
        if let Some(goal) = &display.goal {
            line.push_str(&format!("  Target: {}", goal));
        }
        print!("\r\x1b[2K{}", line);
        let _ = std::io::stdout().flush();
    }

    fn disconnected(&mut self) {
        print!("\r\x1b[2K  waiting for focusd...");
        let _ = std::io::stdout().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let socket_path = args.socket.unwrap_or_else(default_socket_path);

    if let Cmd::Watch { overlay } = args.command {
        let kind = if overlay { ViewKind::Overlay } else { ViewKind::Popup };
        let (_command_tx, command_rx) = mpsc::unbounded_channel();
        let sync = ViewSynchronizer::new(kind, TerminalRenderer);
        let client = ViewClient::new(&socket_path, SharedState::new(), sync, command_rx);

        tokio::select! {
            _ = client.run() => {}
            _ = tokio::signal::ctrl_c() => println!(),
        }
        return Ok(());
    }

    let blocking_only = matches!(args.command, Cmd::Block { action: BlockCmd::List });
    let command = to_command(args.command)?;

    let mut client = IpcClient::connect(&socket_path).await?;
    let payload = client.call(command).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        print_payload(&payload, blocking_only);
    }

    Ok(())
}
