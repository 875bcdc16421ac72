//! Check a focusd config file and print what the daemon would use

use clap::Parser;
use focus_api::Interval;
use focus_config::{ConfigError, Settings, CURRENT_CONFIG_VERSION};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "validate-config")]
#[command(about = "Validate a focusd configuration file", long_about = None)]
struct Args {
    /// Config file (defaults to ~/.config/focusd/config.toml)
    path: Option<PathBuf>,

    /// Only set the exit status
    #[arg(short, long)]
    quiet: bool,
}

fn print_summary(settings: &Settings) {
    let on_off = |enabled: bool| if enabled { "on" } else { "off" };

    println!("config_version {}", CURRENT_CONFIG_VERSION);
    println!("socket         {}", settings.daemon.socket_path.display());
    println!("data dir       {}", settings.daemon.data_dir.display());
    println!(
        "intervals      {}m focus, {}m break",
        settings.timer.work_minutes, settings.timer.break_minutes
    );
    println!("badge refresh  {}s", settings.timer.badge_refresh.as_secs());
    for interval in [Interval::Work, Interval::Break] {
        let text = settings.notifications.for_finished(interval);
        println!("after {:<8} {:?} / {:?}", interval.as_str(), text.title, text.message);
    }
    println!("audio          {}", settings.audio.command_line().join(" "));
    println!(
        "blocking       {} ({} keywords seeded on first start)",
        on_off(settings.blocking.enabled),
        settings.blocking.sites.len()
    );
}

fn report(error: &ConfigError) {
    match error {
        ConfigError::ValidationFailed { errors } => {
            eprintln!("{} problem(s):", errors.len());
            for err in errors {
                eprintln!("  {}", err);
            }
        }
        ConfigError::UnsupportedVersion(version) => {
            eprintln!(
                "config_version {} is not supported; this build reads {}",
                version, CURRENT_CONFIG_VERSION
            );
        }
        other => eprintln!("{}", other),
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    let path = args.path.unwrap_or_else(focus_util::default_config_path);

    match focus_config::load_config(&path) {
        Ok(settings) => {
            if !args.quiet {
                println!("{}: ok", path.display());
                print_summary(&settings);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            if !args.quiet {
                eprintln!("{}: invalid", path.display());
                report(&e);
            }
            ExitCode::from(1)
        }
    }
}
