//! gitpoll - trigger OpenShift builds from git commits
//!
//! CLI entry point.

use std::fs;
use std::time::Duration;

use clap::{CommandFactory, FromArgMatches};
use eyre::{Context, Result};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use gitpoll::cli::{Cli, Command, OutputFormat, generate_after_help, get_log_path};
use gitpoll::config::Config;
use gitpoll::domain::BuildConfig;
use gitpoll::hook;
use gitpoll::source::{BuildConfigSource, HttpBuildConfigSource};

/// Interval of the "Watching..." heartbeat
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(60);

fn parse_level(level: Option<&str>) -> tracing::Level {
    match level.map(str::to_uppercase).as_deref() {
        None | Some("INFO") => tracing::Level::INFO,
        Some("TRACE") => tracing::Level::TRACE,
        Some("DEBUG") => tracing::Level::DEBUG,
        Some("WARN") | Some("WARNING") => tracing::Level::WARN,
        Some("ERROR") => tracing::Level::ERROR,
        Some(other) => {
            eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", other);
            tracing::Level::INFO
        }
    }
}

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>, to_stderr: bool) -> Result<()> {
    // Priority: CLI --log-level > config file > default (INFO)
    let level = parse_level(cli_log_level.or(config_log_level));
    let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

    if to_stderr {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(filter)
            .init();
    } else {
        let log_path = get_log_path();
        if let Some(log_dir) = log_path.parent() {
            fs::create_dir_all(log_dir).context("Failed to create log directory")?;
        }
        let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

        tracing_subscriber::fmt()
            .with_writer(log_file)
            .with_ansi(false)
            .with_env_filter(filter)
            .init();
    }

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Build command with dynamic after_help that shows the git check
    let cmd = Cli::command().after_help(generate_after_help());
    let cli = Cli::from_arg_matches(&cmd.get_matches())?;

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref(), cli.log_stderr)
        .context("Failed to setup logging")?;

    let mut config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    if let Some(endpoint) = cli.endpoint {
        config.endpoint = endpoint;
    }
    info!(endpoint = %config.endpoint, "gitpoll {} loaded config", env!("GIT_DESCRIBE"));

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Some(Command::List { format }) => cmd_list(&config, format).await,
        Some(Command::Poll {
            build_config_interval,
            repository_interval,
        }) => {
            if let Some(secs) = build_config_interval {
                config.watcher.build_config_interval_secs = secs;
            }
            if let Some(secs) = repository_interval {
                config.watcher.repository_interval_secs = secs;
            }
            cmd_poll(&config).await
        }
        None => cmd_poll(&config).await,
    }
}

/// Poll until Ctrl+C, then stop every watcher
async fn cmd_poll(config: &Config) -> Result<()> {
    let token = CancellationToken::new();
    let mut handle = hook::start(config, token.clone()).context("Failed to start gitpoll")?;

    println!("Watching {} (Ctrl+C to stop)", config.endpoint);

    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
    heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick completes immediately
    heartbeat.tick().await;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            result = &mut ctrl_c => {
                if let Err(e) = result {
                    error!(error = %e, "Failed to listen for Ctrl+C");
                }
                warn!("Interrupt received");
                break;
            }
            _ = heartbeat.tick() => info!("Watching..."),
            result = &mut handle => {
                // Only ends on its own if the task failed
                if let Err(e) = result {
                    error!(error = %e, "Build config watcher task failed");
                }
                return Err(eyre::eyre!("Build config watcher exited unexpectedly"));
            }
        }
    }

    info!("Shutting down...");
    token.cancel();
    match handle.await {
        Ok(watcher) => debug!(remaining = watcher.listener().active_count(), "cmd_poll: watcher stopped"),
        Err(e) => error!(error = %e, "Build config watcher task failed"),
    }
    println!("Stopped");
    Ok(())
}

/// Build config as printed by `list`; the hook secret is never shown
#[derive(Serialize)]
struct ListedConfig<'a> {
    id: &'a str,
    uri: &'a str,
    #[serde(rename = "ref")]
    git_ref: &'a str,
}

impl<'a> From<&'a BuildConfig> for ListedConfig<'a> {
    fn from(config: &'a BuildConfig) -> Self {
        Self {
            id: &config.id,
            uri: &config.uri,
            git_ref: config.branch(),
        }
    }
}

/// Fetch the build configs once and print them
async fn cmd_list(config: &Config, format: OutputFormat) -> Result<()> {
    let source = HttpBuildConfigSource::new(&config.endpoint, config.watcher.fetch_timeout())?;
    let configs = source
        .list()
        .await
        .context(format!("Failed to list build configs from {}", source.url()))?;
    let listed: Vec<ListedConfig> = configs.iter().map(ListedConfig::from).collect();

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&listed)?),
        OutputFormat::Text => {
            if listed.is_empty() {
                println!("No build configs found");
                return Ok(());
            }
            println!("{:<30} {:<20} URI", "ID", "REF");
            for item in &listed {
                println!("{:<30} {:<20} {}", item.id, item.git_ref, item.uri);
            }
        }
    }
    Ok(())
}
