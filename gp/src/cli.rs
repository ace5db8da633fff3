//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

/// gitpoll - trigger OpenShift builds from git commits
#[derive(Parser)]
#[command(
    name = "gitpoll",
    about = "Poll OpenShift build configurations and trigger builds on new git commits",
    version = env!("GIT_DESCRIBE"),
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Log to stderr instead of the log file
    #[arg(long, global = true)]
    pub log_stderr: bool,

    /// OpenShift master endpoint (overrides config and KUBERNETES_MASTER)
    #[arg(short, long, global = true)]
    pub endpoint: Option<String>,

    /// Subcommand to execute (defaults to poll)
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Watch build configs and trigger builds until interrupted
    Poll {
        /// Seconds between build config polls
        #[arg(long, value_name = "SECS")]
        build_config_interval: Option<u64>,

        /// Seconds between repository polls
        #[arg(long, value_name = "SECS")]
        repository_interval: Option<u64>,
    },

    /// Fetch the build configs once and print them
    List {
        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
}

/// Result of checking a required tool
pub struct ToolCheck {
    pub name: &'static str,
    pub available: bool,
    pub version: Option<String>,
}

impl ToolCheck {
    /// Check if a tool is available and get its version
    pub fn check(name: &'static str, version_args: &[&str]) -> Self {
        debug!(name, ?version_args, "ToolCheck::check: called");
        match std::process::Command::new(name).args(version_args).output() {
            Ok(output) if output.status.success() => Self {
                name,
                available: true,
                version: Some(parse_version(&String::from_utf8_lossy(&output.stdout))),
            },
            _ => {
                debug!(name, "ToolCheck::check: tool not available");
                Self {
                    name,
                    available: false,
                    version: None,
                }
            }
        }
    }
}

/// Extract the first version-like word ("2.43.0" from "git version 2.43.0")
fn parse_version(output: &str) -> String {
    output
        .split_whitespace()
        .map(|word| word.trim_start_matches('v'))
        .filter(|word| word.starts_with(|c: char| c.is_ascii_digit()))
        .map(|word| {
            word.chars()
                .take_while(|c| c.is_ascii_digit() || *c == '.')
                .collect::<String>()
        })
        .find(|version| !version.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Get the log file path
pub fn get_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("gitpoll")
        .join("logs")
        .join("gitpoll.log")
}

/// Generate the after_help text with the git check and log location
pub fn generate_after_help() -> String {
    debug!("generate_after_help: called");
    let git = ToolCheck::check("git", &["--version"]);

    let mut help = String::new();
    help.push_str("Required Tools:\n");
    let icon = if git.available { "\u{2705}" } else { "\u{274C}" };
    let version = git.version.as_deref().unwrap_or("not found");
    help.push_str(&format!("  {} {:<10} {}\n", icon, git.name, version));

    help.push('\n');
    help.push_str(&format!("Logs are written to: {}\n", get_log_path().display()));
    help
}

/// Output format for the list command
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {}. Use: text or json", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}
