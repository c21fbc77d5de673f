use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tabd_storage::BackendPreference;

/// CLI surface definition. Browsers launch the binary with no subcommand.
#[derive(Parser, Debug)]
#[command(
    name = "tabd-native-host",
    about = "Tab'd native messaging host: keeps the latest clipboard snapshot encrypted at rest",
    version,
    propagate_version = true
)]
pub struct Cli {
    /// Installation directory holding the root secret and records (default: ~/.tabd).
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Storage backend: file, auto or vault.
    #[arg(long, global = true)]
    pub backend: Option<BackendPreference>,

    /// Optional subcommand; defaults to the native messaging loop when absent.
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Serve native messaging frames on stdin/stdout.
    Host,
    /// Print the latest stored clipboard snapshot as JSON.
    #[command(name = "getclipboard", alias = "get-clipboard")]
    GetClipboard,
    /// Delete the stored clipboard snapshot.
    Clear,
    /// Run a store/retrieve/delete round trip against the selected backend.
    Health,
    /// Print version and exit.
    Version,
    /// Manage configuration.
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConfigCommand {
    /// Create a default config file if one does not exist.
    Init,
}

impl Cli {
    /// Parse process arguments, treating a browser launch as the host loop.
    pub fn from_args(args: Vec<String>) -> Self {
        if launched_by_browser(&args) {
            return Self::host_only();
        }
        Self::parse_from(args)
    }

    fn host_only() -> Self {
        Self {
            data_dir: None,
            backend: None,
            command: Some(Command::Host),
        }
    }
}

/// Browsers pass the caller origin (Chrome), or the manifest path and
/// extension id (Firefox), and on Windows a `--parent-window=` handle.
fn launched_by_browser(args: &[String]) -> bool {
    args.get(1).is_some_and(|first| {
        first.starts_with("chrome-extension://")
            || first.starts_with("--parent-window=")
            || first.ends_with(".json")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn defaults_to_host_when_missing_subcommand() {
        let cli = Cli::try_parse_from(["tabd-native-host"]).expect("parse should succeed");
        assert_eq!(cli.command, None);
    }

    #[test]
    fn parses_getclipboard_subcommand() {
        let cli =
            Cli::try_parse_from(["tabd-native-host", "getclipboard"]).expect("parse should succeed");
        assert_eq!(cli.command, Some(Command::GetClipboard));
    }

    #[test]
    fn parses_config_init_subcommand() {
        let cli = Cli::try_parse_from(["tabd-native-host", "config", "init"])
            .expect("parse should succeed");
        assert_eq!(cli.command, Some(Command::Config(ConfigCommand::Init)));
    }

    #[test]
    fn parses_global_overrides() {
        let cli = Cli::try_parse_from([
            "tabd-native-host",
            "health",
            "--backend",
            "auto",
            "--data-dir",
            "/tmp/tabd",
        ])
        .expect("parse should succeed");
        assert_eq!(cli.command, Some(Command::Health));
        assert_eq!(cli.backend, Some(BackendPreference::Auto));
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/tabd")));
    }

    #[test]
    fn rejects_unknown_backend() {
        assert!(Cli::try_parse_from(["tabd-native-host", "--backend", "cloud"]).is_err());
    }

    #[test]
    fn chrome_launch_runs_host() {
        let cli = Cli::from_args(args(&["tabd-native-host", "chrome-extension://abcdef/"]));
        assert_eq!(cli.command, Some(Command::Host));
    }

    #[test]
    fn firefox_launch_runs_host() {
        let cli = Cli::from_args(args(&[
            "tabd-native-host",
            "/usr/lib/mozilla/native-messaging-hosts/tabd.json",
            "tabd@example.com",
        ]));
        assert_eq!(cli.command, Some(Command::Host));
    }
}
