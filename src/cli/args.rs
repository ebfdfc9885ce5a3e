//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// shellcache - offline cache manager for web application shells
///
/// Prefetches a deployed app's core resources, reconciles the on-disk cache
/// against each new manifest and serves requests cache-first.
#[derive(Parser, Debug)]
#[command(name = "shellcache")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "SHELLCACHE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Manifest JSON file (overrides app.manifest)
    #[arg(short, long, global = true, env = "SHELLCACHE_MANIFEST")]
    pub manifest: Option<PathBuf>,

    /// Serving origin, e.g. https://app.example.com (overrides app.origin)
    #[arg(long, global = true)]
    pub origin: Option<String>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Prefetch core resources into the staging store
    Install,

    /// Reconcile the content store against the manifest
    Activate,

    /// Install then activate
    Deploy,

    /// Serve one URL through the cache
    Fetch(FetchArgs),

    /// Download every manifest resource not yet cached
    DownloadOffline,

    /// Post a message to the worker
    Message(MessageArgs),

    /// Compare the cache against the manifest
    Status(StatusArgs),

    /// Delete the content, staging and manifest stores
    Clear(ClearArgs),

    /// Show or initialize configuration
    Config(ConfigArgs),
}

/// Arguments for the fetch command
#[derive(Parser, Debug)]
pub struct FetchArgs {
    /// Absolute URL to request
    pub url: String,

    /// Write the response body to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for the message command
#[derive(Parser, Debug)]
pub struct MessageArgs {
    /// Message payload: skipWaiting or downloadOffline
    pub payload: String,
}

/// Arguments for the status command
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the clear command
#[derive(Parser, Debug)]
pub struct ClearArgs {
    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Config action
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show,

    /// Show the configuration file path
    Path,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

/// Output format for the status command
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one path per line)
    Plain,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_fetch_with_globals() {
        let cli = Cli::parse_from([
            "shellcache",
            "fetch",
            "https://app.test/main.js",
            "--origin",
            "https://app.test",
            "-o",
            "out.js",
            "-vv",
        ]);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.origin.as_deref(), Some("https://app.test"));
        match cli.command {
            Commands::Fetch(args) => {
                assert_eq!(args.url, "https://app.test/main.js");
                assert_eq!(args.output, Some(PathBuf::from("out.js")));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parse_status_format() {
        let cli = Cli::parse_from(["shellcache", "status", "--format", "json"]);
        assert!(matches!(
            cli.command,
            Commands::Status(StatusArgs {
                format: OutputFormat::Json
            })
        ));
    }

    #[test]
    fn parse_download_offline() {
        let cli = Cli::parse_from(["shellcache", "download-offline"]);
        assert!(matches!(cli.command, Commands::DownloadOffline));
    }
}
