//! netmanager CLI - Command-line interface
//!
//! Thin front end over the netmanager library: download a URL with a
//! progress bar, fetch a JSON document, or list the error codes. The process
//! exit code of a failed network operation is its network error code.
//!
//! ```bash
//! netmanager get https://example.com/file.bin -o file.bin
//! netmanager json https://example.com/api/status --header "Accept: application/json"
//! netmanager codes
//! ```

mod commands;
mod error;

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use console::style;
use tracing_subscriber::EnvFilter;

use commands::common::{load_config, RequestArgs};
use commands::get::GetArgs;
use error::CliError;

#[derive(Parser, Debug)]
#[command(name = "netmanager")]
#[command(version)]
#[command(about = "Asynchronous HTTP downloads with progress and error codes", long_about = None)]
struct Cli {
    /// INI configuration file with a [network] section
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Download a URL, writing the body to a file or stdout
    Get {
        url: String,

        /// Write the body to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Timeout for the whole operation, in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Extra request header as NAME:VALUE (repeatable)
        #[arg(long = "header", value_name = "NAME:VALUE")]
        headers: Vec<String>,
    },

    /// Fetch a URL and pretty-print the JSON body
    Json {
        url: String,

        /// Timeout for the whole operation, in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Extra request header as NAME:VALUE (repeatable)
        #[arg(long = "header", value_name = "NAME:VALUE")]
        headers: Vec<String>,
    },

    /// List network error codes and their meaning
    Codes,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("{} {}", style("Error:").red().bold(), e);
        if let CliError::Network(ref network) = e {
            eprintln!("Error code: {}", network.code());
        }
        std::process::exit(e.exit_code());
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Codes => {
            commands::codes::run();
            Ok(())
        }
        Commands::Get {
            url,
            output,
            timeout,
            headers,
        } => {
            let config = load_config(cli.config.as_deref())?;
            let args = GetArgs {
                request: RequestArgs {
                    url,
                    timeout,
                    headers,
                },
                output,
            };
            runtime()?.block_on(commands::get::run(config, args))
        }
        Commands::Json {
            url,
            timeout,
            headers,
        } => {
            let config = load_config(cli.config.as_deref())?;
            let args = RequestArgs {
                url,
                timeout,
                headers,
            };
            runtime()?.block_on(commands::json::run(config, args))
        }
    }
}

fn runtime() -> Result<tokio::runtime::Runtime, CliError> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::io("Failed to start async runtime", e))
}

/// Log to stderr so stdout stays clean for downloaded bodies.
///
/// `RUST_LOG` takes precedence over `-v`.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("netmanager={level},netmanager_cli={level}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_get_with_headers() {
        let cli = Cli::try_parse_from([
            "netmanager",
            "-vv",
            "get",
            "https://example.com/a.bin",
            "-o",
            "a.bin",
            "--header",
            "Accept: */*",
            "--header",
            "X-Trace: 1",
            "--timeout",
            "5",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Get {
                url,
                output,
                timeout,
                headers,
            } => {
                assert_eq!(url, "https://example.com/a.bin");
                assert_eq!(output, Some(PathBuf::from("a.bin")));
                assert_eq!(timeout, Some(5));
                assert_eq!(headers.len(), 2);
            }
            other => panic!("Expected Get, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_global_config_after_subcommand() {
        let cli =
            Cli::try_parse_from(["netmanager", "json", "http://x/", "--config", "net.ini"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("net.ini")));
    }
}
