//! Application orchestration and command routing.
//!
//! Handles command-line argument parsing and delegates to appropriate command handlers.

use crate::commands;
use crate::logging;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;
use std::process;

/// Publish audio episodes from the terminal
#[derive(Parser)]
#[command(name = "castup")]
#[command(version)]
#[command(about = "Record, transcode and publish audio episodes from the terminal")]
#[command(
    long_about = "castup acquires audio from a local file, the microphone, or a remote URL,\n\
                  optionally transcodes it to MP3, M4A or HLS with ffmpeg, and publishes it\n\
                  to your episode server through presigned upload URLs.\n\n\
                  DEFAULT COMMAND:\n    \
                  If no command is specified, 'publish' is used by default.\n    \
                  Publish options (--file, --url) can be used without explicitly saying 'publish'.\n\n\
                  EXAMPLES:\n    \
                  # Interactive publish flow\n    \
                  $ castup\n    \
                  \n    \
                  # Publish a local file directly\n    \
                  $ castup --file episode.mp3\n    \
                  $ castup publish --file episode.mp3\n    \
                  \n    \
                  # Publish audio the server fetches from a URL\n    \
                  $ castup --url https://example.com/audio.mp3\n    \
                  \n    \
                  # View published episodes\n    \
                  $ castup history\n    \
                  \n    \
                  # Edit configuration file\n    \
                  $ castup config"
)]
#[command(
    after_help = "CONFIGURATION:\n    Config file:        ~/.config/castup/castup.toml\n    Logs:               ~/.local/state/castup/castup.log.*\n\nFor more information, visit: https://github.com/castup/castup"
)]
struct Cli {
    /// Publish a local audio file (publish default command)
    #[arg(short, long, value_name = "FILE", global = true)]
    file: Option<PathBuf>,

    /// Publish audio from a remote URL (publish default command)
    #[arg(short, long, value_name = "URL", global = true)]
    url: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Acquire, transcode and publish an episode (default)
    ///
    /// Walks through source selection (file / record / URL), the episode
    /// form, optional transcoding, and the upload. With --file or --url the
    /// source picker is skipped.
    #[command(visible_alias = "p")]
    Publish {
        /// Publish a local audio file
        #[arg(short, long, value_name = "FILE")]
        file: Option<PathBuf>,

        /// Publish audio from a remote URL
        #[arg(short, long, value_name = "URL")]
        url: Option<String>,
    },

    /// List previously published episodes
    ///
    /// Shows title, format, public URL and publish time, most recent first.
    #[command(visible_alias = "h")]
    History,

    /// Open configuration file in your preferred editor
    ///
    /// Edit audio, upload and transcode settings.
    /// Uses $EDITOR environment variable or falls back to nano/vim.
    #[command(visible_alias = "c")]
    Config,

    /// List available audio input devices
    ///
    /// Shows device IDs, names, and configurations to help configure
    /// the correct input device in castup.toml.
    #[command(name = "list-devices")]
    ListDevices,

    /// Show recent log entries from the application
    ///
    /// Display the last 50 lines of the most recent log file.
    /// Useful for troubleshooting issues.
    Logs,

    /// Generate shell completion script
    ///
    /// Generate completion script for your shell. Save the output to your
    /// shell's completion directory or source it directly.
    ///
    /// Examples:
    ///   castup completions bash > castup.bash
    ///   castup completions zsh > _castup
    ///   castup completions fish > castup.fish
    Completions {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Runs the main application based on command-line arguments.
///
/// # Exit Codes
/// - 0: Success
/// - 1: General error
/// - 2: Usage error (invalid arguments)
///
/// # Errors
/// - If logging initialization fails
/// - If command execution fails (e.g., publishing, history viewing)
pub async fn run() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    // Handle commands that don't need logging or config setup
    match &cli.command {
        Some(Commands::Completions { shell }) => {
            generate(*shell, &mut Cli::command(), "castup", &mut io::stdout());
            return Ok(());
        }
        Some(Commands::ListDevices) => {
            return match commands::handle_list_devices() {
                Ok(()) => Ok(()),
                Err(e) => {
                    eprintln!("Error: {e}");
                    process::exit(1);
                }
            };
        }
        Some(Commands::Logs) => {
            return match commands::handle_logs() {
                Ok(()) => Ok(()),
                Err(e) => {
                    eprintln!("Error: {e}");
                    process::exit(1);
                }
            };
        }
        _ => {}
    }

    // Initialize logging for all other commands
    logging::init_logging()?;

    // Route to appropriate command handler
    match cli.command {
        None | Some(Commands::Publish { .. }) => {
            // Default command is publish
            // Merge top-level options with explicit publish command options
            // If both are specified, the explicit publish command options take precedence
            let (file, url) = match cli.command {
                Some(Commands::Publish { file, url }) => (file, url),
                None => (cli.file, cli.url),
                _ => unreachable!(),
            };
            if let Err(e) = commands::handle_publish(file, url).await {
                // Check if it's a cancellation error (cliclack already displayed the message)
                let err_msg = e.to_string();
                if err_msg.contains("cancelled") || err_msg.contains("interrupted") {
                    // Silent exit - cliclack already showed "Operation cancelled"
                    process::exit(0);
                } else {
                    return Err(e);
                }
            }
        }
        Some(Commands::History) => {
            commands::handle_history().await?;
        }
        Some(Commands::Config) => {
            commands::handle_config()?;
        }
        Some(Commands::Completions { .. }) | Some(Commands::ListDevices) | Some(Commands::Logs) => {
            unreachable!("These commands are handled earlier")
        }
    }

    Ok(())
}
