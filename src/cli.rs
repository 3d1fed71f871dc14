//! Command-line interface for racecall
//!
//! Provides argument parsing using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

/// Live voice race commentary for transponder lap timing
#[derive(Parser, Debug)]
#[command(
    name = "racecall",
    version,
    about = "Live voice race commentary for transponder lap timing"
)]
pub struct Cli {
    /// Subcommand to execute (default: run)
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Suppress status output (quiet mode)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Watch the decoder bridge and speak live commentary (default)
    Run {
        /// Event source endpoint override
        #[arg(long, value_name = "URL")]
        source_url: Option<String>,

        /// Poll interval override. Examples: 500ms, 1s, 5s
        #[arg(long, value_name = "DURATION", value_parser = parse_poll_interval)]
        poll: Option<Duration>,

        /// Speech engine override (auto, remote, spd, espeak, none)
        #[arg(long, value_name = "ENGINE")]
        engine: Option<String>,

        /// Disable voice output entirely
        #[arg(long)]
        no_voice: bool,
    },

    /// Replay a JSONL pass-event file and print the standings
    Replay {
        /// Path to the pass-event file (one JSON object per line)
        file: PathBuf,
    },

    /// Speak one utterance through the engine fallback chain
    Speak {
        /// Text to speak
        text: String,

        /// Speech engine override (auto, remote, spd, espeak, none)
        #[arg(long, value_name = "ENGINE")]
        engine: Option<String>,
    },

    /// Probe the TTS engine tiers and report availability
    Engines,

    /// Show or initialize the configuration file
    Config {
        /// Action to perform
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommand actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
    /// Write a default configuration file
    Init,
}

/// Parse a poll interval, accepting bare seconds or humantime strings.
fn parse_poll_interval(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if let Ok(secs) = s.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }
    humantime::parse_duration(s).map_err(|e| e.to_string())
}
