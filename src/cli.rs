//! Command-line interface for minutes
//!
//! Provides argument parsing using clap derive macros.

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// Meeting transcription with summaries and action items
#[derive(Parser, Debug)]
#[command(
    name = "minutes",
    version,
    about = "Meeting transcription with summaries and action items"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose logging (-v: debug for minutes, -vv: trace everything)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Whisper model (default: tiny). Clamped to stt.max_model
    #[arg(long, global = true, value_name = "MODEL")]
    pub model: Option<String>,

    /// Language code for transcription (default: auto-detect). Examples: auto, en, de
    #[arg(long, global = true, value_name = "LANG")]
    pub language: Option<String>,

    /// Upload size ceiling in megabytes (default: 5)
    #[arg(long, global = true, value_name = "MB")]
    pub max_audio_mb: Option<f64>,

    /// Load the text model for summaries (off by default on small hosts)
    #[arg(long, global = true)]
    pub summarize: bool,

    /// Fail at startup when no transcription engine loads
    #[arg(long, global = true)]
    pub strict: bool,

    /// Abort a run after this long. Examples: 90s, 5m, 1h30m
    #[arg(long, global = true, value_name = "DURATION", value_parser = parse_timeout_secs)]
    pub timeout: Option<u64>,
}

/// Parse a timeout string into seconds.
///
/// Supports any duration format accepted by `humantime`: bare numbers (seconds),
/// single-unit (`30s`, `5m`, `2h`), and compound (`1h30m`, `2m30s`).
fn parse_timeout_secs(s: &str) -> Result<u64, String> {
    let s = s.trim();
    // Bare number → seconds
    let secs = match s.parse::<u64>() {
        Ok(secs) => secs,
        Err(_) => humantime::parse_duration(s)
            .map(|d| d.as_secs())
            .map_err(|e| e.to_string())?,
    };
    if secs == 0 {
        return Err("timeout must be at least one second".to_string());
    }
    Ok(secs)
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Transcribe a recording, then summarize it and extract action items
    Process {
        /// Audio file (wav, mp3, m4a, flac, ogg, webm)
        #[arg(value_name = "AUDIO")]
        audio: PathBuf,

        /// Meeting title used when exporting
        #[arg(long, value_name = "TITLE")]
        title: Option<String>,

        /// Create a Notion page from the result
        #[arg(long)]
        export: bool,
    },

    /// Transcribe a recording only
    Transcribe {
        /// Audio file
        #[arg(value_name = "AUDIO")]
        audio: PathBuf,
    },

    /// Summarize an existing transcript and extract action items
    Analyze {
        /// Text file with the transcript (default: stdin)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Create a Notion page from meeting notes JSON
    Export {
        /// Notes file as printed by `process --json` (default: stdin)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,

        /// Override the meeting title
        #[arg(long, value_name = "TITLE")]
        title: Option<String>,
    },

    /// Verify the Notion token and database
    CheckNotion,

    /// Load backends and report which engines are available
    Health,

    /// List transcription and text models
    Models,

    /// Manage configuration
    Config {
        /// Action to perform
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

/// Config management actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,

    /// Print the configuration file path
    Path,
}
