//! Command line parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use splitter_logging::DEFAULT_LOG_FILE;

/// stem-splitter - client for the audio stem separation service
///
/// Uploads a track, drives the separation job until it finishes and shows
/// the resulting stems, their quality metrics and the job history.
#[derive(Parser, Debug)]
#[command(name = "stem-splitter")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// RON config file (defaults to ./stem-splitter.ron when present)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Base URL of the separation API
    #[arg(long, global = true, value_name = "URL")]
    pub api_url: Option<String>,

    /// Directory downloaded stems are saved to
    #[arg(long, global = true, value_name = "DIR")]
    pub download_dir: Option<PathBuf>,

    /// Give up on a request after this many seconds
    #[arg(long, global = true, value_name = "SECS")]
    pub request_timeout_secs: Option<u64>,

    /// Audio player command line; the stem file is appended
    #[arg(long, global = true, value_name = "CMD")]
    pub player: Option<String>,

    /// Also write logs to a file
    #[arg(
        long,
        global = true,
        value_name = "PATH",
        num_args = 0..=1,
        default_missing_value = DEFAULT_LOG_FILE
    )]
    pub log_file: Option<PathBuf>,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Upload a track and follow its separation to the end
    Separate {
        /// Audio file (mp3, wav, m4a, flac or aac, at most 50 MB)
        file: PathBuf,
    },
    /// List previously processed jobs
    Jobs,
    /// Check whether the API is reachable
    Health,
    /// Save one stem of a finished job
    Download { job_id: String, stem: String },
    /// Play one stem of a finished job
    Play { job_id: String, stem: String },
    /// Print the URL serving a stem
    Url { job_id: String, stem: String },
}

impl Cli {
    /// Player argv split on whitespace, if one was given.
    pub fn player_argv(&self) -> Option<Vec<String>> {
        self.player
            .as_deref()
            .map(|line| line.split_whitespace().map(ToOwned::to_owned).collect())
    }
}
