use std::io::Write;
use std::path::Path;
use std::process::Stdio;

use splitter_logging::splitter_info;

use crate::{ApiError, FailureKind};

/// External program used to play a stem, e.g. `ffplay -nodisp -autoexit`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerCommand {
    program: String,
    args: Vec<String>,
}

impl PlayerCommand {
    /// `None` when `argv` is empty.
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    /// Runs the player on `path` and waits for it to exit.
    pub async fn play_file(&self, path: &Path) -> Result<(), ApiError> {
        splitter_info!("Playing {} with {}", path.display(), self.program);
        let status = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .arg(path)
            .stdin(Stdio::null())
            .status()
            .await
            .map_err(|err| {
                ApiError::new(
                    FailureKind::Playback,
                    format!("could not launch {}: {err}", self.program),
                )
            })?;
        if !status.success() {
            return Err(ApiError::new(
                FailureKind::Playback,
                format!("{} exited with {status}", self.program),
            ));
        }
        Ok(())
    }

    /// Writes `audio` to a temporary file and plays it; the file is removed afterwards.
    pub async fn play_bytes(&self, audio: &[u8]) -> Result<(), ApiError> {
        let mut tmp = tempfile::Builder::new()
            .prefix("stem-")
            .suffix(".wav")
            .tempfile()
            .map_err(|err| ApiError::new(FailureKind::Io, err.to_string()))?;
        tmp.write_all(audio)
            .and_then(|()| tmp.flush())
            .map_err(|err| ApiError::new(FailureKind::Io, err.to_string()))?;
        self.play_file(tmp.path()).await
    }
}
