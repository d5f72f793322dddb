use std::fmt;
use std::path::PathBuf;

/// Extensions the separation API accepts, lowercase and without the dot.
pub const ACCEPTED_EXTENSIONS: [&str; 5] = ["mp3", "wav", "m4a", "flac", "aac"];

/// Largest file the client will upload (50 MiB).
pub const MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;

/// A local file the user picked, before any network call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFile {
    pub path: PathBuf,
    pub file_name: String,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    MissingExtension,
    UnsupportedExtension(String),
    TooLarge { size: u64, max: u64 },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::MissingExtension => {
                write!(f, "Invalid file type. Please select an audio file.")
            }
            ValidationError::UnsupportedExtension(ext) => write!(
                f,
                "Invalid file type .{ext}. Please select an audio file ({}).",
                ACCEPTED_EXTENSIONS.join(", ")
            ),
            ValidationError::TooLarge { .. } => write!(
                f,
                "File too large. Please select a file smaller than {}MB.",
                MAX_UPLOAD_BYTES / (1024 * 1024)
            ),
        }
    }
}

/// Checks extension and size; the extension check wins when both fail.
pub fn validate_candidate(file: &CandidateFile) -> Result<(), ValidationError> {
    let ext = match file.file_name.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => ext.to_ascii_lowercase(),
        _ => return Err(ValidationError::MissingExtension),
    };
    if !ACCEPTED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(ValidationError::UnsupportedExtension(ext));
    }
    if file.size_bytes > MAX_UPLOAD_BYTES {
        return Err(ValidationError::TooLarge {
            size: file.size_bytes,
            max: MAX_UPLOAD_BYTES,
        });
    }
    Ok(())
}
