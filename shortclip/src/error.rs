use std::path::PathBuf;
use std::time::Duration;

/// All errors that can occur in shortclip.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("missing URL")]
    MissingUrl,

    #[error("invalid YouTube URL: {0}")]
    InvalidUrl(String),

    #[error("invalid duration: {0} (must be a positive number of seconds)")]
    InvalidDuration(f64),

    #[error("invalid option: {0}")]
    InvalidOption(String),

    #[error("access blocked by upstream source: {0}")]
    AccessBlocked(String),

    #[error("download error: {0}")]
    Download(String),

    #[error("yt-dlp not found: install with pip install yt-dlp")]
    YtDlpNotFound,

    #[error("source duration unknown for {url}")]
    DurationUnknown { url: String },

    #[error("ffmpeg not found: install with apt install ffmpeg")]
    FfmpegNotFound,

    #[error("transcode error: {0}")]
    Transcode(String),

    #[error("audio decoding error: {0}")]
    AudioDecode(String),

    #[error("model error: {0}")]
    Model(String),

    #[error("model not found: {path}")]
    ModelNotFound { path: PathBuf },

    #[error("model download failed: {0}")]
    ModelDownload(String),

    #[error("unsupported language: \"{0}\" (see Language::supported())")]
    UnsupportedLanguage(String),

    #[error("transcription error: {0}")]
    Transcription(String),

    #[error("speech recognizer unavailable: {0}")]
    RecognizerUnavailable(String),

    #[error("job timed out after {}s during {stage}", limit.as_secs())]
    Timeout { limit: Duration, stage: String },

    #[error("whisper error: {0}")]
    Whisper(#[from] whisper_rs::WhisperError),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Coarse failure classes surfaced to callers of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or malformed input. Nothing was allocated.
    Validation,
    /// The upstream source refused or rate-limited access.
    AccessBlocked,
    /// Download, transcoder or recognizer failure.
    Processing,
    /// The job exceeded its wall-clock budget.
    Timeout,
    /// Process-level condition; no further jobs are accepted.
    Fatal,
}

impl ErrorKind {
    pub fn http_status(self) -> u16 {
        match self {
            ErrorKind::Validation => 400,
            ErrorKind::Timeout => 408,
            ErrorKind::AccessBlocked | ErrorKind::Processing | ErrorKind::Fatal => 500,
        }
    }
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::MissingUrl
            | Error::InvalidUrl(_)
            | Error::InvalidDuration(_)
            | Error::InvalidOption(_)
            | Error::UnsupportedLanguage(_) => ErrorKind::Validation,
            Error::AccessBlocked(_) => ErrorKind::AccessBlocked,
            Error::Timeout { .. } => ErrorKind::Timeout,
            Error::RecognizerUnavailable(_) => ErrorKind::Fatal,
            _ => ErrorKind::Processing,
        }
    }

    /// Message suitable for the `error` field of a job response.
    pub fn public_message(&self) -> String {
        match self {
            Error::MissingUrl => "URL is required".into(),
            Error::InvalidUrl(_) => "a valid YouTube URL is required".into(),
            Error::InvalidDuration(_) => "duration must be a positive number of seconds".into(),
            Error::InvalidOption(msg) => format!("invalid option: {msg}"),
            Error::UnsupportedLanguage(lang) => format!("unsupported language: {lang}"),
            Error::AccessBlocked(_) => "YouTube blocked access - try another video".into(),
            Error::Timeout { limit, .. } => format!(
                "timeout - operation took too long (limit {} minutes)",
                limit.as_secs().div_ceil(60)
            ),
            Error::RecognizerUnavailable(_) => {
                "speech recognizer unavailable - service must be restarted".into()
            }
            Error::Io(e) if e.kind() == std::io::ErrorKind::NotFound => {
                "file not found - server error".into()
            }
            _ => "video processing failed - service unavailable".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_map_to_400() {
        for e in [
            Error::MissingUrl,
            Error::InvalidUrl("ftp://nope".into()),
            Error::InvalidDuration(-1.0),
        ] {
            assert_eq!(e.kind(), ErrorKind::Validation);
            assert_eq!(e.kind().http_status(), 400);
        }
    }

    #[test]
    fn test_timeout_maps_to_408() {
        let e = Error::Timeout {
            limit: Duration::from_secs(300),
            stage: "rendering".into(),
        };
        assert_eq!(e.kind(), ErrorKind::Timeout);
        assert_eq!(e.kind().http_status(), 408);
        assert_eq!(
            e.public_message(),
            "timeout - operation took too long (limit 5 minutes)"
        );
        assert!(e.to_string().contains("rendering"));
    }

    #[test]
    fn test_access_blocked_is_distinct_from_processing() {
        let blocked = Error::AccessBlocked("HTTP Error 429".into());
        let generic = Error::Download("connection reset".into());
        assert_eq!(blocked.kind(), ErrorKind::AccessBlocked);
        assert_eq!(generic.kind(), ErrorKind::Processing);
        assert!(blocked.public_message().contains("try another video"));
        assert_eq!(blocked.kind().http_status(), 500);
    }

    #[test]
    fn test_transcoder_and_recognizer_failures_are_processing() {
        assert_eq!(Error::Transcode("boom".into()).kind(), ErrorKind::Processing);
        assert_eq!(Error::Transcription("boom".into()).kind(), ErrorKind::Processing);
        assert_eq!(
            Error::DurationUnknown { url: "u".into() }.kind(),
            ErrorKind::Processing
        );
    }

    #[test]
    fn test_recognizer_unavailable_is_fatal() {
        let e = Error::RecognizerUnavailable("model load failed".into());
        assert_eq!(e.kind(), ErrorKind::Fatal);
        assert_eq!(e.kind().http_status(), 500);
    }

    #[test]
    fn test_error_display_model_not_found() {
        let e = Error::ModelNotFound {
            path: PathBuf::from("/tmp/model.bin"),
        };
        assert!(e.to_string().contains("/tmp/model.bin"));
    }

    #[test]
    fn test_io_not_found_public_message() {
        let e: Error = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(e, Error::Io(_)));
        assert_eq!(e.public_message(), "file not found - server error");
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<String>("invalid json").unwrap_err();
        let e: Error = json_err.into();
        assert!(matches!(e, Error::Json(_)));
        assert_eq!(e.kind(), ErrorKind::Processing);
    }
}
