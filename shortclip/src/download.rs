use std::path::Path;
use std::process::Stdio;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::types::VideoInfo;

/// Where source videos come from.
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// Check that the backing tool is usable.
    async fn ensure_available(&self) -> Result<()> {
        Ok(())
    }

    /// Fetch metadata without downloading media.
    async fn probe(&self, url: &str) -> Result<VideoInfo>;

    /// Download the media to `dest`. The file is complete when this returns.
    async fn fetch(&self, url: &str, dest: &Path) -> Result<()>;
}

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Lowest quality stream that still carries both audio and video.
const FORMAT_SELECTOR: &str = "worst[acodec!=none][vcodec!=none]/worst";

/// stderr fragments yt-dlp prints when YouTube refuses or throttles us.
const ACCESS_BLOCKED_MARKERS: &[&str] = &[
    "HTTP Error 403",
    "HTTP Error 429",
    "Sign in to confirm",
    "not a bot",
    "Too Many Requests",
];

static VIDEO_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?:youtube\.com/(?:shorts/|[^/]+/.+/|(?:v|e(?:mbed)?)/|.*[?&]v=)|youtu\.be/)([^"&?/\s]{11})"#,
    )
    .expect("valid video id pattern")
});

/// Extract the 11-character YouTube video ID from a URL.
pub fn extract_video_id(url: &str) -> Option<String> {
    VIDEO_ID
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Check that the input is an http(s) YouTube URL and return its video ID.
pub fn validate_url(url: &str) -> Result<String> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(Error::MissingUrl);
    }
    if !(trimmed.starts_with("https://") || trimmed.starts_with("http://")) {
        return Err(Error::InvalidUrl(trimmed.to_string()));
    }
    extract_video_id(trimmed).ok_or_else(|| Error::InvalidUrl(trimmed.to_string()))
}

/// Classify a failed yt-dlp run from its stderr.
fn classify_failure(stderr: &str) -> Error {
    let truncated: String = stderr.chars().take(1000).collect();
    if ACCESS_BLOCKED_MARKERS.iter().any(|m| stderr.contains(m)) {
        Error::AccessBlocked(truncated)
    } else {
        Error::Download(format!("yt-dlp failed: {truncated}"))
    }
}

#[derive(Deserialize)]
struct YtDlpInfo {
    id: Option<String>,
    title: Option<String>,
    channel: Option<String>,
    uploader: Option<String>,
    duration: Option<f64>,
}

impl YtDlpInfo {
    fn into_video_info(self, fallback_id: String) -> VideoInfo {
        VideoInfo {
            source_id: self.id.unwrap_or(fallback_id),
            title: self.title.unwrap_or_else(|| "YouTube video".into()),
            channel: self.channel.or(self.uploader),
            duration_secs: self.duration.filter(|d| d.is_finite() && *d > 0.0),
        }
    }
}

/// yt-dlp backed media source.
#[derive(Debug, Clone)]
pub struct YtDlp {
    binary: String,
}

impl Default for YtDlp {
    fn default() -> Self {
        Self {
            binary: "yt-dlp".into(),
        }
    }
}

impl YtDlp {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific yt-dlp executable.
    pub fn binary(mut self, path: impl Into<String>) -> Self {
        self.binary = path.into();
        self
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.kill_on_drop(true).stdin(Stdio::null());
        cmd
    }
}

#[async_trait]
impl MediaSource for YtDlp {
    async fn ensure_available(&self) -> Result<()> {
        let output = self
            .command()
            .arg("--version")
            .output()
            .await
            .map_err(|_| Error::YtDlpNotFound)?;
        if !output.status.success() {
            return Err(Error::YtDlpNotFound);
        }
        debug!(
            version = %String::from_utf8_lossy(&output.stdout).trim(),
            "yt-dlp available"
        );
        Ok(())
    }

    async fn probe(&self, url: &str) -> Result<VideoInfo> {
        let video_id = validate_url(url)?;
        info!(%url, "probing video");

        let output = self
            .command()
            .args([
                "--dump-json",
                "--no-download",
                "--no-playlist",
                "--no-exec",
                "--user-agent",
                USER_AGENT,
            ])
            .arg(url.trim())
            .output()
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => Error::YtDlpNotFound,
                _ => Error::Io(e),
            })?;

        if !output.status.success() {
            return Err(classify_failure(&String::from_utf8_lossy(&output.stderr)));
        }

        let raw: YtDlpInfo = serde_json::from_slice(&output.stdout)?;
        let info = raw.into_video_info(video_id);
        info!(
            title = %info.title,
            duration_secs = ?info.duration_secs,
            "video probed"
        );
        Ok(info)
    }

    async fn fetch(&self, url: &str, dest: &Path) -> Result<()> {
        validate_url(url)?;
        let dest_str = dest
            .to_str()
            .ok_or_else(|| Error::Download("destination path contains invalid UTF-8".into()))?;

        info!(%url, dest = %dest.display(), "downloading video");

        let output = self
            .command()
            .args([
                "--format",
                FORMAT_SELECTOR,
                "--no-playlist",
                "--no-exec",
                "--no-part",
                "--force-overwrites",
                "--user-agent",
                USER_AGENT,
                "--output",
                dest_str,
            ])
            .arg(url.trim())
            .output()
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => Error::YtDlpNotFound,
                _ => Error::Io(e),
            })?;

        if !output.status.success() {
            let err = classify_failure(&String::from_utf8_lossy(&output.stderr));
            warn!(%url, error = %err, "download failed");
            return Err(err);
        }

        let size = tokio::fs::metadata(dest)
            .await
            .map_err(|_| {
                Error::Download(format!("downloaded file not found at {}", dest.display()))
            })?
            .len();
        if size == 0 {
            return Err(Error::Download("downloaded file is empty".into()));
        }

        debug!(path = %dest.display(), size, "video downloaded");
        Ok(())
    }
}
