use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::segment::SegmentSelection;

/// A timed slice of recognizer output. Either timestamp may be missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionChunk {
    pub start: Option<f64>,
    pub end: Option<f64>,
    pub text: String,
}

impl TranscriptionChunk {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
            text: text.into(),
        }
    }
}

/// Recognizer output for the selected segment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionResult {
    pub text: String,
    #[serde(default)]
    pub chunks: Vec<TranscriptionChunk>,
}

impl TranscriptionResult {
    /// Text only, no timing.
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            chunks: Vec::new(),
        }
    }
}

/// One caption cue. Times are relative to the start of the selected segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionCue {
    /// 1-based position in the cue sequence.
    pub index: usize,
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// Metadata reported by media probing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    pub source_id: String,
    pub title: String,
    pub channel: Option<String>,
    /// Total length in seconds, when the source reports one.
    pub duration_secs: Option<f64>,
}

/// A job submission.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobRequest {
    pub url: Option<String>,
    pub duration: Option<f64>,
}

impl JobRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            duration: None,
        }
    }

    pub fn duration(mut self, secs: f64) -> Self {
        self.duration = Some(secs);
        self
    }
}

/// Result of a completed job.
#[derive(Debug, Clone)]
pub struct ClipOutput {
    pub output_path: PathBuf,
    pub download_url: String,
    pub transcription: String,
    pub video_title: String,
    pub requested_duration: f64,
    pub segment: SegmentSelection,
    pub cue_count: usize,
}

impl ClipOutput {
    pub fn to_response(&self) -> JobResponse {
        JobResponse::Success(ClipSummary {
            success: true,
            download_url: self.download_url.clone(),
            transcription: self.transcription.clone(),
            video_title: self.video_title.clone(),
            duration: self.requested_duration,
            segment: self.segment.label(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipSummary {
    pub success: bool,
    pub download_url: String,
    pub transcription: String,
    pub video_title: String,
    pub duration: f64,
    /// `<start>s-<end>s`, one decimal place each.
    pub segment: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureBody {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Wire shape returned to whoever submitted a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JobResponse {
    Success(ClipSummary),
    Failure(FailureBody),
}

impl JobResponse {
    pub fn failure(error: impl Into<String>, details: Option<String>) -> Self {
        JobResponse::Failure(FailureBody {
            success: false,
            error: error.into(),
            details,
        })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, JobResponse::Success(_))
    }
}

/// Response of a video lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoInfoResponse {
    pub success: bool,
    pub title: String,
    pub channel: Option<String>,
    pub video_id: String,
}

impl From<VideoInfo> for VideoInfoResponse {
    fn from(info: VideoInfo) -> Self {
        Self {
            success: true,
            title: info.title,
            channel: info.channel,
            video_id: info.source_id,
        }
    }
}
