//! YouTube video in, captioned vertical short out.
//!
//! **shortclip** runs the whole job: probing and downloading (via yt-dlp),
//! picking a random window of the requested length, extracting its audio and
//! transcribing it (via whisper.cpp), cutting the transcript into short
//! burn-in captions, and rendering a 1080x1920 clip with the captions baked
//! in (via ffmpeg).
//!
//! # Quick start
//!
//! ```rust,no_run
//! # #[tokio::main]
//! # async fn main() -> shortclip::Result<()> {
//! let clip = shortclip::create_clip("https://www.youtube.com/watch?v=dQw4w9WgXcQ").await?;
//! println!("{} ({})", clip.output_path.display(), clip.segment.label());
//! # Ok(())
//! # }
//! ```
//!
//! For more than one job, build a [`Pipeline`] once and reuse it so the
//! speech model is loaded a single time.

pub(crate) mod audio;
pub mod captions;
pub mod config;
pub mod download;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod recognizer;
pub mod segment;
pub mod subtitle;
pub mod transcode;
pub mod types;

pub use config::{
    CaptionOptions, Language, Model, PipelineConfig, RecognizerOptions, RenderOptions,
    SubtitleStyle,
};
pub use error::{Error, ErrorKind, Result};
pub use pipeline::{JobStage, Pipeline};
pub use segment::SegmentSelection;
pub use types::{
    CaptionCue, ClipOutput, JobRequest, JobResponse, TranscriptionChunk, TranscriptionResult,
    VideoInfo,
};

/// Make one clip of the default length with default settings.
pub async fn create_clip(url: &str) -> Result<ClipOutput> {
    create_clip_with_config(url, PipelineConfig::default()).await
}

/// Make one clip with custom settings.
pub async fn create_clip_with_config(url: &str, config: PipelineConfig) -> Result<ClipOutput> {
    let pipeline = Pipeline::from_config(config);
    pipeline.setup().await?;
    pipeline.run(&JobRequest::new(url)).await
}
