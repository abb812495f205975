use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::RenderOptions;
use crate::error::{Error, Result};
use crate::segment::SegmentSelection;

/// Sample rate the speech recognizer expects.
pub const RECOGNIZER_SAMPLE_RATE: u32 = 16_000;

/// Audio extraction and final rendering.
#[async_trait]
pub trait Transcoder: Send + Sync {
    async fn ensure_available(&self) -> Result<()> {
        Ok(())
    }

    /// Cut `window` out of `input` as 16 kHz mono 16-bit WAV.
    async fn extract_audio(
        &self,
        input: &Path,
        window: &SegmentSelection,
        output: &Path,
    ) -> Result<()>;

    /// Cut `window` out of `input`, reframe it to portrait and burn in `subtitles`.
    async fn render(
        &self,
        input: &Path,
        window: &SegmentSelection,
        subtitles: &Path,
        output: &Path,
    ) -> Result<()>;
}

/// ffmpeg subprocess transcoder.
#[derive(Debug, Clone)]
pub struct Ffmpeg {
    binary: String,
    render: RenderOptions,
}

impl Ffmpeg {
    pub fn new(render: RenderOptions) -> Self {
        Self {
            binary: "ffmpeg".into(),
            render,
        }
    }

    pub fn binary(mut self, path: impl Into<String>) -> Self {
        self.binary = path.into();
        self
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.kill_on_drop(true)
            .stdin(Stdio::null())
            .args(["-hide_banner", "-nostdin", "-y"]);
        cmd
    }

    /// Video filter chain: fill the frame, crop to it, then burn captions.
    fn video_filters(&self, subtitles: &Path) -> String {
        let RenderOptions { width, height, .. } = &self.render;
        format!(
            "scale={width}:{height}:force_original_aspect_ratio=increase,crop={width}:{height},subtitles={}:force_style='{}'",
            escape_filter_path(subtitles),
            self.render.subtitle_style.to_force_style()
        )
    }

    fn render_args(&self, window: &SegmentSelection, subtitles: &Path) -> Vec<String> {
        let r = &self.render;
        let mut args = seek_args(window);
        args.extend(["-vf".into(), self.video_filters(subtitles)]);
        args.extend([
            "-c:v".into(),
            r.video_codec.clone(),
            "-b:v".into(),
            r.video_bitrate.clone(),
            "-r".into(),
            r.fps.to_string(),
            "-preset".into(),
            r.preset.clone(),
            "-crf".into(),
            r.crf.to_string(),
            "-c:a".into(),
            r.audio_codec.clone(),
            "-b:a".into(),
            r.audio_bitrate.clone(),
            "-movflags".into(),
            "+faststart".into(),
        ]);
        args
    }

    async fn run(&self, mut cmd: Command, what: &str) -> Result<()> {
        let output = cmd.output().await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::FfmpegNotFound,
            _ => Error::Transcode(format!("failed to run ffmpeg for {what}: {e}")),
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            // the tail of ffmpeg's log carries the actual error
            let tail: String = {
                let chars: Vec<char> = stderr.chars().collect();
                chars[chars.len().saturating_sub(1000)..].iter().collect()
            };
            return Err(Error::Transcode(format!("ffmpeg {what} failed: {tail}")));
        }
        Ok(())
    }
}

impl Default for Ffmpeg {
    fn default() -> Self {
        Self::new(RenderOptions::default())
    }
}

/// `-ss` before `-i` seeks the input; `-t` bounds the output length.
fn seek_args(window: &SegmentSelection) -> Vec<String> {
    vec![
        "-ss".into(),
        format!("{:.3}", window.start),
        "-t".into(),
        format!("{:.3}", window.duration()),
    ]
}

/// Escape a path for use as a filter option value inside a filter graph.
///
/// ffmpeg unescapes twice: once when splitting the graph into filters, then
/// again when splitting a filter's arguments into options.
fn escape_filter_path(path: &Path) -> String {
    let option_value = backslash_escape(&path.to_string_lossy(), &['\\', ':', '\'']);
    backslash_escape(&option_value, &['\\', '\'', '[', ']', ',', ';'])
}

fn backslash_escape(raw: &str, special: &[char]) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if special.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[async_trait]
impl Transcoder for Ffmpeg {
    async fn ensure_available(&self) -> Result<()> {
        let output = Command::new(&self.binary)
            .arg("-version")
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|_| Error::FfmpegNotFound)?;
        if !output.status.success() {
            return Err(Error::FfmpegNotFound);
        }
        debug!("ffmpeg available");
        Ok(())
    }

    async fn extract_audio(
        &self,
        input: &Path,
        window: &SegmentSelection,
        output: &Path,
    ) -> Result<()> {
        info!(
            input = %input.display(),
            start = window.start,
            duration = window.duration(),
            "extracting audio"
        );
        let sample_rate = RECOGNIZER_SAMPLE_RATE.to_string();
        let mut cmd = self.command();
        cmd.args(seek_args(window))
            .arg("-i")
            .arg(input)
            .args(["-vn", "-ac", "1", "-ar", sample_rate.as_str()])
            .args(["-acodec", "pcm_s16le", "-f", "wav"])
            .arg(output);
        self.run(cmd, "audio extraction").await?;
        debug!(path = %output.display(), "audio extracted");
        Ok(())
    }

    async fn render(
        &self,
        input: &Path,
        window: &SegmentSelection,
        subtitles: &Path,
        output: &Path,
    ) -> Result<()> {
        info!(
            input = %input.display(),
            output = %output.display(),
            width = self.render.width,
            height = self.render.height,
            "rendering clip"
        );
        let args = self.render_args(window, subtitles);
        let (seek, rest) = args.split_at(4);
        let mut cmd = self.command();
        cmd.args(seek).arg("-i").arg(input).args(rest).arg(output);
        self.run(cmd, "render").await?;
        debug!(path = %output.display(), "clip rendered");
        Ok(())
    }
}
