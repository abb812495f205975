//! Job orchestration: download, pick a segment, extract audio, transcribe,
//! caption, render, clean up.
//!
//! Stages run strictly in order. Any failure aborts the job and goes straight
//! to cleanup; nothing is retried. The whole job runs under a wall-clock
//! budget, and temporary files are removed even when that budget cancels an
//! in-flight stage.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::watch;
use tracing::{info, warn};

use crate::audio;
use crate::captions;
use crate::config::PipelineConfig;
use crate::download::{validate_url, MediaSource, YtDlp};
use crate::error::{Error, Result};
use crate::recognizer::{RecognizerManager, WhisperLoader};
use crate::segment::SegmentSelection;
use crate::subtitle;
use crate::transcode::{Ffmpeg, Transcoder};
use crate::types::{ClipOutput, JobRequest, JobResponse, VideoInfo};

/// Where a job currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStage {
    Received,
    Downloading,
    SegmentSelected,
    ExtractingAudio,
    Transcribing,
    GeneratingCaptions,
    Rendering,
    CleaningUp,
    Completed,
    Failed,
}

impl JobStage {
    pub fn label(self) -> &'static str {
        match self {
            JobStage::Received => "received",
            JobStage::Downloading => "downloading",
            JobStage::SegmentSelected => "segment selected",
            JobStage::ExtractingAudio => "extracting audio",
            JobStage::Transcribing => "transcribing",
            JobStage::GeneratingCaptions => "generating captions",
            JobStage::Rendering => "rendering",
            JobStage::CleaningUp => "cleaning up",
            JobStage::Completed => "completed",
            JobStage::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobStage::Completed | JobStage::Failed)
    }
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A validated request.
struct JobSpec {
    url: String,
    name: String,
    duration: f64,
}

/// Files owned by one job. Dropping removes the temporaries, and the output
/// too unless the job finished.
struct JobFiles {
    video: PathBuf,
    audio: PathBuf,
    subtitles: PathBuf,
    output: PathBuf,
    keep_output: bool,
}

impl JobFiles {
    fn new(config: &PipelineConfig, name: &str) -> Self {
        Self {
            video: config.temp_dir.join(format!("{name}.mp4")),
            audio: config.temp_dir.join(format!("{name}_audio.wav")),
            subtitles: config.temp_dir.join(format!("{name}.srt")),
            output: config.output_dir.join(format!("tiktok_{name}.mp4")),
            keep_output: false,
        }
    }

    fn keep_output(&mut self) {
        self.keep_output = true;
    }
}

impl Drop for JobFiles {
    fn drop(&mut self) {
        remove_quietly(&self.video);
        remove_quietly(&self.audio);
        remove_quietly(&self.subtitles);
        if !self.keep_output {
            remove_quietly(&self.output);
        }
    }
}

fn remove_quietly(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "failed to clean up file"),
    }
}

/// `<videoId>_<unix millis>`, restricted to filename-safe characters.
fn job_name(video_id: &str) -> String {
    let id: String = video_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    format!("{id}_{millis}")
}

fn choose_segment(total: f64, requested: f64) -> SegmentSelection {
    let mut rng = rand::thread_rng();
    SegmentSelection::choose(total, requested, &mut rng)
}

pub struct Pipeline<M = YtDlp, T = Ffmpeg> {
    config: PipelineConfig,
    media: M,
    transcoder: T,
    recognizer: RecognizerManager,
}

impl Pipeline<YtDlp, Ffmpeg> {
    /// yt-dlp, ffmpeg and whisper, configured from `config`.
    pub fn from_config(config: PipelineConfig) -> Self {
        let transcoder = Ffmpeg::new(config.render.clone());
        let recognizer = RecognizerManager::new(WhisperLoader::new(config.recognizer.clone()));
        Self::new(config, YtDlp::new(), transcoder, recognizer)
    }
}

impl<M: MediaSource, T: Transcoder> Pipeline<M, T> {
    pub fn new(
        config: PipelineConfig,
        media: M,
        transcoder: T,
        recognizer: RecognizerManager,
    ) -> Self {
        Self {
            config,
            media,
            transcoder,
            recognizer,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// False once the recognizer has failed to initialise.
    pub fn is_accepting(&self) -> bool {
        !self.recognizer.is_poisoned()
    }

    /// Create working directories and check external tools. Idempotent.
    pub async fn setup(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.config.temp_dir).await?;
        tokio::fs::create_dir_all(&self.config.output_dir).await?;
        self.media.ensure_available().await?;
        self.transcoder.ensure_available().await?;
        info!(
            temp_dir = %self.config.temp_dir.display(),
            output_dir = %self.config.output_dir.display(),
            "pipeline ready"
        );
        Ok(())
    }

    /// Look up a video without processing it.
    pub async fn video_info(&self, url: &str) -> Result<VideoInfo> {
        validate_url(url)?;
        self.media.probe(url).await
    }

    /// Run one job and answer it as an HTTP endpoint would.
    pub async fn handle(&self, request: JobRequest) -> (u16, JobResponse) {
        self.respond(self.run(&request).await)
    }

    /// Map a job outcome to an HTTP status and response body.
    pub fn respond(&self, result: Result<ClipOutput>) -> (u16, JobResponse) {
        match result {
            Ok(output) => (200, output.to_response()),
            Err(e) => {
                let details = self.config.expose_error_details.then(|| e.to_string());
                (
                    e.kind().http_status(),
                    JobResponse::failure(e.public_message(), details),
                )
            }
        }
    }

    pub async fn run(&self, request: &JobRequest) -> Result<ClipOutput> {
        let (progress, _) = watch::channel(JobStage::Received);
        self.run_with_progress(request, &progress).await
    }

    /// Run one job, publishing each stage transition on `progress`.
    pub async fn run_with_progress(
        &self,
        request: &JobRequest,
        progress: &watch::Sender<JobStage>,
    ) -> Result<ClipOutput> {
        progress.send_replace(JobStage::Received);
        let result = self.run_guarded(request, progress).await;
        match &result {
            Ok(output) => {
                info!(output = %output.output_path.display(), "job completed");
                progress.send_replace(JobStage::Completed);
            }
            Err(e) => {
                warn!(error = %e, stage = %*progress.borrow(), "job failed");
                progress.send_replace(JobStage::Failed);
            }
        }
        result
    }

    async fn run_guarded(
        &self,
        request: &JobRequest,
        progress: &watch::Sender<JobStage>,
    ) -> Result<ClipOutput> {
        if self.recognizer.is_poisoned() {
            return Err(Error::RecognizerUnavailable(
                "recognizer failed to initialise earlier in this process".into(),
            ));
        }

        let job = self.validate(request)?;
        info!(job = %job.name, url = %job.url, duration = job.duration, "job received");

        match tokio::time::timeout(self.config.job_timeout, self.execute(&job, progress)).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout {
                limit: self.config.job_timeout,
                stage: progress.borrow().to_string(),
            }),
        }
    }

    fn validate(&self, request: &JobRequest) -> Result<JobSpec> {
        let url = request.url.as_deref().unwrap_or_default().trim();
        let video_id = validate_url(url)?;

        let duration = request.duration.unwrap_or(self.config.default_duration);
        if !(duration.is_finite() && duration > 0.0) {
            return Err(Error::InvalidDuration(duration));
        }

        Ok(JobSpec {
            url: url.to_string(),
            name: job_name(&video_id),
            duration,
        })
    }

    async fn execute(&self, job: &JobSpec, progress: &watch::Sender<JobStage>) -> Result<ClipOutput> {
        let enter = |stage: JobStage| {
            info!(job = %job.name, %stage, "stage");
            progress.send_replace(stage);
        };
        let mut files = JobFiles::new(&self.config, &job.name);

        enter(JobStage::Downloading);
        let info = self.media.probe(&job.url).await?;
        self.media.fetch(&job.url, &files.video).await?;

        let total = info.duration_secs.ok_or_else(|| Error::DurationUnknown {
            url: job.url.clone(),
        })?;
        let segment = choose_segment(total, job.duration);
        enter(JobStage::SegmentSelected);
        info!(
            job = %job.name,
            segment = %segment.label(),
            total_secs = total,
            "segment selected"
        );

        enter(JobStage::ExtractingAudio);
        self.transcoder
            .extract_audio(&files.video, &segment, &files.audio)
            .await?;

        enter(JobStage::Transcribing);
        let recognizer = self.recognizer.handle().await?;
        let samples = audio::load_wav_samples(files.audio.clone()).await?;
        let transcription = recognizer.transcribe(samples).await?;
        info!(job = %job.name, text = %transcription.text, "transcribed");

        enter(JobStage::GeneratingCaptions);
        let cues = captions::build_cues(&transcription, &self.config.captions, segment.duration());
        subtitle::write_srt(&files.subtitles, &cues).await?;

        enter(JobStage::Rendering);
        self.transcoder
            .render(&files.video, &segment, &files.subtitles, &files.output)
            .await?;
        files.keep_output();

        enter(JobStage::CleaningUp);
        let output_path = files.output.clone();
        drop(files);

        let file_name = output_path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(ClipOutput {
            download_url: format!(
                "{}/{file_name}",
                self.config.public_prefix.trim_end_matches('/')
            ),
            output_path,
            transcription: transcription.text,
            video_title: info.title,
            requested_duration: job.duration,
            segment,
            cue_count: cues.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::error::ErrorKind;
    use crate::recognizer::{RecognizerLoader, SpeechRecognizer};
    use crate::types::{TranscriptionChunk, TranscriptionResult};

    const URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

    #[derive(Clone, Copy)]
    enum FetchOutcome {
        Ok,
        Blocked,
        Broken,
    }

    struct FakeMedia {
        duration: Option<f64>,
        outcome: FetchOutcome,
        probes: Arc<AtomicUsize>,
    }

    impl FakeMedia {
        fn new(duration: Option<f64>) -> Self {
            Self {
                duration,
                outcome: FetchOutcome::Ok,
                probes: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl MediaSource for FakeMedia {
        async fn probe(&self, _url: &str) -> Result<VideoInfo> {
            self.probes.fetch_add(1, Ordering::SeqCst);
            Ok(VideoInfo {
                source_id: "dQw4w9WgXcQ".into(),
                title: "Never Gonna Give You Up".into(),
                channel: None,
                duration_secs: self.duration,
            })
        }

        async fn fetch(&self, _url: &str, dest: &Path) -> Result<()> {
            match self.outcome {
                FetchOutcome::Ok => {
                    tokio::fs::write(dest, b"video bytes").await?;
                    Ok(())
                }
                FetchOutcome::Blocked => {
                    tokio::fs::write(dest, b"partial").await?;
                    Err(Error::AccessBlocked("HTTP Error 429".into()))
                }
                FetchOutcome::Broken => Err(Error::Download("connection reset".into())),
            }
        }
    }

    #[derive(Default)]
    struct FakeTranscoder {
        render_delay: Duration,
        fail_render: bool,
        seen_window: Mutex<Option<SegmentSelection>>,
        seen_srt: Mutex<Option<String>>,
    }

    #[async_trait]
    impl Transcoder for FakeTranscoder {
        async fn extract_audio(
            &self,
            input: &Path,
            window: &SegmentSelection,
            output: &Path,
        ) -> Result<()> {
            assert!(input.exists(), "video must be downloaded before extraction");
            *self.seen_window.lock().unwrap() = Some(*window);
            let spec = hound::WavSpec {
                channels: 1,
                sample_rate: 16_000,
                bits_per_sample: 16,
                sample_format: hound::SampleFormat::Int,
            };
            let mut writer = hound::WavWriter::create(output, spec)?;
            for _ in 0..1_600 {
                writer.write_sample(0i16)?;
            }
            writer.finalize()?;
            Ok(())
        }

        async fn render(
            &self,
            _input: &Path,
            _window: &SegmentSelection,
            subtitles: &Path,
            output: &Path,
        ) -> Result<()> {
            *self.seen_srt.lock().unwrap() = Some(std::fs::read_to_string(subtitles)?);
            tokio::fs::write(output, b"partial render").await?;
            tokio::time::sleep(self.render_delay).await;
            if self.fail_render {
                return Err(Error::Transcode("encoder crashed".into()));
            }
            Ok(())
        }
    }

    struct FixedRecognizer;

    impl SpeechRecognizer for FixedRecognizer {
        fn transcribe(&self, samples: &[f32]) -> Result<TranscriptionResult> {
            assert_eq!(samples.len(), 1_600);
            Ok(TranscriptionResult {
                text: "bonjour tout le monde un deux trois quatre cinq".into(),
                chunks: vec![
                    TranscriptionChunk::new(0.0, 2.0, " bonjour tout le monde"),
                    TranscriptionChunk::new(2.0, 5.0, " un deux trois quatre cinq"),
                ],
            })
        }
    }

    struct FixedLoader {
        fail: bool,
    }

    #[async_trait]
    impl RecognizerLoader for FixedLoader {
        async fn load(&self) -> Result<Arc<dyn SpeechRecognizer>> {
            if self.fail {
                Err(Error::Model("corrupt model".into()))
            } else {
                Ok(Arc::new(FixedRecognizer))
            }
        }
    }

    struct Fixture {
        _root: tempfile::TempDir,
        temp_dir: PathBuf,
        output_dir: PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let root = tempfile::tempdir().unwrap();
            let temp_dir = root.path().join("temp");
            let output_dir = root.path().join("output");
            Self {
                _root: root,
                temp_dir,
                output_dir,
            }
        }

        fn config(&self) -> PipelineConfig {
            PipelineConfig::new()
                .temp_dir(self.temp_dir.clone())
                .output_dir(self.output_dir.clone())
        }

        fn pipeline(
            &self,
            config: PipelineConfig,
            media: FakeMedia,
            transcoder: FakeTranscoder,
            fail_load: bool,
        ) -> Pipeline<FakeMedia, FakeTranscoder> {
            let recognizer = RecognizerManager::new(FixedLoader { fail: fail_load });
            Pipeline::new(config, media, transcoder, recognizer)
        }

        fn files_in(dir: &Path) -> Vec<String> {
            std::fs::read_dir(dir)
                .map(|entries| {
                    entries
                        .filter_map(|e| e.ok())
                        .map(|e| e.file_name().to_string_lossy().into_owned())
                        .collect()
                })
                .unwrap_or_default()
        }
    }

    #[tokio::test]
    async fn test_successful_job() {
        let fx = Fixture::new();
        let pipeline = fx.pipeline(
            fx.config(),
            FakeMedia::new(Some(212.0)),
            FakeTranscoder::default(),
            false,
        );
        pipeline.setup().await.unwrap();

        let (progress, rx) = watch::channel(JobStage::Received);
        let output = pipeline
            .run_with_progress(&JobRequest::new(URL), &progress)
            .await
            .unwrap();

        assert_eq!(*rx.borrow(), JobStage::Completed);
        assert!(output.output_path.exists());
        assert!(output.download_url.starts_with("/output/tiktok_dQw4w9WgXcQ_"));
        assert!(output.download_url.ends_with(".mp4"));
        assert_eq!(output.video_title, "Never Gonna Give You Up");
        assert_eq!(output.requested_duration, 30.0);
        assert!((output.segment.duration() - 30.0).abs() < 1e-9);
        assert!(output.segment.start >= 0.0 && output.segment.start < 182.0);
        // one short chunk plus a five-word chunk split in two
        assert_eq!(output.cue_count, 3);

        assert!(Fixture::files_in(&fx.temp_dir).is_empty(), "temp files removed");
        assert_eq!(Fixture::files_in(&fx.output_dir).len(), 1);

        let srt = pipeline.transcoder.seen_srt.lock().unwrap().clone().unwrap();
        assert!(srt.starts_with("1\n00:00:00,000 --> 00:00:02,000\nbonjour tout le monde\n\n"));
        assert!(srt.contains("3\n00:00:03,500 --> 00:00:05,000\nquatre cinq\n\n"));
    }

    #[tokio::test]
    async fn test_short_source_uses_whole_video() {
        let fx = Fixture::new();
        let pipeline = fx.pipeline(
            fx.config(),
            FakeMedia::new(Some(10.0)),
            FakeTranscoder::default(),
            false,
        );
        pipeline.setup().await.unwrap();

        let output = pipeline.run(&JobRequest::new(URL).duration(30.0)).await.unwrap();
        assert_eq!(output.segment, SegmentSelection::new(0.0, 10.0));
        assert_eq!(
            *pipeline.transcoder.seen_window.lock().unwrap(),
            Some(SegmentSelection::new(0.0, 10.0))
        );
        assert_eq!(output.segment.label(), "0.0s-10.0s");
    }

    #[tokio::test]
    async fn test_long_duration_is_accepted() {
        let fx = Fixture::new();
        let pipeline = fx.pipeline(
            fx.config(),
            FakeMedia::new(Some(3_600.0)),
            FakeTranscoder::default(),
            false,
        );
        pipeline.setup().await.unwrap();

        let (status, body) = pipeline.handle(JobRequest::new(URL).duration(900.0)).await;
        assert_eq!(status, 200);
        match body {
            JobResponse::Success(summary) => assert_eq!(summary.duration, 900.0),
            other => panic!("expected success, got {other:?}"),
        }
        let window = pipeline.transcoder.seen_window.lock().unwrap().unwrap();
        assert!((window.duration() - 900.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_invalid_url_allocates_nothing() {
        let fx = Fixture::new();
        let media = FakeMedia::new(Some(100.0));
        let probes = Arc::clone(&media.probes);
        let pipeline = fx.pipeline(fx.config(), media, FakeTranscoder::default(), false);

        let err = pipeline
            .run(&JobRequest::new("https://vimeo.com/12345"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(probes.load(Ordering::SeqCst), 0);
        assert!(!fx.temp_dir.exists());

        let (status, body) = pipeline.handle(JobRequest::default()).await;
        assert_eq!(status, 400);
        assert_eq!(body, JobResponse::failure("URL is required", None));
    }

    #[tokio::test]
    async fn test_rejects_non_positive_duration() {
        let fx = Fixture::new();
        let pipeline = fx.pipeline(
            fx.config(),
            FakeMedia::new(Some(100.0)),
            FakeTranscoder::default(),
            false,
        );
        let err = pipeline
            .run(&JobRequest::new(URL).duration(0.0))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidDuration(_)));
    }

    #[tokio::test]
    async fn test_access_blocked_cleans_up() {
        let fx = Fixture::new();
        let mut media = FakeMedia::new(Some(100.0));
        media.outcome = FetchOutcome::Blocked;
        let pipeline = fx.pipeline(fx.config(), media, FakeTranscoder::default(), false);
        pipeline.setup().await.unwrap();

        let (status, body) = pipeline.handle(JobRequest::new(URL)).await;
        assert_eq!(status, 500);
        match body {
            JobResponse::Failure(f) => {
                assert!(!f.success);
                assert!(f.error.contains("try another video"));
                assert!(f.details.is_none());
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert!(Fixture::files_in(&fx.temp_dir).is_empty());
    }

    #[tokio::test]
    async fn test_generic_download_failure_is_processing() {
        let fx = Fixture::new();
        let mut media = FakeMedia::new(Some(100.0));
        media.outcome = FetchOutcome::Broken;
        let pipeline = fx.pipeline(fx.config(), media, FakeTranscoder::default(), false);
        pipeline.setup().await.unwrap();

        let err = pipeline.run(&JobRequest::new(URL)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Processing);
    }

    #[tokio::test]
    async fn test_unknown_duration_fails() {
        let fx = Fixture::new();
        let pipeline = fx.pipeline(
            fx.config(),
            FakeMedia::new(None),
            FakeTranscoder::default(),
            false,
        );
        pipeline.setup().await.unwrap();

        let err = pipeline.run(&JobRequest::new(URL)).await.unwrap_err();
        assert!(matches!(err, Error::DurationUnknown { .. }));
        assert!(Fixture::files_in(&fx.temp_dir).is_empty());
    }

    #[tokio::test]
    async fn test_timeout_cleans_up_and_reports_stage() {
        let fx = Fixture::new();
        let config = fx
            .config()
            .job_timeout(Duration::from_millis(200))
            .unwrap()
            .expose_error_details(true);
        let transcoder = FakeTranscoder {
            render_delay: Duration::from_secs(30),
            ..Default::default()
        };
        let pipeline = fx.pipeline(config, FakeMedia::new(Some(100.0)), transcoder, false);
        pipeline.setup().await.unwrap();

        let (status, body) = pipeline.handle(JobRequest::new(URL)).await;
        assert_eq!(status, 408);
        match body {
            JobResponse::Failure(f) => {
                assert!(f.error.starts_with("timeout"));
                assert!(f.details.unwrap().contains("rendering"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert!(Fixture::files_in(&fx.temp_dir).is_empty(), "temp files removed");
        assert!(Fixture::files_in(&fx.output_dir).is_empty(), "no partial output");
    }

    #[tokio::test]
    async fn test_render_failure_removes_partial_output() {
        let fx = Fixture::new();
        let transcoder = FakeTranscoder {
            fail_render: true,
            ..Default::default()
        };
        let pipeline = fx.pipeline(fx.config(), FakeMedia::new(Some(100.0)), transcoder, false);
        pipeline.setup().await.unwrap();

        let err = pipeline.run(&JobRequest::new(URL)).await.unwrap_err();
        assert!(matches!(err, Error::Transcode(_)));
        assert!(Fixture::files_in(&fx.output_dir).is_empty());
        assert!(Fixture::files_in(&fx.temp_dir).is_empty());
    }

    #[tokio::test]
    async fn test_recognizer_failure_stops_accepting_jobs() {
        let fx = Fixture::new();
        let media = FakeMedia::new(Some(100.0));
        let probes = Arc::clone(&media.probes);
        let pipeline = fx.pipeline(fx.config(), media, FakeTranscoder::default(), true);
        pipeline.setup().await.unwrap();
        assert!(pipeline.is_accepting());

        let err = pipeline.run(&JobRequest::new(URL)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Fatal);
        assert!(!pipeline.is_accepting());
        assert_eq!(probes.load(Ordering::SeqCst), 1);

        let err = pipeline.run(&JobRequest::new(URL)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Fatal);
        assert_eq!(probes.load(Ordering::SeqCst), 1, "rejected before any work");
        assert!(Fixture::files_in(&fx.temp_dir).is_empty());
    }

    #[tokio::test]
    async fn test_setup_is_idempotent() {
        let fx = Fixture::new();
        let pipeline = fx.pipeline(
            fx.config(),
            FakeMedia::new(Some(100.0)),
            FakeTranscoder::default(),
            false,
        );
        pipeline.setup().await.unwrap();
        pipeline.setup().await.unwrap();
        assert!(fx.temp_dir.is_dir());
        assert!(fx.output_dir.is_dir());
    }

    #[test]
    fn test_job_name_is_filename_safe() {
        let name = job_name("ab:c/d\\e.f");
        assert!(name.starts_with("ab_c_d_e_f_"));
        assert!(name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-'));
    }

    #[test]
    fn test_stage_labels() {
        assert_eq!(JobStage::ExtractingAudio.to_string(), "extracting audio");
        assert!(JobStage::Failed.is_terminal());
        assert!(!JobStage::Rendering.is_terminal());
    }
}
