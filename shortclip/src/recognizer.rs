//! Speech recognition and its process-wide lifecycle.
//!
//! The recognizer is expensive to load and not reentrant. [`RecognizerManager`]
//! loads it lazily at most once, remembers a failed load for the rest of the
//! process, and hands out [`RecognizerHandle`]s that serialise every call.
//!
//! The load runs in a task owned by the manager, so a caller that gives up
//! waiting (a job hitting its timeout) does not cancel it. Later callers wait
//! on the same load.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError};

use async_trait::async_trait;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::Mutex;
use tracing::{debug, error, info};
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use crate::config::{Language, RecognizerOptions};
use crate::error::{Error, Result};
use crate::model;
use crate::transcode::RECOGNIZER_SAMPLE_RATE;
use crate::types::{TranscriptionChunk, TranscriptionResult};

/// Turns 16 kHz mono f32 samples into text with timed chunks. Blocking.
pub trait SpeechRecognizer: Send + Sync {
    fn transcribe(&self, samples: &[f32]) -> Result<TranscriptionResult>;
}

/// One-time construction of a recognizer.
#[async_trait]
pub trait RecognizerLoader: Send + Sync {
    async fn load(&self) -> Result<Arc<dyn SpeechRecognizer>>;
}

/// Outcome of a load; the error side is the failure reason.
type LoadOutcome = std::result::Result<Arc<dyn SpeechRecognizer>, String>;

enum Slot {
    Empty,
    Loading(Shared<BoxFuture<'static, LoadOutcome>>),
    Ready(Arc<dyn SpeechRecognizer>),
    Poisoned(String),
}

struct State {
    slot: std::sync::Mutex<Slot>,
    poisoned: AtomicBool,
}

impl State {
    fn settle(&self, outcome: &LoadOutcome) {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        match outcome {
            Ok(recognizer) => *slot = Slot::Ready(Arc::clone(recognizer)),
            Err(reason) => {
                *slot = Slot::Poisoned(reason.clone());
                self.poisoned.store(true, Ordering::Release);
            }
        }
    }
}

pub struct RecognizerManager {
    loader: Arc<dyn RecognizerLoader>,
    state: Arc<State>,
    gate: Arc<Mutex<()>>,
}

impl RecognizerManager {
    pub fn new(loader: impl RecognizerLoader + 'static) -> Self {
        Self {
            loader: Arc::new(loader),
            state: Arc::new(State {
                slot: std::sync::Mutex::new(Slot::Empty),
                poisoned: AtomicBool::new(false),
            }),
            gate: Arc::new(Mutex::new(())),
        }
    }

    /// Whether initialisation has failed. Permanent for this manager.
    pub fn is_poisoned(&self) -> bool {
        self.state.poisoned.load(Ordering::Acquire)
    }

    /// Get a handle, loading the recognizer on first use.
    ///
    /// Dropping the returned future does not abort a load in progress.
    pub async fn handle(&self) -> Result<RecognizerHandle> {
        let pending = {
            let mut slot = self.state.slot.lock().unwrap_or_else(PoisonError::into_inner);
            match &*slot {
                Slot::Ready(recognizer) => return Ok(self.wrap(Arc::clone(recognizer))),
                Slot::Poisoned(reason) => return Err(Error::RecognizerUnavailable(reason.clone())),
                Slot::Loading(pending) => pending.clone(),
                Slot::Empty => {
                    let pending = self.start_loading();
                    *slot = Slot::Loading(pending.clone());
                    pending
                }
            }
        };

        match pending.await {
            Ok(recognizer) => Ok(self.wrap(recognizer)),
            Err(reason) => Err(Error::RecognizerUnavailable(reason)),
        }
    }

    fn start_loading(&self) -> Shared<BoxFuture<'static, LoadOutcome>> {
        let loader = Arc::clone(&self.loader);
        let state = Arc::clone(&self.state);
        let task = tokio::spawn(async move {
            info!("initialising speech recognizer");
            let outcome = loader.load().await.map_err(|e| {
                error!(error = %e, "speech recognizer failed to initialise");
                e.to_string()
            });
            if outcome.is_ok() {
                info!("speech recognizer ready");
            }
            state.settle(&outcome);
            outcome
        });

        let state = Arc::clone(&self.state);
        async move {
            match task.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    let outcome = Err(format!("recognizer loading task failed: {e}"));
                    state.settle(&outcome);
                    outcome
                }
            }
        }
        .boxed()
        .shared()
    }

    fn wrap(&self, recognizer: Arc<dyn SpeechRecognizer>) -> RecognizerHandle {
        RecognizerHandle {
            recognizer,
            gate: Arc::clone(&self.gate),
        }
    }
}

/// Shared access to a loaded recognizer.
#[derive(Clone)]
pub struct RecognizerHandle {
    recognizer: Arc<dyn SpeechRecognizer>,
    gate: Arc<Mutex<()>>,
}

impl RecognizerHandle {
    /// Transcribe on the blocking pool.
    ///
    /// The gate stays locked until the blocking call returns, even if the
    /// awaiting job is cancelled first.
    pub async fn transcribe(&self, samples: Vec<f32>) -> Result<TranscriptionResult> {
        let permit = Arc::clone(&self.gate).lock_owned().await;
        let recognizer = Arc::clone(&self.recognizer);
        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            recognizer.transcribe(&samples)
        })
        .await
        .map_err(|e| Error::Transcription(format!("recognizer task failed: {e}")))?
    }
}

/// Loads a whisper.cpp model, fetching it into the cache if needed.
pub struct WhisperLoader {
    options: RecognizerOptions,
}

impl WhisperLoader {
    pub fn new(options: RecognizerOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl RecognizerLoader for WhisperLoader {
    async fn load(&self) -> Result<Arc<dyn SpeechRecognizer>> {
        let cache_dir = self.options.resolve_cache_dir();
        let model_path = model::ensure_model(&self.options.model, &cache_dir).await?;
        let options = self.options.clone();
        let recognizer =
            tokio::task::spawn_blocking(move || WhisperRecognizer::load(&model_path, options))
                .await
                .map_err(|e| Error::Model(format!("model loading task failed: {e}")))??;
        Ok(Arc::new(recognizer))
    }
}

pub struct WhisperRecognizer {
    ctx: WhisperContext,
    options: RecognizerOptions,
}

impl WhisperRecognizer {
    pub fn load(model_path: &Path, options: RecognizerOptions) -> Result<Self> {
        info!(model = %model_path.display(), "loading whisper model");

        let mut ctx_params = WhisperContextParameters::new();
        ctx_params.use_gpu(options.gpu);
        ctx_params.gpu_device(options.gpu_device as i32);

        let ctx = WhisperContext::new_with_params(
            model_path
                .to_str()
                .ok_or_else(|| Error::Model("model path contains invalid UTF-8".into()))?,
            ctx_params,
        )?;

        Ok(Self { ctx, options })
    }
}

impl SpeechRecognizer for WhisperRecognizer {
    fn transcribe(&self, samples: &[f32]) -> Result<TranscriptionResult> {
        let mut state = self.ctx.create_state()?;

        let mut params = match self.options.beam_size {
            Some(beam_size) => FullParams::new(SamplingStrategy::BeamSearch {
                beam_size: beam_size as i32,
                patience: -1.0,
            }),
            None => FullParams::new(SamplingStrategy::Greedy { best_of: 5 }),
        };

        match &self.options.language {
            Language::Auto => params.set_detect_language(true),
            Language::Code { code, .. } => params.set_language(Some(code)),
        }
        params.set_translate(self.options.translate);
        params.set_temperature(self.options.temperature);
        if let Some(n) = self.options.n_threads {
            params.set_n_threads(n as i32);
        }
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);

        info!(
            samples = samples.len(),
            duration_secs = format!("{:.1}", samples.len() as f64 / RECOGNIZER_SAMPLE_RATE as f64),
            language = %self.options.language,
            "running transcription"
        );
        state.full(params, samples)?;

        let num_segments = state.full_n_segments();
        let mut chunks = Vec::with_capacity(num_segments.max(0) as usize);
        for i in 0..num_segments {
            let segment = state
                .get_segment(i)
                .ok_or_else(|| Error::Transcription(format!("segment {i} not found")))?;
            let text = segment
                .to_str_lossy()
                .map_err(|e| Error::Transcription(format!("segment text error: {e}")))?
                .into_owned();
            // whisper timestamps are centiseconds
            chunks.push(TranscriptionChunk::new(
                segment.start_timestamp() as f64 / 100.0,
                segment.end_timestamp() as f64 / 100.0,
                text,
            ));
        }

        let text = chunks
            .iter()
            .map(|c| c.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        debug!(chunks = chunks.len(), %text, "transcription complete");

        Ok(TranscriptionResult { text, chunks })
    }
}
