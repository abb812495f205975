use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};

/// A validated recognition language.
///
/// Accepts whisper.cpp short codes ("fr", "en") and full names ("french").
/// `Language::Auto` lets the model detect the language itself.
#[derive(Debug, Clone, Default)]
pub enum Language {
    #[default]
    Auto,
    Code {
        /// Short code as whisper expects it.
        code: String,
        /// Whisper internal language ID.
        id: i32,
    },
}

impl Language {
    pub fn new(lang: &str) -> Result<Self> {
        let lower = lang.trim().to_lowercase();
        if lower == "auto" {
            return Ok(Language::Auto);
        }

        let id = whisper_rs::get_lang_id(&lower)
            .ok_or_else(|| Error::UnsupportedLanguage(lang.to_string()))?;
        let code = whisper_rs::get_lang_str(id).unwrap_or(&lower).to_string();
        Ok(Language::Code { code, id })
    }

    /// Short language code, or None for auto-detection.
    pub fn code(&self) -> Option<&str> {
        match self {
            Language::Auto => None,
            Language::Code { code, .. } => Some(code),
        }
    }

    /// All supported languages as (code, full_name) pairs.
    pub fn supported() -> Vec<(&'static str, &'static str)> {
        (0..=whisper_rs::get_lang_max_id())
            .filter_map(|id| {
                Some((
                    whisper_rs::get_lang_str(id)?,
                    whisper_rs::get_lang_str_full(id)?,
                ))
            })
            .collect()
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code().unwrap_or("auto"))
    }
}

/// Whisper model sizes.
#[derive(Debug, Clone, PartialEq)]
pub enum Model {
    Tiny,
    Base,
    Small,
    Medium,
    LargeV3Turbo,
    /// User-provided ggml file.
    Custom(PathBuf),
}

impl Model {
    /// File name on the whisper.cpp model mirror.
    pub fn filename(&self) -> String {
        match self {
            Model::Custom(path) => path
                .file_name()
                .map(|f| f.to_string_lossy().into_owned())
                .unwrap_or_else(|| "custom-model".into()),
            named => format!("ggml-{}.bin", named.name()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Model::Tiny => "tiny",
            Model::Base => "base",
            Model::Small => "small",
            Model::Medium => "medium",
            Model::LargeV3Turbo => "large-v3-turbo",
            Model::Custom(_) => "custom",
        }
    }

    pub fn parse_name(s: &str) -> Option<Self> {
        match s {
            "tiny" => Some(Model::Tiny),
            "base" => Some(Model::Base),
            "small" => Some(Model::Small),
            "medium" => Some(Model::Medium),
            "large-v3-turbo" => Some(Model::LargeV3Turbo),
            _ => None,
        }
    }

    /// Named models with their approximate download size.
    pub fn catalog() -> &'static [(&'static str, &'static str)] {
        &[
            ("tiny", "75 MB"),
            ("base", "142 MB"),
            ("small", "466 MB"),
            ("medium", "1.5 GB"),
            ("large-v3-turbo", "~1.6 GB"),
        ]
    }
}

/// Caption segmentation tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionOptions {
    /// Upper bound on words shown at once.
    pub max_words_per_cue: usize,
    /// Chunks with more words than this are split into sub-cues.
    pub long_chunk_word_threshold: usize,
    /// Cue length in seconds when no recognizer timing is available.
    pub fallback_cue_duration: f64,
}

impl Default for CaptionOptions {
    fn default() -> Self {
        Self {
            max_words_per_cue: 3,
            long_chunk_word_threshold: 4,
            fallback_cue_duration: 1.8,
        }
    }
}

impl CaptionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_words_per_cue(mut self, n: usize) -> Result<Self> {
        if n == 0 {
            return Err(Error::InvalidOption("max_words_per_cue must be at least 1".into()));
        }
        self.max_words_per_cue = n;
        Ok(self)
    }

    pub fn long_chunk_word_threshold(mut self, n: usize) -> Result<Self> {
        if n == 0 {
            return Err(Error::InvalidOption(
                "long_chunk_word_threshold must be at least 1".into(),
            ));
        }
        self.long_chunk_word_threshold = n;
        Ok(self)
    }

    pub fn fallback_cue_duration(mut self, secs: f64) -> Result<Self> {
        if !(secs.is_finite() && secs > 0.0) {
            return Err(Error::InvalidOption(format!(
                "fallback_cue_duration must be positive, got {secs}"
            )));
        }
        self.fallback_cue_duration = secs;
        Ok(self)
    }
}

/// Speech recognizer settings.
#[derive(Debug, Clone)]
pub struct RecognizerOptions {
    pub model: Model,
    pub language: Language,
    pub translate: bool,
    pub gpu: bool,
    pub gpu_device: u32,
    pub n_threads: Option<u32>,
    pub beam_size: Option<u32>,
    pub temperature: f32,
    pub cache_dir: Option<PathBuf>,
}

impl Default for RecognizerOptions {
    fn default() -> Self {
        Self {
            model: Model::Tiny,
            language: Language::Auto,
            translate: false,
            gpu: true,
            gpu_device: 0,
            n_threads: None,
            beam_size: None,
            temperature: 0.0,
            cache_dir: None,
        }
    }
}

impl RecognizerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn model(mut self, model: Model) -> Self {
        self.model = model;
        self
    }

    pub fn language(mut self, lang: &str) -> Result<Self> {
        self.language = Language::new(lang)?;
        Ok(self)
    }

    pub fn translate(mut self, translate: bool) -> Self {
        self.translate = translate;
        self
    }

    pub fn gpu(mut self, enabled: bool) -> Self {
        self.gpu = enabled;
        self
    }

    pub fn gpu_device(mut self, device: u32) -> Self {
        self.gpu_device = device;
        self
    }

    pub fn n_threads(mut self, n: u32) -> Result<Self> {
        if n == 0 {
            return Err(Error::InvalidOption("n_threads must be at least 1".into()));
        }
        self.n_threads = Some(n);
        Ok(self)
    }

    pub fn beam_size(mut self, size: u32) -> Result<Self> {
        if size == 0 {
            return Err(Error::InvalidOption("beam_size must be at least 1".into()));
        }
        self.beam_size = Some(size);
        Ok(self)
    }

    pub fn temperature(mut self, temp: f32) -> Result<Self> {
        if !(0.0..=1.0).contains(&temp) {
            return Err(Error::InvalidOption(format!(
                "temperature must be within 0.0..=1.0, got {temp}"
            )));
        }
        self.temperature = temp;
        Ok(self)
    }

    pub fn cache_dir(mut self, dir: PathBuf) -> Self {
        self.cache_dir = Some(dir);
        self
    }

    /// Model cache directory, defaulting to ~/.cache/shortclip/models.
    pub fn resolve_cache_dir(&self) -> PathBuf {
        self.cache_dir.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from(".cache"))
                .join("shortclip")
                .join("models")
        })
    }
}

/// Burned-in caption look, expressed as ASS style overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleStyle {
    pub font_name: String,
    pub font_size: u32,
    /// ASS colour in `&HBBGGRR` notation.
    pub primary_colour: String,
    pub outline_colour: String,
    pub outline: u32,
    pub shadow: u32,
    pub bold: bool,
    /// Numpad-style placement; 2 is bottom centre.
    pub alignment: u32,
    pub margin_v: u32,
    pub border_style: u32,
}

impl Default for SubtitleStyle {
    fn default() -> Self {
        Self {
            font_name: "Arial Black".into(),
            font_size: 16,
            primary_colour: "&H00FFFF".into(),
            outline_colour: "&H000000".into(),
            outline: 1,
            shadow: 0,
            bold: true,
            alignment: 2,
            margin_v: 20,
            border_style: 1,
        }
    }
}

impl SubtitleStyle {
    /// Value for the ffmpeg `subtitles` filter `force_style` argument.
    pub fn to_force_style(&self) -> String {
        format!(
            "FontName={},FontSize={},PrimaryColour={},OutlineColour={},Outline={},Shadow={},Bold={},Alignment={},MarginV={},BorderStyle={}",
            self.font_name,
            self.font_size,
            self.primary_colour,
            self.outline_colour,
            self.outline,
            self.shadow,
            u8::from(self.bold),
            self.alignment,
            self.margin_v,
            self.border_style,
        )
    }
}

/// Final render settings. Geometry defaults to 1080x1920 portrait.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub video_codec: String,
    pub video_bitrate: String,
    pub audio_codec: String,
    pub audio_bitrate: String,
    pub preset: String,
    pub crf: u32,
    pub subtitle_style: SubtitleStyle,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 1920,
            fps: 30,
            video_codec: "libx264".into(),
            video_bitrate: "2500k".into(),
            audio_codec: "aac".into(),
            audio_bitrate: "128k".into(),
            preset: "fast".into(),
            crf: 23,
            subtitle_style: SubtitleStyle::default(),
        }
    }
}

impl RenderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn preset(mut self, preset: impl Into<String>) -> Self {
        self.preset = preset.into();
        self
    }

    pub fn crf(mut self, crf: u32) -> Result<Self> {
        if crf > 51 {
            return Err(Error::InvalidOption(format!("crf must be 0..=51, got {crf}")));
        }
        self.crf = crf;
        Ok(self)
    }

    pub fn subtitle_style(mut self, style: SubtitleStyle) -> Self {
        self.subtitle_style = style;
        self
    }
}

/// Everything the orchestrator needs, passed in at construction.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Per-job scratch files live here.
    pub temp_dir: PathBuf,
    /// Finished clips are kept here.
    pub output_dir: PathBuf,
    /// URL prefix under which `output_dir` is served.
    pub public_prefix: String,
    pub job_timeout: Duration,
    /// Clip length when the request leaves it out.
    pub default_duration: f64,
    /// Include the detailed error text in failure responses.
    pub expose_error_details: bool,
    pub captions: CaptionOptions,
    pub recognizer: RecognizerOptions,
    pub render: RenderOptions,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            temp_dir: PathBuf::from("./temp"),
            output_dir: PathBuf::from("./output"),
            public_prefix: "/output".into(),
            job_timeout: Duration::from_secs(5 * 60),
            default_duration: 30.0,
            expose_error_details: false,
            captions: CaptionOptions::default(),
            recognizer: RecognizerOptions::default(),
            render: RenderOptions::default(),
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn temp_dir(mut self, dir: PathBuf) -> Self {
        self.temp_dir = dir;
        self
    }

    pub fn output_dir(mut self, dir: PathBuf) -> Self {
        self.output_dir = dir;
        self
    }

    pub fn public_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.public_prefix = prefix.into();
        self
    }

    pub fn job_timeout(mut self, timeout: Duration) -> Result<Self> {
        if timeout.is_zero() {
            return Err(Error::InvalidOption("job_timeout must be non-zero".into()));
        }
        self.job_timeout = timeout;
        Ok(self)
    }

    pub fn default_duration(mut self, secs: f64) -> Result<Self> {
        if !(secs.is_finite() && secs > 0.0) {
            return Err(Error::InvalidDuration(secs));
        }
        self.default_duration = secs;
        Ok(self)
    }

    pub fn expose_error_details(mut self, enabled: bool) -> Self {
        self.expose_error_details = enabled;
        self
    }

    pub fn captions(mut self, captions: CaptionOptions) -> Self {
        self.captions = captions;
        self
    }

    pub fn recognizer(mut self, recognizer: RecognizerOptions) -> Self {
        self.recognizer = recognizer;
        self
    }

    pub fn render(mut self, render: RenderOptions) -> Self {
        self.render = render;
        self
    }
}
