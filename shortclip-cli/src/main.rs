use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use shortclip::types::VideoInfoResponse;
use shortclip::{
    CaptionOptions, JobRequest, JobResponse, JobStage, Language, Model, Pipeline,
    PipelineConfig, RecognizerOptions,
};
use tokio::sync::watch;

#[derive(Parser)]
#[command(
    name = "shortclip",
    about = "Cut a random captioned vertical clip out of a YouTube video"
)]
struct Cli {
    /// YouTube video URL.
    #[arg(required_unless_present_any = ["list_models", "download_model", "list_languages"])]
    url: Option<String>,

    /// Clip length in seconds.
    #[arg(short, long)]
    duration: Option<f64>,

    /// Directory for per-job scratch files.
    #[arg(long, default_value = "./temp")]
    temp_dir: PathBuf,

    /// Directory finished clips are written to.
    #[arg(short, long, default_value = "./output")]
    output_dir: PathBuf,

    /// URL prefix used to build the download link.
    #[arg(long, default_value = "/output")]
    public_prefix: String,

    /// Give up on the job after this many seconds.
    #[arg(long, default_value = "300")]
    timeout_secs: u64,

    /// Whisper model name, or a path to a ggml model file.
    #[arg(short, long, default_value = "tiny")]
    model: String,

    /// Language code (e.g. "fr", "en") or "auto" for detection.
    #[arg(short, long, default_value = "fr")]
    language: String,

    /// Translate to English.
    #[arg(long)]
    translate: bool,

    /// Disable GPU acceleration.
    #[arg(long)]
    no_gpu: bool,

    /// GPU device ID.
    #[arg(long, default_value = "0")]
    gpu_device: u32,

    /// Number of threads (default: auto).
    #[arg(long)]
    threads: Option<u32>,

    /// Beam search size (default: greedy).
    #[arg(long)]
    beam_size: Option<u32>,

    /// Model cache directory.
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Most words shown in one caption.
    #[arg(long, default_value = "3")]
    max_words: usize,

    /// Split recognizer chunks longer than this many words.
    #[arg(long, default_value = "4")]
    long_chunk_words: usize,

    /// Caption length in seconds when the recognizer gives no timing.
    #[arg(long, default_value = "1.8")]
    cue_duration: f64,

    /// Include detailed error text in failure responses.
    #[arg(long)]
    details: bool,

    /// Print video metadata instead of making a clip.
    #[arg(long)]
    info: bool,

    /// List available models.
    #[arg(long)]
    list_models: bool,

    /// Download a model without making a clip.
    #[arg(long)]
    download_model: Option<String>,

    /// List supported languages.
    #[arg(long)]
    list_languages: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("shortclip=info".parse().unwrap()),
        )
        .with_writer(std::io::stderr)
        .init();

    if cli.list_languages {
        println!("{:<6} LANGUAGE", "CODE");
        println!("{:<6} --------", "----");
        for (code, name) in Language::supported() {
            println!("{code:<6} {name}");
        }
        return;
    }

    if cli.list_models {
        list_models(cli.cache_dir.as_deref());
        return;
    }

    if let Some(model_name) = &cli.download_model {
        let Some(model) = Model::parse_name(model_name) else {
            eprintln!("Unknown model: {model_name}");
            eprintln!("Use --list-models to see available models");
            std::process::exit(1);
        };
        let cache_dir = cli
            .cache_dir
            .clone()
            .unwrap_or_else(|| RecognizerOptions::default().resolve_cache_dir());
        match shortclip::model::ensure_model(&model, &cache_dir).await {
            Ok(path) => println!("Model ready: {}", path.display()),
            Err(e) => {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        }
        return;
    }

    let config = match build_config(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };
    let url = cli.url.unwrap_or_default();
    let pipeline = Pipeline::from_config(config);

    if cli.info {
        match pipeline.video_info(&url).await {
            Ok(info) => print_json(&VideoInfoResponse::from(info)),
            Err(e) => {
                let details = cli.details.then(|| e.to_string());
                print_json(&JobResponse::failure(e.public_message(), details));
                std::process::exit(1);
            }
        }
        return;
    }

    if let Err(e) = pipeline.setup().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    let request = JobRequest {
        url: Some(url),
        duration: cli.duration,
    };
    let (progress, stages) = watch::channel(JobStage::Received);
    let spinner = stage_spinner(stages);
    let result = pipeline.run_with_progress(&request, &progress).await;
    drop(progress);
    if let Ok(spinner) = spinner.await {
        spinner.finish_and_clear();
    }

    let (status, response) = pipeline.respond(result);
    print_json(&response);
    if status != 200 {
        eprintln!("Job failed with status {status}");
        std::process::exit(1);
    }
}

fn build_config(cli: &Cli) -> shortclip::Result<PipelineConfig> {
    let model = match Model::parse_name(&cli.model) {
        Some(m) => m,
        None => {
            let path = PathBuf::from(&cli.model);
            if !path.exists() {
                return Err(shortclip::Error::InvalidOption(format!(
                    "unknown model {:?}; use --list-models, or give a path to a ggml file",
                    cli.model
                )));
            }
            Model::Custom(path)
        }
    };

    let mut recognizer = RecognizerOptions::new()
        .model(model)
        .language(&cli.language)?
        .translate(cli.translate)
        .gpu(!cli.no_gpu)
        .gpu_device(cli.gpu_device);
    if let Some(n) = cli.threads {
        recognizer = recognizer.n_threads(n)?;
    }
    if let Some(size) = cli.beam_size {
        recognizer = recognizer.beam_size(size)?;
    }
    if let Some(dir) = &cli.cache_dir {
        recognizer = recognizer.cache_dir(dir.clone());
    }

    let captions = CaptionOptions::new()
        .max_words_per_cue(cli.max_words)?
        .long_chunk_word_threshold(cli.long_chunk_words)?
        .fallback_cue_duration(cli.cue_duration)?;

    Ok(PipelineConfig::new()
        .temp_dir(cli.temp_dir.clone())
        .output_dir(cli.output_dir.clone())
        .public_prefix(cli.public_prefix.clone())
        .job_timeout(Duration::from_secs(cli.timeout_secs))?
        .expose_error_details(cli.details)
        .captions(captions)
        .recognizer(recognizer))
}

/// Show the current job stage on stderr until the job ends.
fn stage_spinner(
    mut stages: watch::Receiver<JobStage>,
) -> tokio::task::JoinHandle<ProgressBar> {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed}] {msg}") {
        spinner.set_style(style);
    }
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner.set_message(JobStage::Received.to_string());

    tokio::spawn(async move {
        while stages.changed().await.is_ok() {
            let stage = *stages.borrow_and_update();
            spinner.set_message(stage.to_string());
            if stage.is_terminal() {
                break;
            }
        }
        spinner
    })
}

fn list_models(cache_dir: Option<&std::path::Path>) {
    println!("{:<16} SIZE", "MODEL");
    println!("{:<16} ----", "-----");
    for (name, size) in Model::catalog() {
        println!("{name:<16} {size}");
    }

    let cache_dir = cache_dir
        .map(PathBuf::from)
        .unwrap_or_else(|| RecognizerOptions::default().resolve_cache_dir());
    let cached = shortclip::model::list_cached_models(&cache_dir);
    if !cached.is_empty() {
        println!("\nCached models in {}:", cache_dir.display());
        for path in cached {
            let size = std::fs::metadata(&path)
                .map(|m| format_bytes(m.len()))
                .unwrap_or_default();
            println!(
                "  {} ({})",
                path.file_name()
                    .map(|f| f.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                size
            );
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("JSON error: {e}");
            std::process::exit(1);
        }
    }
}

fn format_bytes(bytes: u64) -> String {
    if bytes >= 1_000_000_000 {
        format!("{:.1} GB", bytes as f64 / 1_000_000_000.0)
    } else if bytes >= 1_000_000 {
        format!("{:.0} MB", bytes as f64 / 1_000_000.0)
    } else {
        format!("{:.0} KB", bytes as f64 / 1_000.0)
    }
}
