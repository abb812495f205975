use std::io::Write;
use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::config::Model;
use crate::error::{Error, Result};

const MODEL_MIRROR: &str = "https://huggingface.co/ggerganov/whisper.cpp/resolve/main";

/// Anything smaller is an error page, not a ggml model.
const MIN_MODEL_BYTES: u64 = 1_000_000;

/// Return a local path for `model`, downloading it into `cache_dir` when missing.
pub async fn ensure_model(model: &Model, cache_dir: &Path) -> Result<PathBuf> {
    if let Model::Custom(path) = model {
        return if path.exists() {
            Ok(path.clone())
        } else {
            Err(Error::ModelNotFound { path: path.clone() })
        };
    }

    let model_path = cache_dir.join(model.filename());
    if model_path.exists() {
        info!(path = %model_path.display(), "model already cached");
        return Ok(model_path);
    }

    tokio::fs::create_dir_all(cache_dir).await.map_err(|e| {
        Error::Model(format!(
            "failed to create cache dir {}: {e}",
            cache_dir.display()
        ))
    })?;

    let url = format!("{MODEL_MIRROR}/{}", model.filename());
    info!(%url, model = model.name(), "downloading model");
    download_model(&url, &model_path).await?;
    Ok(model_path)
}

async fn download_model(url: &str, dest: &Path) -> Result<()> {
    let response = reqwest::Client::new()
        .get(url)
        .send()
        .await?
        .error_for_status()
        .map_err(|e| Error::ModelDownload(format!("HTTP error: {e}")))?;

    let total_size = response.content_length().unwrap_or(0);
    let pb = progress_bar(total_size, dest);

    // .part then rename, so an interrupted download never looks cached
    let part_path = dest.with_extension("bin.part");
    let mut file = std::fs::File::create(&part_path)?;
    let mut stream = response.bytes_stream();
    let mut downloaded: u64 = 0;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk)?;
        downloaded += chunk.len() as u64;
        pb.set_position(downloaded);
    }
    file.flush()?;
    drop(file);

    if downloaded < MIN_MODEL_BYTES {
        std::fs::remove_file(&part_path).ok();
        return Err(Error::ModelDownload(format!(
            "downloaded file too small ({downloaded} bytes), likely an error page"
        )));
    }

    std::fs::rename(&part_path, dest)?;
    pb.finish_with_message("model ready");

    if total_size > 0 && downloaded != total_size {
        warn!(
            expected = total_size,
            actual = downloaded,
            "model size mismatch, file may be corrupt"
        );
    }
    info!(path = %dest.display(), size = downloaded, "model saved");
    Ok(())
}

fn progress_bar(total_size: u64, dest: &Path) -> ProgressBar {
    let pb = ProgressBar::new(total_size);
    if let Ok(style) = ProgressStyle::default_bar().template(
        "{msg}\n{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})",
    ) {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb.set_message(format!(
        "Downloading {}",
        dest.file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default()
    ));
    pb
}

/// Model files already present in `cache_dir`.
pub fn list_cached_models(cache_dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(cache_dir) else {
        return Vec::new();
    };
    let mut models: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "bin"))
        .collect();
    models.sort();
    models
}
