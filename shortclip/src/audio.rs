use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::transcode::RECOGNIZER_SAMPLE_RATE;

/// Read extracted clip audio as f32 samples in [-1.0, 1.0].
///
/// The file must be 16 kHz mono 16-bit PCM, which is what the transcoder's
/// audio extraction produces.
pub fn read_wav_samples(path: &Path) -> Result<Vec<f32>> {
    info!(path = %path.display(), "loading audio");

    if !path.exists() {
        return Err(Error::AudioDecode(format!(
            "audio file not found: {}",
            path.display()
        )));
    }

    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();

    if spec.channels != 1 {
        return Err(Error::AudioDecode(format!(
            "expected mono audio, found {} channels",
            spec.channels
        )));
    }
    if spec.sample_rate != RECOGNIZER_SAMPLE_RATE {
        return Err(Error::AudioDecode(format!(
            "expected {RECOGNIZER_SAMPLE_RATE} Hz, found {} Hz",
            spec.sample_rate
        )));
    }
    if spec.bits_per_sample != 16 || spec.sample_format != hound::SampleFormat::Int {
        return Err(Error::AudioDecode(format!(
            "expected 16-bit integer PCM, found {}-bit {:?}",
            spec.bits_per_sample, spec.sample_format
        )));
    }

    let duration = reader.duration() as f64 / RECOGNIZER_SAMPLE_RATE as f64;

    let samples = reader
        .samples::<i16>()
        .map(|s| s.map(|v| v as f32 / 32768.0))
        .collect::<std::result::Result<Vec<f32>, _>>()?;

    debug!(
        samples = samples.len(),
        duration_secs = format!("{duration:.1}"),
        "audio ready"
    );
    Ok(samples)
}

/// [`read_wav_samples`] on the blocking pool.
pub async fn load_wav_samples(path: PathBuf) -> Result<Vec<f32>> {
    tokio::task::spawn_blocking(move || read_wav_samples(&path))
        .await
        .map_err(|e| Error::AudioDecode(format!("audio decoding task failed: {e}")))?
}
