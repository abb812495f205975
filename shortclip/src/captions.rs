//! Caption segmentation: recognizer output in, short burn-in cues out.
//!
//! Short-form video wants three or four words on screen at a time. When the
//! recognizer supplies timed chunks, each chunk becomes one cue, or is split
//! into groups of `max_words_per_cue` words sharing the chunk's time span
//! evenly when it has more than `long_chunk_word_threshold` words. Without
//! usable chunks the full text is cut into word batches placed proportionally
//! across the segment.
//!
//! Emitted cues are ordered, never overlap, and lie inside the segment. A cue
//! with no room left before the segment end is dropped.

use tracing::{debug, info};

use crate::config::CaptionOptions;
use crate::types::{CaptionCue, TranscriptionResult};

/// Shortest cue we will emit, in seconds. Subtitle formats cannot express
/// zero or negative lengths.
pub const MIN_CUE_DURATION: f64 = 0.001;

/// Build the cue sequence for a segment of `total_duration` seconds.
///
/// Never fails: empty text with no chunks yields no cues.
pub fn build_cues(
    transcription: &TranscriptionResult,
    options: &CaptionOptions,
    total_duration: f64,
) -> Vec<CaptionCue> {
    let chunks = usable_chunks(transcription);
    let mut cues = CueSequence::new(total_duration);

    if chunks.is_empty() {
        info!("no timed chunks from recognizer, spreading words across segment");
        place_proportionally(&transcription.text, options, total_duration, &mut cues);
    } else {
        info!(chunks = chunks.len(), "building captions from recognizer timestamps");
        for chunk in &chunks {
            split_chunk(chunk, options, &mut cues);
        }
    }

    cues.finish()
}

struct TimedText<'a> {
    start: f64,
    end: f64,
    text: &'a str,
}

/// Chunks with both timestamps and some text, ordered by start time.
fn usable_chunks(transcription: &TranscriptionResult) -> Vec<TimedText<'_>> {
    let mut chunks: Vec<TimedText<'_>> = transcription
        .chunks
        .iter()
        .filter_map(|chunk| {
            let (start, end) = (chunk.start?, chunk.end?);
            let text = chunk.text.trim();
            if text.is_empty() || !start.is_finite() || !end.is_finite() {
                return None;
            }
            // reversed timestamps collapse to an instant at `start`
            Some(TimedText {
                start,
                end: end.max(start),
                text,
            })
        })
        .collect();
    chunks.sort_by(|a, b| a.start.total_cmp(&b.start));
    chunks
}

fn split_chunk(chunk: &TimedText<'_>, options: &CaptionOptions, cues: &mut CueSequence) {
    let words: Vec<&str> = chunk.text.split_whitespace().collect();

    if words.len() <= options.long_chunk_word_threshold {
        cues.push(chunk.start, chunk.end, words.join(" "));
        return;
    }

    let groups = words.len().div_ceil(options.max_words_per_cue);
    let step = (chunk.end - chunk.start) / groups as f64;
    for (i, group) in words.chunks(options.max_words_per_cue).enumerate() {
        let start = chunk.start + i as f64 * step;
        // clamp float drift on the last group
        let end = (start + step).min(chunk.end);
        cues.push(start, end, group.join(" "));
    }
}

fn place_proportionally(
    text: &str,
    options: &CaptionOptions,
    total_duration: f64,
    cues: &mut CueSequence,
) {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return;
    }

    let per_cue = options.max_words_per_cue;
    let starts: Vec<f64> = (0..words.len().div_ceil(per_cue))
        .map(|i| (i * per_cue) as f64 / words.len() as f64 * total_duration)
        .collect();

    for (i, batch) in words.chunks(per_cue).enumerate() {
        let start = starts[i];
        let mut end = (start + options.fallback_cue_duration).min(total_duration);
        if let Some(&next) = starts.get(i + 1) {
            end = end.min(next);
        }
        cues.push(start, end, batch.join(" "));
    }
}

/// Accumulates cues, assigning indices and enforcing timing bounds.
struct CueSequence {
    total_duration: f64,
    cues: Vec<CaptionCue>,
}

impl CueSequence {
    fn new(total_duration: f64) -> Self {
        Self {
            total_duration,
            cues: Vec::new(),
        }
    }

    fn push(&mut self, start: f64, end: f64, text: String) {
        if text.is_empty() {
            return;
        }

        // never start before the previous cue has ended
        let floor = self.cues.last().map_or(0.0, |prev| prev.end);
        let mut start = start.max(floor);
        let mut end = end;
        if self.total_duration > 0.0 {
            start = start.min((self.total_duration - MIN_CUE_DURATION).max(0.0));
            if start < floor {
                debug!(%text, "no room left in segment, dropping cue");
                return;
            }
            end = end.min(self.total_duration);
        }
        if end - start < MIN_CUE_DURATION {
            end = start + MIN_CUE_DURATION;
            if self.total_duration > 0.0 {
                end = end.min(self.total_duration);
            }
        }

        let index = self.cues.len() + 1;
        debug!(
            index,
            start = format!("{start:.3}"),
            end = format!("{end:.3}"),
            %text,
            "caption cue"
        );
        self.cues.push(CaptionCue {
            index,
            start,
            end,
            text,
        });
    }

    fn finish(self) -> Vec<CaptionCue> {
        self.cues
    }
}
