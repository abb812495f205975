//! Caption segmentation on a canned transcription, no external tools needed.
//!
//! Usage: cargo run --example captions

use shortclip::{captions, subtitle, CaptionOptions, TranscriptionChunk, TranscriptionResult};

fn main() -> shortclip::Result<()> {
    let transcription = TranscriptionResult {
        text: "salut tout le monde aujourd'hui on parle de Rust et de sous-titres".into(),
        chunks: vec![
            TranscriptionChunk::new(0.0, 1.6, " salut tout le monde"),
            TranscriptionChunk::new(1.6, 5.2, " aujourd'hui on parle de Rust et de sous-titres"),
        ],
    };

    let options = CaptionOptions::new().max_words_per_cue(2)?;
    let cues = captions::build_cues(&transcription, &options, 30.0);
    print!("{}", subtitle::to_srt(&cues));

    // the same text without timing falls back to proportional placement
    let untimed = TranscriptionResult::plain(transcription.text);
    let cues = captions::build_cues(&untimed, &CaptionOptions::default(), 30.0);
    print!("{}", subtitle::to_srt(&cues));

    Ok(())
}
