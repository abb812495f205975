use std::fmt::Write as _;
use std::path::Path;

use tracing::debug;

use crate::error::Result;
use crate::types::CaptionCue;

/// Format seconds as an SRT timestamp: HH:MM:SS,mmm
///
/// Fractional seconds are truncated to whole milliseconds. Negative input is
/// treated as zero.
pub fn format_timestamp(seconds: f64) -> String {
    // 1e-6 ms absorbs binary representation error (1.001 * 1000 = 1000.99999...).
    let total_ms = (seconds.max(0.0) * 1000.0 + 1e-6).floor() as u64;
    let h = total_ms / 3_600_000;
    let m = (total_ms % 3_600_000) / 60_000;
    let s = (total_ms % 60_000) / 1_000;
    let ms = total_ms % 1_000;
    format!("{h:02}:{m:02}:{s:02},{ms:03}")
}

/// Render cues as an SRT document. An empty cue list gives an empty document.
pub fn to_srt(cues: &[CaptionCue]) -> String {
    let mut out = String::new();
    for cue in cues {
        let _ = write!(
            out,
            "{}\n{} --> {}\n{}\n\n",
            cue.index,
            format_timestamp(cue.start),
            format_timestamp(cue.end),
            cue.text.trim()
        );
    }
    out
}

pub async fn write_srt(path: &Path, cues: &[CaptionCue]) -> Result<()> {
    tokio::fs::write(path, to_srt(cues)).await?;
    debug!(path = %path.display(), cues = cues.len(), "subtitle file written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cue(index: usize, start: f64, end: f64, text: &str) -> CaptionCue {
        CaptionCue {
            index,
            start,
            end,
            text: text.into(),
        }
    }

    #[test]
    fn test_format_zero() {
        assert_eq!(format_timestamp(0.0), "00:00:00,000");
    }

    #[test]
    fn test_format_hours_minutes_seconds() {
        assert_eq!(format_timestamp(3661.5), "01:01:01,500");
    }

    #[test]
    fn test_format_truncates_not_rounds() {
        assert_eq!(format_timestamp(59.999), "00:00:59,999");
        assert_eq!(format_timestamp(1.0009), "00:00:01,000");
        assert_eq!(format_timestamp(1.001), "00:00:01,001");
    }

    #[test]
    fn test_format_negative_clamped() {
        assert_eq!(format_timestamp(-0.5), "00:00:00,000");
    }

    #[test]
    fn test_srt_document() {
        let srt = to_srt(&[
            cue(1, 0.0, 2.0, "un deux trois"),
            cue(2, 2.0, 4.0, " quatre "),
        ]);
        assert_eq!(
            srt,
            "1\n00:00:00,000 --> 00:00:02,000\nun deux trois\n\n\
             2\n00:00:02,000 --> 00:00:04,000\nquatre\n\n"
        );
    }

    #[test]
    fn test_srt_empty() {
        assert_eq!(to_srt(&[]), "");
    }

    #[tokio::test]
    async fn test_write_srt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("captions.srt");
        write_srt(&path, &[cue(1, 0.5, 1.25, "salut")]).await.unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "1\n00:00:00,500 --> 00:00:01,250\nsalut\n\n");
    }
}
