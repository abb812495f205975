use rand::Rng;
use serde::{Deserialize, Serialize};

/// The window of the source video a clip is cut from, in source seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentSelection {
    pub start: f64,
    pub end: f64,
}

impl SegmentSelection {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Pick a random window of `requested` seconds inside `total`.
    ///
    /// The start is uniform in `[0, total - requested)`. Sources no longer
    /// than the request start at exactly 0, and the end never passes `total`.
    pub fn choose<R: Rng + ?Sized>(total: f64, requested: f64, rng: &mut R) -> Self {
        let span = (total - requested).max(0.0);
        let start = if span > 0.0 {
            rng.gen_range(0.0..span)
        } else {
            0.0
        };
        let end = (start + requested).min(total);
        Self { start, end }
    }

    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }

    /// `<start>s-<end>s` with one decimal place.
    pub fn label(&self) -> String {
        format!("{:.1}s-{:.1}s", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn test_short_source_starts_at_zero() {
        let mut rng = StdRng::seed_from_u64(7);
        let seg = SegmentSelection::choose(20.0, 30.0, &mut rng);
        assert_eq!(seg.start, 0.0);
        assert_eq!(seg.end, 20.0);
        assert_eq!(seg.duration(), 20.0);
    }

    #[test]
    fn test_exact_length_source_starts_at_zero() {
        let mut rng = StdRng::seed_from_u64(7);
        let seg = SegmentSelection::choose(30.0, 30.0, &mut rng);
        assert_eq!(seg.start, 0.0);
        assert_eq!(seg.end, 30.0);
    }

    #[test]
    fn test_start_within_range() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..1_000 {
            let seg = SegmentSelection::choose(600.0, 30.0, &mut rng);
            assert!(seg.start >= 0.0 && seg.start < 570.0, "start {}", seg.start);
            assert!((seg.duration() - 30.0).abs() < 1e-9);
            assert!(seg.end <= 600.0);
        }
    }

    #[test]
    fn test_label_format() {
        assert_eq!(SegmentSelection::new(0.0, 30.0).label(), "0.0s-30.0s");
        assert_eq!(SegmentSelection::new(101.26, 131.26).label(), "101.3s-131.3s");
    }
}
