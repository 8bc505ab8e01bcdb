use thiserror::Error;

use crate::shared::constants::DEFAULT_THRESHOLD;
use crate::shared::signature::Signature;

#[derive(Error, Debug, Clone, Copy, PartialEq)]
#[error("similarity threshold must be a positive finite number, got {0}")]
pub struct InvalidThreshold(pub f64);

/// Maximum Euclidean distance at which two signatures count as the same face.
///
/// Lower is stricter: fewer submissions are flagged as duplicates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Threshold(f64);

impl Threshold {
    pub fn new(value: f64) -> Result<Self, InvalidThreshold> {
        if value.is_finite() && value > 0.0 {
            Ok(Self(value))
        } else {
            Err(InvalidThreshold(value))
        }
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

impl Default for Threshold {
    fn default() -> Self {
        Self(DEFAULT_THRESHOLD)
    }
}

impl TryFrom<f64> for Threshold {
    type Error = InvalidThreshold;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Euclidean distance over the common prefix of both signatures.
///
/// Callers guarantee equal dimensionality; the store rejects mismatches.
pub fn euclidean_distance(a: &Signature, b: &Signature) -> f64 {
    a.as_slice()
        .iter()
        .zip(b.as_slice())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

/// True iff some corpus signature lies within `threshold` of `candidate`.
///
/// The comparison is inclusive: a distance exactly equal to the threshold
/// is a duplicate. Stops at the first match.
pub fn is_duplicate(candidate: &Signature, corpus: &[Signature], threshold: Threshold) -> bool {
    corpus
        .iter()
        .any(|known| euclidean_distance(candidate, known) <= threshold.value())
}

/// Nearest-neighbour matcher over a corpus snapshot.
#[derive(Clone, Copy, Debug, Default)]
pub struct SimilarityMatcher {
    threshold: Threshold,
}

impl SimilarityMatcher {
    pub fn new(threshold: Threshold) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> Threshold {
        self.threshold
    }

    pub fn is_duplicate(&self, candidate: &Signature, corpus: &[Signature]) -> bool {
        is_duplicate(candidate, corpus, self.threshold)
    }

    /// Index and distance of the closest corpus entry, or `None` for an empty corpus.
    pub fn nearest(&self, candidate: &Signature, corpus: &[Signature]) -> Option<(usize, f64)> {
        corpus
            .iter()
            .map(|known| euclidean_distance(candidate, known))
            .enumerate()
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }
}
