use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SignatureError {
    #[error("signature is empty")]
    Empty,
    #[error("signature component {index} is not finite: {value}")]
    NonFinite { index: usize, value: f64 },
}

/// Fixed-length face descriptor produced by a [`FaceEncoder`].
///
/// Immutable once built; clones share the same backing buffer, so corpus
/// snapshots are cheap regardless of dimensionality.
///
/// [`FaceEncoder`]: crate::encoding::domain::face_encoder::FaceEncoder
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct Signature {
    values: Arc<[f64]>,
}

impl Signature {
    pub fn new(values: Vec<f64>) -> Result<Self, SignatureError> {
        if values.is_empty() {
            return Err(SignatureError::Empty);
        }
        if let Some((index, &value)) = values.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(SignatureError::NonFinite { index, value });
        }
        Ok(Self {
            values: values.into(),
        })
    }

    /// Widens an `f32` embedding (the usual ONNX output) into a signature.
    pub fn from_f32(values: &[f32]) -> Result<Self, SignatureError> {
        Self::new(values.iter().map(|&v| v as f64).collect())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.values.to_vec()
    }
}

impl TryFrom<Vec<f64>> for Signature {
    type Error = SignatureError;

    fn try_from(values: Vec<f64>) -> Result<Self, Self::Error> {
        Self::new(values)
    }
}

impl From<Signature> for Vec<f64> {
    fn from(signature: Signature) -> Self {
        signature.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_empty() {
        assert_eq!(Signature::new(vec![]).unwrap_err(), SignatureError::Empty);
    }

    #[test]
    fn test_rejects_nan_and_reports_index() {
        let err = Signature::new(vec![0.1, f64::NAN, 0.3]).unwrap_err();
        assert!(matches!(err, SignatureError::NonFinite { index: 1, .. }));
    }

    #[test]
    fn test_rejects_infinity() {
        assert!(Signature::new(vec![f64::INFINITY]).is_err());
    }

    #[test]
    fn test_from_f32_widens_values() {
        let sig = Signature::from_f32(&[0.5, -0.25]).unwrap();
        assert_eq!(sig.as_slice(), &[0.5, -0.25]);
    }

    #[test]
    fn test_clone_shares_buffer() {
        let sig = Signature::new(vec![1.0; 128]).unwrap();
        let copy = sig.clone();
        assert!(std::ptr::eq(sig.as_slice(), copy.as_slice()));
    }

    #[test]
    fn test_json_preserves_bits() {
        let values = vec![0.1, 1.0 / 3.0, -0.0871234987123, 1e-300];
        let sig = Signature::new(values.clone()).unwrap();
        let json = serde_json::to_string(&sig).unwrap();
        let back: Signature = serde_json::from_str(&json).unwrap();
        for (a, b) in values.iter().zip(back.as_slice()) {
            assert_eq!(a.to_bits(), b.to_bits());
        }
    }

    #[test]
    fn test_json_rejects_empty_array() {
        assert!(serde_json::from_str::<Signature>("[]").is_err());
    }
}
