use thiserror::Error;

use crate::shared::signature::{Signature, SignatureError};

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("image could not be decoded: {0}")]
    Decode(String),
    #[error("face encoder inference failed: {0}")]
    Inference(String),
    #[error("encoder produced an invalid signature: {0}")]
    InvalidSignature(#[from] SignatureError),
}

/// Domain interface for turning raw image bytes into a face signature.
///
/// `Ok(None)` means the image decoded fine but contained no detectable face.
/// When several faces are present, implementations pick one.
pub trait FaceEncoder: Send + Sync {
    fn encode(&self, image: &[u8]) -> Result<Option<Signature>, EncodeError>;

    /// Length of every signature this encoder produces.
    fn dimension(&self) -> usize;
}
