/// Face encoder backed by two ONNX Runtime sessions: a YOLO face detector
/// and an ArcFace embedding model.
///
/// Pipeline: decode → letterbox → detect → NMS → pick the most confident
/// face → crop with margin → 112x112 embed → L2-normalize.
use std::path::Path;
use std::sync::Mutex;

use crate::encoding::domain::face_encoder::{EncodeError, FaceEncoder};
use crate::encoding::infrastructure::image_decoder::decode_rgb;
use crate::encoding::infrastructure::math::{self, FaceBox};
use crate::shared::constants::EMBEDDING_DIMENSION;
use crate::shared::frame::Frame;
use crate::shared::signature::Signature;

/// Fallback detector input resolution when the model doesn't specify dimensions.
const DEFAULT_INPUT_SIZE: u32 = 640;

pub const DEFAULT_CONFIDENCE: f64 = 0.5;

const NMS_IOU_THRESH: f64 = 0.45;

/// Fraction of the face box added on each side before embedding.
const CROP_MARGIN: f64 = 0.1;

const EMBED_INPUT_SIZE: usize = 112;
const NORM_MEAN: f32 = 127.5;
const NORM_STD: f32 = 127.5;

pub struct OnnxFaceEncoder {
    detector: Mutex<ort::session::Session>,
    embedder: Mutex<ort::session::Session>,
    input_size: u32,
    confidence: f64,
}

fn inference_err(e: impl std::fmt::Display) -> EncodeError {
    EncodeError::Inference(e.to_string())
}

impl OnnxFaceEncoder {
    /// Loads both models. The detector input resolution is read from its
    /// NCHW input shape, falling back to 640 for dynamic shapes.
    pub fn new(
        detector_model: &Path,
        embedding_model: &Path,
        confidence: f64,
    ) -> Result<Self, EncodeError> {
        let detector = ort::session::Session::builder()
            .map_err(inference_err)?
            .with_execution_providers(preferred_execution_providers())
            .map_err(inference_err)?
            .commit_from_file(detector_model)
            .map_err(inference_err)?;

        let input_size = detector
            .inputs()
            .first()
            .and_then(|input| {
                if let ort::value::ValueType::Tensor { ref shape, .. } = input.dtype() {
                    if shape.len() >= 4 && shape[2] > 0 {
                        Some(shape[2] as u32)
                    } else {
                        None
                    }
                } else {
                    None
                }
            })
            .unwrap_or(DEFAULT_INPUT_SIZE);

        let intra_threads = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let embedder = ort::session::Session::builder()
            .map_err(inference_err)?
            .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)
            .map_err(inference_err)?
            .with_intra_threads(intra_threads)
            .map_err(inference_err)?
            .with_execution_providers(preferred_execution_providers())
            .map_err(inference_err)?
            .commit_from_file(embedding_model)
            .map_err(inference_err)?;

        log::info!(
            "Loaded face encoder (detector input {input_size}px, confidence {confidence})"
        );
        Ok(Self {
            detector: Mutex::new(detector),
            embedder: Mutex::new(embedder),
            input_size,
            confidence,
        })
    }

    fn detect_best_face(&self, frame: &Frame) -> Result<Option<FaceBox>, EncodeError> {
        let (input_tensor, letterbox) = letterbox(frame, self.input_size);
        let input_value = ort::value::Tensor::from_array(input_tensor).map_err(inference_err)?;

        let mut session = self
            .detector
            .lock()
            .map_err(|e| EncodeError::Inference(format!("Lock poisoned: {e}")))?;
        let outputs = session
            .run(ort::inputs![input_value])
            .map_err(inference_err)?;
        ensure_outputs(outputs.len(), "detector")?;
        let tensor = outputs[0]
            .try_extract_array::<f32>()
            .map_err(inference_err)?;
        let shape = tensor.shape().to_vec();
        let data = tensor
            .as_slice()
            .ok_or_else(|| EncodeError::Inference("detector output is not contiguous".into()))?;

        let boxes = parse_detections(data, &shape, self.confidence, &letterbox)?;
        Ok(math::nms(boxes, NMS_IOU_THRESH).into_iter().next())
    }

    fn embed(&self, crop: &Frame) -> Result<Vec<f32>, EncodeError> {
        let tensor = embedding_input(crop);
        let input_value = ort::value::Tensor::from_array(tensor).map_err(inference_err)?;
        let mut session = self
            .embedder
            .lock()
            .map_err(|e| EncodeError::Inference(format!("Lock poisoned: {e}")))?;
        let outputs = session
            .run(ort::inputs![input_value])
            .map_err(inference_err)?;
        ensure_outputs(outputs.len(), "embedder")?;
        let embedding_array = outputs[0]
            .try_extract_array::<f32>()
            .map_err(inference_err)?;
        let mut embedding = embedding_array
            .as_slice()
            .ok_or_else(|| EncodeError::Inference("embedding output is not contiguous".into()))?
            .to_vec();

        if embedding.len() != EMBEDDING_DIMENSION {
            return Err(EncodeError::Inference(format!(
                "embedding has {} values, expected {EMBEDDING_DIMENSION}",
                embedding.len()
            )));
        }
        math::l2_normalize(&mut embedding);
        Ok(embedding)
    }
}

impl FaceEncoder for OnnxFaceEncoder {
    fn encode(&self, image: &[u8]) -> Result<Option<Signature>, EncodeError> {
        let frame = decode_rgb(image)?;

        let Some(face) = self.detect_best_face(&frame)? else {
            return Ok(None);
        };
        log::debug!(
            "Detected face at ({:.0}, {:.0})-({:.0}, {:.0}) confidence {:.2}",
            face.x1,
            face.y1,
            face.x2,
            face.y2,
            face.confidence
        );

        let region = face.expanded(CROP_MARGIN);
        let Some(crop) = frame.crop(region.x1, region.y1, region.x2, region.y2) else {
            return Ok(None);
        };

        let embedding = self.embed(&crop)?;
        Ok(Some(Signature::from_f32(&embedding)?))
    }

    fn dimension(&self) -> usize {
        EMBEDDING_DIMENSION
    }
}

fn ensure_outputs(count: usize, model: &str) -> Result<(), EncodeError> {
    if count == 0 {
        return Err(EncodeError::Inference(format!("{model} produced no outputs")));
    }
    Ok(())
}

/// Return the preferred ONNX execution providers for the current platform.
///
/// Falls back to CPU if the platform-specific provider is unavailable.
fn preferred_execution_providers() -> Vec<ort::execution_providers::ExecutionProviderDispatch> {
    #[cfg(target_os = "macos")]
    {
        vec![ort::execution_providers::CoreMLExecutionProvider::default().build()]
    }
    #[cfg(target_os = "windows")]
    {
        vec![ort::execution_providers::DirectMLExecutionProvider::default().build()]
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        vec![]
    }
}

// ---------------------------------------------------------------------------
// Detector pre/post-processing
// ---------------------------------------------------------------------------

/// Mapping from letterboxed tensor coordinates back to source pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Letterbox {
    scale: f64,
    pad_x: u32,
    pad_y: u32,
}

impl Letterbox {
    fn to_source(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - self.pad_x as f64) / self.scale,
            (y - self.pad_y as f64) / self.scale,
        )
    }
}

/// Letterbox-resize a frame to `target_size` × `target_size`, NCHW float32.
fn letterbox(frame: &Frame, target_size: u32) -> (ndarray::Array4<f32>, Letterbox) {
    let fw = frame.width() as f64;
    let fh = frame.height() as f64;
    let target = target_size as f64;

    let scale = (target / fw).min(target / fh);
    let new_w = ((fw * scale).round() as u32).min(target_size);
    let new_h = ((fh * scale).round() as u32).min(target_size);
    let pad_x = (target_size - new_w) / 2;
    let pad_y = (target_size - new_h) / 2;

    // Padding is 114/255 gray, the YOLO training convention
    let gray = 114.0f32 / 255.0;
    let size = target_size as usize;
    let mut tensor = ndarray::Array4::<f32>::from_elem((1, 3, size, size), gray);

    for y in 0..new_h as usize {
        let src_y = (y as f64 / scale) as usize;
        for x in 0..new_w as usize {
            let src_x = (x as f64 / scale) as usize;
            let pixel = frame.pixel(src_x, src_y);
            let ty = pad_y as usize + y;
            let tx = pad_x as usize + x;
            for c in 0..3 {
                tensor[[0, c, ty, tx]] = pixel[c] as f32 / 255.0;
            }
        }
    }

    (
        tensor,
        Letterbox {
            scale,
            pad_x,
            pad_y,
        },
    )
}

/// Parses raw detector output into face boxes above `confidence`.
///
/// Accepts both `[1, features, detections]` (transposed, the usual YOLO
/// export) and `[1, detections, features]`. Each feature row starts with
/// `[cx, cy, w, h, conf]`; trailing keypoint values are ignored.
fn parse_detections(
    data: &[f32],
    shape: &[usize],
    confidence: f64,
    letterbox: &Letterbox,
) -> Result<Vec<FaceBox>, EncodeError> {
    if shape.len() != 3 {
        return Err(EncodeError::Inference(format!(
            "unexpected detector output shape: {shape:?}"
        )));
    }
    let transposed = shape[1] < shape[2];
    let (num_dets, num_feats) = if transposed {
        (shape[2], shape[1])
    } else {
        (shape[1], shape[2])
    };
    if num_feats < 5 || data.len() < num_dets * num_feats {
        return Err(EncodeError::Inference(format!(
            "detector output too small for shape {shape:?}"
        )));
    }

    let value = |det: usize, feat: usize| -> f64 {
        let idx = if transposed {
            feat * num_dets + det
        } else {
            det * num_feats + feat
        };
        data[idx] as f64
    };

    let mut boxes = Vec::new();
    for det in 0..num_dets {
        let conf = value(det, 4);
        if conf.is_nan() || conf < confidence {
            continue;
        }
        let (cx, cy, w, h) = (value(det, 0), value(det, 1), value(det, 2), value(det, 3));
        let (x1, y1) = letterbox.to_source(cx - w / 2.0, cy - h / 2.0);
        let (x2, y2) = letterbox.to_source(cx + w / 2.0, cy + h / 2.0);
        boxes.push(FaceBox {
            x1,
            y1,
            x2,
            y2,
            confidence: conf,
        });
    }
    Ok(boxes)
}

// ---------------------------------------------------------------------------
// Embedding preprocessing
// ---------------------------------------------------------------------------

/// Resize crop to 112x112, normalize to [-1, 1], NCHW layout.
fn embedding_input(crop: &Frame) -> ndarray::Array4<f32> {
    let src_w = crop.width() as f64;
    let src_h = crop.height() as f64;
    let size = EMBED_INPUT_SIZE as f64;

    let mut tensor = ndarray::Array4::<f32>::zeros((1, 3, EMBED_INPUT_SIZE, EMBED_INPUT_SIZE));
    for y in 0..EMBED_INPUT_SIZE {
        let src_y = ((y as f64 + 0.5) * src_h / size) as usize;
        for x in 0..EMBED_INPUT_SIZE {
            let src_x = ((x as f64 + 0.5) * src_w / size) as usize;
            let pixel = crop.pixel(src_x, src_y);
            for c in 0..3 {
                tensor[[0, c, y, x]] = (pixel[c] as f32 - NORM_MEAN) / NORM_STD;
            }
        }
    }
    tensor
}
