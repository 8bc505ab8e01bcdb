pub const DETECTOR_MODEL_NAME: &str = "yolo11n-pose_widerface.onnx";
pub const DETECTOR_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/yolo11n-pose_widerface.onnx";

pub const EMBEDDING_MODEL_NAME: &str = "w600k_r50.onnx";
pub const EMBEDDING_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/w600k_r50.onnx";

/// Output width of the ArcFace embedding model.
pub const EMBEDDING_DIMENSION: usize = 512;

/// Euclidean distance at or below which two signatures are the same face.
pub const DEFAULT_THRESHOLD: f64 = 0.6;

pub const CORPUS_FILENAME: &str = "faces_data.json";
pub const CORPUS_LOG_FILENAME: &str = "faces_data.jsonl";
pub const LEDGER_FILENAME: &str = "uploaded_faces.json";
pub const PENDING_DIRNAME: &str = "pending";

/// Object-store prefix for uploaded face images.
pub const ARTIFACT_PREFIX: &str = "faces";
/// Document-database collection for published face records.
pub const RECORD_COLLECTION: &str = "faces";
