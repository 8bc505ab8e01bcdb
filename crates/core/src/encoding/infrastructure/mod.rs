pub mod image_decoder;
pub mod math;
pub mod onnx_face_encoder;
