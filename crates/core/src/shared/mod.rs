pub mod constants;
pub mod face_record;
pub mod frame;
pub mod model_resolver;
pub mod signature;
