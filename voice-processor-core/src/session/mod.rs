pub mod engine;
pub mod voice_processor;
