pub mod annotator;
pub mod error;
pub mod gemini;
pub mod worker;

pub use annotator::{Annotator, build_prompt};
pub use error::AnnotateError;
pub use gemini::{GeminiConfig, GenerativeAnnotator};
pub use worker::{AnnotationExecutor, AnnotationResult, ExecutorConfig};
