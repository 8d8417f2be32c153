//! Abstraction over the explanation service.

use async_trait::async_trait;

use crate::error::AnnotateError;
use scheduler::AnnotationRequest;
use signals::Direction;

/// Produces a one-sentence explanation for a resolved signal.
///
/// Implementations may be slow or fail; the executor bounds every call
/// with a timeout and keeps the technical rationale on any error.
#[async_trait]
pub trait Annotator: Send + Sync + 'static {
    async fn annotate(&self, req: &AnnotationRequest) -> Result<String, AnnotateError>;
}

/// Prompt shared by text-generation backends.
pub fn build_prompt(req: &AnnotationRequest) -> String {
    let trade = match req.direction {
        Direction::Up => "UP",
        Direction::Down => "DOWN",
    };
    format!(
        "Analyze this binary trade outcome:\n\
         Instrument: {}\n\
         Trade type: {trade}\n\
         Entry: {}\n\
         Close: {}\n\
         Technical reason for signal: {}\n\n\
         Provide a very brief 1-sentence expert analysis of why this trade won or lost \
         based on typical OTC market volatility.",
        req.instrument, req.entry_price, req.close_price, req.rationale
    )
}
