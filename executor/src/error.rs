use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnnotateError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("annotation service returned no text")]
    EmptyResponse,

    #[error("annotation api key not configured")]
    MissingApiKey,

    #[error("annotation timed out after {0} ms")]
    Timeout(u64),
}
