use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("pdf decode error: {0}")]
    Decode(String),

    #[error("page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: u32, total: u32 },

    #[error("text extraction failed on page {page}: {details}")]
    PageText { page: u32, details: String },

    #[error("image {name} could not be read: {details}")]
    Image { name: String, details: String },

    #[error("image {name} was not resolved within {timeout:?}")]
    ImageTimeout { name: String, timeout: Duration },

    #[error("image encode error: {0}")]
    ImageEncode(#[from] image::ImageError),
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("fetch of {source_path} returned status {status}")]
    Status { source_path: String, status: u16 },

    #[error("invalid source: {0}")]
    InvalidSource(String),

    #[error("corpus configuration error: {0}")]
    Config(#[from] serde_json::Error),

    #[error(transparent)]
    Extract(#[from] ExtractError),
}

#[derive(Debug, Error)]
pub enum AnswerError {
    #[error("answer service api key is not configured")]
    MissingApiKey,

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("answer service returned status {0}")]
    Status(u16),

    #[error("answer service returned no content")]
    EmptyResponse,
}

pub type Result<T, E = LoadError> = std::result::Result<T, E>;
