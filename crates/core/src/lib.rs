pub mod answer;
pub mod cache;
pub mod error;
pub mod extractor;
pub mod loader;
pub mod models;
pub mod normalizer;
pub mod opener;
pub mod pdf;
pub mod placeholder;
pub mod render;
pub mod rerank;
pub mod search;

#[cfg(test)]
mod testing;

pub use answer::{
    build_prompt, synthesize, tidy_response, Answer, AnswerService, OpenRouterClient,
    DEFAULT_ANSWER_TIMEOUT,
};
pub use cache::DocumentCache;
pub use error::{AnswerError, ExtractError, LoadError};
pub use extractor::{join_runs_into_lines, page_batches, PageExtractor};
pub use loader::{
    category_from_file_name, default_sources, discover_sources, format_file_name, load_sources,
    CorpusLoader, CorpusMode, DefaultFetcher, LoadedCorpus, SkippedSource, SourceFetcher,
};
pub use models::{
    Document, DocumentMetadata, DocumentOrigin, ExtractionOptions, LoaderOptions, Page, PageImage,
    PageSize, SearchOptions, SearchResult, SourceDescriptor,
};
pub use normalizer::{normalize, parse_groups, Block, BlockGroup};
pub use opener::{open_by_name, open_result, DocumentOpener};
pub use pdf::{LopdfDecoder, PdfDecoder, PdfDocument, PdfPage, TextRun};
pub use placeholder::PlaceholderRegistry;
pub use render::render_for_display;
pub use rerank::rerank;
pub use search::{search, search_with};
