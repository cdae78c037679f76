pub mod chunker;
pub mod fetcher;
pub mod normalizer;

pub use chunker::split_content;
pub use fetcher::{ChromiumFetcher, PageCapture, PageFetcher};
pub use normalizer::{clean_and_extract, clean_content, extract_body, PageSummary};
