pub mod pipeline;
pub mod retry;

pub use pipeline::{default_fields, extract_chunks, format_structured};
pub use retry::RetryPolicy;
