//! Chunked extraction against a language model.
//!
//! Each chunk is sent independently and sequentially; a chunk that keeps
//! failing contributes a sentinel error entry instead of aborting the run,
//! so the pipeline always yields one entry per input chunk, in input order.

use std::sync::Arc;

use serde_json::Value;

use super::retry::RetryPolicy;
use crate::core::errors::ApiError;
use crate::llm::openai::OpenAiProvider;
use crate::llm::LlmProvider;

const FORMAT_SYSTEM_MESSAGE: &str = "You are an intelligent text extraction and conversion \
assistant. Your task is to extract structured information from the given text and convert it \
into a pure JSON format. The JSON should contain only the structured data extracted from the \
text, with no additional commentary, explanations, or extraneous information. Please process \
the following text and provide the output in pure JSON format with no words before or after \
the JSON:";

/// Default target fields for structured formatting.
pub fn default_fields() -> Vec<String> {
    ["Title", "Content", "Author", "Date", "URL"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn build_prompt(chunk: &str, description: &str) -> String {
    format!(
        "You are tasked with extracting specific information from the following text content: \
         {chunk}. Please follow these instructions carefully: \n\n\
         1. **Extract Information:** Only extract the information that directly matches the \
         provided description: {description}. \
         2. **No Extra Content:** Do not include any additional text, comments, or explanations \
         in your response. \
         3. **Empty Response:** If no information matches the description, return an empty \
         string ('').\
         4. **Direct Data Only:** Your output should contain only the data that is explicitly \
         requested, with no other text."
    )
}

/// Runs the extraction instruction against every chunk and joins the
/// per-chunk responses by newline, in input order.
pub async fn extract_chunks(
    provider: Arc<dyn LlmProvider>,
    chunks: &[String],
    description: &str,
    policy: &RetryPolicy,
) -> String {
    let mut results = Vec::with_capacity(chunks.len());

    for (index, chunk) in chunks.iter().enumerate() {
        let prompt = build_prompt(chunk, description);

        let outcome = policy
            .run("chunk extraction", || {
                let provider = provider.clone();
                let prompt = prompt.clone();
                async move { provider.invoke(&prompt, None).await }
            })
            .await;

        match outcome {
            Ok(response) => {
                tracing::debug!("Chunk {}/{} extracted", index + 1, chunks.len());
                results.push(response);
            }
            Err(err) => {
                // Keep one entry per chunk even when it is a dead loss.
                results.push(format!("Error processing content: {err}"));
            }
        }
    }

    let combined = results.join("\n");
    if combined.trim().is_empty() {
        String::new()
    } else {
        combined
    }
}

/// Asks the JSON-mode backend to re-shape `data` into a record with the
/// given fields. A response that fails to parse as JSON is a hard error:
/// the backend was explicitly asked for a JSON-only reply, and retrying a
/// consistently malformed backend will not fix it.
pub async fn format_structured(
    formatter: &OpenAiProvider,
    data: &str,
    fields: &[String],
) -> Result<Value, ApiError> {
    let user_message = format!(
        "Extract the following information from the provided text: \nPage content: \n\n{data}\
         \n\nInformation to extract: {fields:?}"
    );

    let raw = formatter.invoke_json(&user_message, FORMAT_SYSTEM_MESSAGE).await?;
    tracing::info!("Formatted data received from API");

    serde_json::from_str::<Value>(&raw).map_err(|err| {
        tracing::error!("JSON decoding error: {}", err);
        ApiError::MalformedResponse(format!(
            "the formatted data could not be decoded into JSON: {err}"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Stub backend that fails a fixed number of times before answering.
    struct ScriptedProvider {
        calls: AtomicUsize,
        failures_before_success: usize,
        reply: String,
    }

    impl ScriptedProvider {
        fn new(failures_before_success: usize, reply: &str) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                failures_before_success,
                reply: reply.to_string(),
            })
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn health_check(&self) -> Result<bool, ApiError> {
            Ok(true)
        }

        async fn invoke(&self, _prompt: &str, _system: Option<&str>) -> Result<String, ApiError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures_before_success {
                Err(ApiError::Internal("simulated backend failure".to_string()))
            } else {
                Ok(self.reply.clone())
            }
        }
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            jitter: false,
        }
    }

    #[tokio::test]
    async fn joins_chunk_results_in_order() {
        /// Echoes a marker derived from the prompt so order is observable.
        struct EchoProvider;

        #[async_trait]
        impl LlmProvider for EchoProvider {
            fn name(&self) -> &str {
                "echo"
            }
            async fn health_check(&self) -> Result<bool, ApiError> {
                Ok(true)
            }
            async fn invoke(&self, prompt: &str, _: Option<&str>) -> Result<String, ApiError> {
                for marker in ["alpha", "beta", "gamma"] {
                    if prompt.contains(marker) {
                        return Ok(format!("got {marker}"));
                    }
                }
                Ok("got nothing".to_string())
            }
        }

        let chunks = vec!["alpha".to_string(), "beta".to_string(), "gamma".to_string()];
        let combined =
            extract_chunks(Arc::new(EchoProvider), &chunks, "markers", &fast_policy()).await;
        assert_eq!(combined, "got alpha\ngot beta\ngot gamma");
    }

    #[tokio::test]
    async fn recovers_from_transient_failures_without_duplicates() {
        let provider = ScriptedProvider::new(2, "recovered");
        let chunks = vec!["only chunk".to_string()];

        let combined = extract_chunks(provider.clone(), &chunks, "d", &fast_policy()).await;

        assert_eq!(combined, "recovered");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausted_chunk_gets_sentinel_entry() {
        // Fails forever: every chunk burns all attempts.
        let provider = ScriptedProvider::new(usize::MAX, "unused");
        let chunks = vec!["a".to_string(), "b".to_string()];

        let combined = extract_chunks(provider, &chunks, "d", &fast_policy()).await;

        let entries: Vec<&str> = combined.split('\n').collect();
        assert_eq!(entries.len(), chunks.len());
        assert!(entries
            .iter()
            .all(|entry| entry.starts_with("Error processing content:")));
    }

    #[tokio::test]
    async fn no_match_yields_empty_string() {
        let provider = ScriptedProvider::new(0, "");
        let chunks = vec!["no prices here".to_string()];

        let combined = extract_chunks(provider, &chunks, "get all prices", &fast_policy()).await;
        assert_eq!(combined, "");
    }

    #[test]
    fn default_fields_match_schema_hint() {
        assert_eq!(
            default_fields(),
            vec!["Title", "Content", "Author", "Date", "URL"]
        );
    }
}
