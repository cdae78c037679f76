//! Query classification for chat routing.
//!
//! A free-form question goes to the classification backend, which is asked
//! for comma-separated labels. Only labels starting with a recognized
//! keyword survive; anything else is silently dropped. Classification never
//! fails upward: no backend, a backend error, or an all-garbage response
//! all fall back to a single `general <query>` label.

use std::sync::Arc;

use crate::llm::LlmProvider;

/// Recognized task keywords, in the vocabulary the classifier is prompted
/// with. `general` and `realtime` drive chat routing; the rest are task
/// labels surfaced to the caller as-is.
pub const TASK_KEYWORDS: &[&str] = &[
    "exit",
    "general",
    "realtime",
    "open",
    "close",
    "play",
    "generate image",
    "system",
    "content",
    "google search",
    "youtube search",
    "reminder",
];

const CLASSIFIER_PREAMBLE: &str = "You are a Decision-Making Model that categorizes queries. \
Respond with 'general (query)' for general questions, \
'realtime (query)' for queries needing up-to-date information, \
or specific function names for task automation.";

/// Classifies `query` into a non-empty label list.
pub async fn classify_query(classifier: Option<Arc<dyn LlmProvider>>, query: &str) -> Vec<String> {
    let fallback = vec![format!("general {query}")];

    let Some(provider) = classifier else {
        return fallback;
    };

    match provider.invoke(query, Some(CLASSIFIER_PREAMBLE)).await {
        Ok(raw) => {
            let labels = filter_labels(&raw);
            if labels.is_empty() {
                fallback
            } else {
                labels
            }
        }
        Err(err) => {
            tracing::error!("Error categorizing query: {}", err);
            fallback
        }
    }
}

/// True when any label routes to the realtime (fresh fetch) path.
pub fn is_realtime(labels: &[String]) -> bool {
    labels.iter().any(|label| label.starts_with("realtime"))
}

fn filter_labels(raw: &str) -> Vec<String> {
    raw.replace('\n', "")
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .filter(|token| TASK_KEYWORDS.iter().any(|kw| token.starts_with(kw)))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crate::core::errors::ApiError;

    struct FixedReply(Result<&'static str, &'static str>);

    #[async_trait]
    impl LlmProvider for FixedReply {
        fn name(&self) -> &str {
            "fixed"
        }
        async fn health_check(&self) -> Result<bool, ApiError> {
            Ok(true)
        }
        async fn invoke(&self, _: &str, _: Option<&str>) -> Result<String, ApiError> {
            match self.0 {
                Ok(reply) => Ok(reply.to_string()),
                Err(msg) => Err(ApiError::Internal(msg.to_string())),
            }
        }
    }

    #[tokio::test]
    async fn keeps_recognized_labels_only() {
        let provider: Arc<dyn LlmProvider> =
            Arc::new(FixedReply(Ok("realtime weather in tokyo, banana, play music")));
        let labels = classify_query(Some(provider), "weather?").await;
        assert_eq!(labels, vec!["realtime weather in tokyo", "play music"]);
    }

    #[tokio::test]
    async fn garbage_response_falls_back_to_general() {
        let provider: Arc<dyn LlmProvider> = Arc::new(FixedReply(Ok("???, nonsense, 42")));
        let labels = classify_query(Some(provider), "what is rust").await;
        assert_eq!(labels, vec!["general what is rust"]);
    }

    #[tokio::test]
    async fn backend_failure_falls_back_to_general() {
        let provider: Arc<dyn LlmProvider> = Arc::new(FixedReply(Err("rate limited")));
        let labels = classify_query(Some(provider), "latest news").await;
        assert_eq!(labels, vec!["general latest news"]);
    }

    #[tokio::test]
    async fn missing_backend_falls_back_to_general() {
        let labels = classify_query(None, "hello").await;
        assert_eq!(labels, vec!["general hello"]);
    }

    #[test]
    fn never_returns_empty_and_routes_realtime() {
        assert!(is_realtime(&["realtime stock price".to_string()]));
        assert!(!is_realtime(&["general hello".to_string()]));
    }
}
