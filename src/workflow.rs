//! Orchestration of the scraping and extraction pipelines.
//!
//! Each operation drives the stateless components end to end, updates the
//! session record, and persists its artifact. Empty user input is rejected
//! before any backend call; backend failures degrade per the error policy
//! (fetch failures become "nothing to process", chat model failures become
//! readable replies) instead of tearing down the session.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::classify::{classify_query, is_realtime};
use crate::core::config::AppPaths;
use crate::core::errors::ApiError;
use crate::llm::LlmProvider;
use crate::extract::{default_fields, extract_chunks, format_structured};
use crate::scrape::{clean_and_extract, clean_content, extract_body, split_content};
use crate::search::{perform_search, result_urls};
use crate::session::ChatTurn;
use crate::state::AppState;
use crate::storage;

#[derive(Debug, Serialize)]
pub struct ScrapeOutcome {
    pub url: String,
    pub content: String,
    pub saved_to: String,
}

#[derive(Debug, Serialize)]
pub struct ExtractOutcome {
    pub result: String,
    pub chunk_count: usize,
    pub saved_to: String,
}

#[derive(Debug, Serialize)]
pub struct FormatOutcome {
    pub record: Value,
    pub json_path: String,
    pub csv_path: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SearchOutcome {
    pub urls: Vec<String>,
    pub saved_to: String,
}

#[derive(Debug, Serialize)]
pub struct BulkItem {
    pub url: String,
    pub content: String,
    pub extracted_data: Value,
}

#[derive(Debug, Serialize)]
pub struct BulkOutcome {
    pub query: String,
    pub requested: usize,
    pub scraped: usize,
    pub failed: usize,
    pub items: Vec<BulkItem>,
    pub saved_to: String,
    pub analysis: Option<String>,
    pub analysis_path: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatOutcome {
    pub reply: String,
    pub labels: Vec<String>,
}

/// Fetches one URL, normalizes it, and records it in the session.
/// `Ok(None)` means the fetch produced nothing to process.
pub async fn scrape_page(
    state: &AppState,
    url: &str,
    use_proxy: bool,
) -> Result<Option<ScrapeOutcome>, ApiError> {
    let url = url.trim();
    validate_url(url)?;

    let Some(capture) = state.fetcher.fetch(url, use_proxy).await else {
        return Ok(None);
    };

    let cleaned = clean_content(&extract_body(&capture.html));

    let timestamp = storage::format_timestamp();
    let saved = storage::save_text(
        &state.paths.raw_data_dir,
        &format!("raw_data_{timestamp}.txt"),
        &cleaned,
    )?;

    let mut session = state.session.lock().await;
    session.record_scrape(url, cleaned.clone());

    Ok(Some(ScrapeOutcome {
        url: url.to_string(),
        content: cleaned,
        saved_to: saved.display().to_string(),
    }))
}

/// Runs chunked extraction over the most recently scraped content.
pub async fn extract_last(state: &AppState, description: &str) -> Result<ExtractOutcome, ApiError> {
    let description = description.trim();
    if description.is_empty() {
        return Err(ApiError::BadRequest(
            "please describe what you want to extract".to_string(),
        ));
    }

    let content = {
        let session = state.session.lock().await;
        session.last_content.clone()
    };
    let Some(content) = content else {
        return Err(ApiError::BadRequest(
            "no scraped content available; scrape a website first".to_string(),
        ));
    };

    let chunks = split_content(&content, state.settings.scraping.chunk_size);
    let combined = extract_chunks(
        state.llm.extractor(),
        &chunks,
        description,
        &state.retry,
    )
    .await;

    let timestamp = storage::format_timestamp();
    let saved = storage::save_text(
        &state.paths.processed_data_dir,
        &format!("parsed_data_{timestamp}.txt"),
        &combined,
    )?;

    let mut session = state.session.lock().await;
    session.last_extraction = Some(combined.clone());

    Ok(ExtractOutcome {
        result: combined,
        chunk_count: chunks.len(),
        saved_to: saved.display().to_string(),
    })
}

/// Re-shapes the last extraction into a structured record via the JSON-mode
/// backend. Malformed JSON from the backend is fatal to this call.
pub async fn format_last(
    state: &AppState,
    fields: Option<Vec<String>>,
) -> Result<FormatOutcome, ApiError> {
    let Some(formatter) = state.llm.formatter() else {
        return Err(ApiError::ServiceUnavailable(
            "structured formatting requires OPENAI_API_KEY".to_string(),
        ));
    };

    let data = {
        let session = state.session.lock().await;
        session.last_extraction.clone()
    };
    let Some(data) = data else {
        return Err(ApiError::BadRequest(
            "no extraction result available; run an extraction first".to_string(),
        ));
    };

    let fields = fields.unwrap_or_else(default_fields);
    let record = format_structured(&formatter, &data, &fields).await?;

    let timestamp = storage::format_timestamp();
    let json_path = storage::save_json(
        &state.paths.processed_data_dir,
        &format!("formatted_data_{timestamp}.json"),
        &record,
    )?;

    let csv_path = match record.as_object() {
        Some(map) => Some(
            storage::save_csv(
                &state.paths.processed_data_dir,
                &format!("formatted_data_{timestamp}.csv"),
                std::slice::from_ref(map),
            )?
            .display()
            .to_string(),
        ),
        None => None,
    };

    Ok(FormatOutcome {
        record,
        json_path: json_path.display().to_string(),
        csv_path,
    })
}

/// Searches the web and persists the URL list.
pub async fn search_links(
    state: &AppState,
    query: &str,
    count: usize,
) -> Result<SearchOutcome, ApiError> {
    let query = query.trim();
    if query.is_empty() {
        return Err(ApiError::BadRequest("please enter a search query".to_string()));
    }

    let results = perform_search(&state.settings.search, query, count, &state.retry).await?;
    let urls = result_urls(&results);

    let timestamp = storage::format_timestamp();
    let saved = storage::save_text(
        &state.paths.raw_data_dir,
        &format!("search_results_{timestamp}.txt"),
        &urls.join("\n"),
    )?;

    Ok(SearchOutcome {
        urls,
        saved_to: saved.display().to_string(),
    })
}

/// Searches and scrapes the top results sequentially, then closes with an
/// AI summary of everything that survived. A URL that fails to fetch is
/// logged and skipped; the batch continues with the rest.
pub async fn bulk_scrape(
    state: &AppState,
    query: &str,
    count: usize,
) -> Result<BulkOutcome, ApiError> {
    let search = search_links(state, query, count).await?;
    let (items, failed) = scrape_batch(state, &search.urls, query).await?;

    let timestamp = storage::format_timestamp();
    let artifact = serde_json::to_value(&items).map_err(ApiError::internal)?;
    let saved = storage::save_json(
        &state.paths.raw_data_dir,
        &format!("bulk_scrape_{timestamp}.json"),
        &artifact,
    )?;

    let (analysis, analysis_path) =
        match analyze_batch(&state.paths, state.llm.extractor(), &items, query, &timestamp).await? {
            Some((analysis, path)) => (Some(analysis), Some(path)),
            None => (None, None),
        };

    Ok(BulkOutcome {
        query: query.trim().to_string(),
        requested: search.urls.len(),
        scraped: items.len(),
        failed,
        items,
        saved_to: saved.display().to_string(),
        analysis,
        analysis_path,
    })
}

/// Summarizes a non-empty batch against the search query and persists the
/// summary. A model failure is logged and yields no analysis, not an error.
async fn analyze_batch(
    paths: &AppPaths,
    provider: Arc<dyn LlmProvider>,
    items: &[BulkItem],
    query: &str,
    timestamp: &str,
) -> Result<Option<(String, String)>, ApiError> {
    if items.is_empty() {
        return Ok(None);
    }

    let combined = items
        .iter()
        .map(|item| item.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");
    let system = format!(
        "You are analyzing content related to the search query: {query}. \
         Provide a comprehensive summary."
    );

    let analysis = match provider.invoke(&combined, Some(&system)).await {
        Ok(text) => text,
        Err(err) => {
            tracing::error!("Batch analysis failed: {}", err);
            return Ok(None);
        }
    };

    let saved = storage::save_text(
        &paths.processed_data_dir,
        &format!("ai_response_{timestamp}.txt"),
        &analysis,
    )?;

    Ok(Some((analysis, saved.display().to_string())))
}

/// Scrapes each URL in order, skipping failures. Returns the surviving
/// items and the failure count.
async fn scrape_batch(
    state: &AppState,
    urls: &[String],
    query: &str,
) -> Result<(Vec<BulkItem>, usize), ApiError> {
    let mut items = Vec::new();
    let mut failed = 0;

    for url in urls {
        let Some(capture) = state.fetcher.fetch(url, false).await else {
            tracing::warn!("Failed to scrape {}", url);
            failed += 1;
            continue;
        };

        let cleaned = clean_content(&extract_body(&capture.html));
        let summary = clean_and_extract(&capture.html, query);

        let mut session = state.session.lock().await;
        session.record_scrape(url, cleaned.clone());
        drop(session);

        items.push(BulkItem {
            url: url.clone(),
            content: cleaned,
            extracted_data: serde_json::to_value(&summary).map_err(ApiError::internal)?,
        });
    }

    Ok((items, failed))
}

/// One chat turn: classify, answer from fresh or stored content, persist
/// the transcript. Model failures become readable replies, never errors.
pub async fn chat(state: &AppState, message: &str) -> Result<ChatOutcome, ApiError> {
    let message = message.trim();
    if message.is_empty() {
        return Err(ApiError::BadRequest("please enter a question".to_string()));
    }

    {
        let mut session = state.session.lock().await;
        session.push_turn(ChatTurn::user(message));
    }

    let labels = classify_query(state.llm.classifier(), message).await;

    let reply = if is_realtime(&labels) {
        answer_realtime(state, message).await
    } else {
        answer_from_stored(state, message).await
    };

    let history = {
        let mut session = state.session.lock().await;
        session.push_turn(ChatTurn::assistant(reply.clone()));
        session.history_json()
    };

    let timestamp = storage::format_timestamp();
    storage::save_json(
        &state.paths.processed_data_dir,
        &format!("chat_history_{timestamp}.json"),
        &history,
    )?;
    storage::save_json(&state.paths.processed_data_dir, "chat_log.json", &history)?;

    Ok(ChatOutcome { reply, labels })
}

/// Realtime path: fresh search, scrape the top hit, answer from it.
async fn answer_realtime(state: &AppState, message: &str) -> String {
    let results = match perform_search(&state.settings.search, message, 5, &state.retry).await {
        Ok(results) if !results.is_empty() => results,
        Ok(_) => return "I couldn't find relevant information for your query.".to_string(),
        Err(err) => {
            tracing::error!("Realtime search failed: {}", err);
            return "I couldn't find relevant information for your query.".to_string();
        }
    };

    let Some(capture) = state.fetcher.fetch(&results[0].url, false).await else {
        return "I couldn't retrieve the latest information. Please try a different question."
            .to_string();
    };

    let cleaned = clean_content(&extract_body(&capture.html));
    {
        let mut session = state.session.lock().await;
        session.record_scrape(&results[0].url, cleaned.clone());
    }

    let system = format!(
        "You are answering a question based on the latest information from the web. \
         The question is: {message}"
    );
    invoke_chat_model(state, &cleaned, &system).await
}

/// General path: reuse previously stored content instead of refetching.
async fn answer_from_stored(state: &AppState, message: &str) -> String {
    let content = {
        let session = state.session.lock().await;
        session.last_content.clone()
    };

    let Some(content) = content else {
        return "I don't have any data to reference. Please scrape some websites first."
            .to_string();
    };

    let system = format!(
        "You are answering a question based on the provided data. The question is: {message}"
    );
    invoke_chat_model(state, &content, &system).await
}

async fn invoke_chat_model(state: &AppState, content: &str, system: &str) -> String {
    match state.llm.extractor().invoke(content, Some(system)).await {
        Ok(reply) => reply,
        Err(err) => {
            tracing::error!("Chat model invocation failed: {}", err);
            format!("Error: {err}")
        }
    }
}

fn validate_url(url: &str) -> Result<(), ApiError> {
    if url.is_empty() {
        return Err(ApiError::BadRequest("please enter a URL".to_string()));
    }
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ApiError::BadRequest(
            "invalid URL: must start with http:// or https://".to_string(),
        ));
    }
    url::Url::parse(url)
        .map(|_| ())
        .map_err(|err| ApiError::BadRequest(format!("invalid URL: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::Utc;

    use crate::core::config::{AppPaths, Settings};
    use crate::scrape::{PageCapture, PageFetcher};

    struct StubFetcher {
        html: Option<String>,
    }

    #[async_trait]
    impl PageFetcher for StubFetcher {
        async fn fetch(&self, url: &str, _use_proxy: bool) -> Option<PageCapture> {
            self.html.clone().map(|html| PageCapture {
                url: url.to_string(),
                html,
                fetched_at: Utc::now(),
            })
        }
    }

    fn test_state(tmp: &tempfile::TempDir, html: Option<&str>) -> Arc<AppState> {
        let paths = Arc::new(AppPaths::with_data_dir(
            tmp.path().to_path_buf(),
            tmp.path().join("data"),
        ));
        AppState::new(
            paths,
            Settings::default(),
            Arc::new(StubFetcher {
                html: html.map(str::to_string),
            }),
        )
    }

    #[tokio::test]
    async fn scrape_rejects_malformed_urls() {
        let tmp = tempfile::tempdir().unwrap();
        let state = test_state(&tmp, None);

        assert!(matches!(
            scrape_page(&state, "", false).await,
            Err(ApiError::BadRequest(_))
        ));
        assert!(matches!(
            scrape_page(&state, "ftp://example.com", false).await,
            Err(ApiError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn scrape_failure_yields_none_without_session_update() {
        let tmp = tempfile::tempdir().unwrap();
        let state = test_state(&tmp, None);

        let outcome = scrape_page(&state, "https://example.com", false)
            .await
            .unwrap();
        assert!(outcome.is_none());

        let session = state.session.lock().await;
        assert!(session.scraped_urls.is_empty());
        assert!(session.last_content.is_none());
    }

    #[tokio::test]
    async fn scrape_persists_artifact_and_records_session() {
        let tmp = tempfile::tempdir().unwrap();
        let state = test_state(
            &tmp,
            Some("<html><body><p>Hello world</p><script>x()</script></body></html>"),
        );

        let outcome = scrape_page(&state, "https://example.com", false)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(outcome.content, "Hello world");
        assert!(std::path::Path::new(&outcome.saved_to).exists());
        assert!(outcome.saved_to.contains("raw_data_"));

        let session = state.session.lock().await;
        assert_eq!(session.scraped_urls, vec!["https://example.com"]);
        assert_eq!(session.last_content.as_deref(), Some("Hello world"));
    }

    #[tokio::test]
    async fn extract_requires_description_and_content() {
        let tmp = tempfile::tempdir().unwrap();
        let state = test_state(&tmp, None);

        assert!(matches!(
            extract_last(&state, "   ").await,
            Err(ApiError::BadRequest(_))
        ));
        assert!(matches!(
            extract_last(&state, "product names").await,
            Err(ApiError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn format_unavailable_without_api_key() {
        let tmp = tempfile::tempdir().unwrap();
        let state = test_state(&tmp, None);

        assert!(matches!(
            format_last(&state, None).await,
            Err(ApiError::ServiceUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn batch_skips_failed_urls_and_keeps_the_rest() {
        struct FlakyFetcher;

        #[async_trait]
        impl PageFetcher for FlakyFetcher {
            async fn fetch(&self, url: &str, _use_proxy: bool) -> Option<PageCapture> {
                if url.contains("broken") {
                    return None;
                }
                Some(PageCapture {
                    url: url.to_string(),
                    html: format!("<html><body><p>page for {url}</p></body></html>"),
                    fetched_at: Utc::now(),
                })
            }
        }

        let tmp = tempfile::tempdir().unwrap();
        let paths = Arc::new(AppPaths::with_data_dir(
            tmp.path().to_path_buf(),
            tmp.path().join("data"),
        ));
        let state = AppState::new(paths, Settings::default(), Arc::new(FlakyFetcher));

        let urls: Vec<String> = (1..=5)
            .map(|i| {
                if i == 3 {
                    "https://broken.example".to_string()
                } else {
                    format!("https://site{i}.example")
                }
            })
            .collect();

        let (items, failed) = scrape_batch(&state, &urls, "query").await.unwrap();

        assert_eq!(items.len(), 4);
        assert_eq!(failed, 1);
        assert!(items.iter().all(|item| !item.url.contains("broken")));
        assert!(items[0].content.contains("site1"));

        let session = state.session.lock().await;
        assert_eq!(session.scraped_urls.len(), 4);
    }

    struct SummaryProvider {
        reply: Result<&'static str, &'static str>,
        seen_system: std::sync::Mutex<Option<String>>,
    }

    impl SummaryProvider {
        fn new(reply: Result<&'static str, &'static str>) -> Arc<Self> {
            Arc::new(Self {
                reply,
                seen_system: std::sync::Mutex::new(None),
            })
        }
    }

    #[async_trait]
    impl crate::llm::LlmProvider for SummaryProvider {
        fn name(&self) -> &str {
            "summary"
        }
        async fn health_check(&self) -> Result<bool, ApiError> {
            Ok(true)
        }
        async fn invoke(&self, _: &str, system: Option<&str>) -> Result<String, ApiError> {
            *self.seen_system.lock().unwrap() = system.map(str::to_string);
            match self.reply {
                Ok(text) => Ok(text.to_string()),
                Err(msg) => Err(ApiError::Internal(msg.to_string())),
            }
        }
    }

    fn batch_items() -> Vec<BulkItem> {
        vec![
            BulkItem {
                url: "https://a.example".to_string(),
                content: "first page".to_string(),
                extracted_data: serde_json::Value::Null,
            },
            BulkItem {
                url: "https://b.example".to_string(),
                content: "second page".to_string(),
                extracted_data: serde_json::Value::Null,
            },
        ]
    }

    #[tokio::test]
    async fn batch_analysis_persists_summary_artifact() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = AppPaths::with_data_dir(tmp.path().to_path_buf(), tmp.path().join("data"));
        let provider = SummaryProvider::new(Ok("a concise summary"));

        let outcome = analyze_batch(&paths, provider.clone(), &batch_items(), "rust news", "20250309_101112")
            .await
            .unwrap();

        let (analysis, path) = outcome.unwrap();
        assert_eq!(analysis, "a concise summary");
        assert!(path.ends_with("ai_response_20250309_101112.txt"));
        assert_eq!(
            storage::load_text(&paths.processed_data_dir, "ai_response_20250309_101112.txt")
                .unwrap(),
            "a concise summary"
        );

        let system = provider.seen_system.lock().unwrap().clone().unwrap();
        assert!(system.contains("search query: rust news"));
    }

    #[tokio::test]
    async fn batch_analysis_skips_empty_batch() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = AppPaths::with_data_dir(tmp.path().to_path_buf(), tmp.path().join("data"));
        let provider = SummaryProvider::new(Ok("unused"));

        let outcome = analyze_batch(&paths, provider, &[], "query", "20250309_101112")
            .await
            .unwrap();
        assert!(outcome.is_none());
    }

    #[tokio::test]
    async fn batch_analysis_failure_yields_no_artifact() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = AppPaths::with_data_dir(tmp.path().to_path_buf(), tmp.path().join("data"));
        let provider = SummaryProvider::new(Err("model offline"));

        let outcome = analyze_batch(&paths, provider, &batch_items(), "query", "20250309_101112")
            .await
            .unwrap();
        assert!(outcome.is_none());
        assert!(
            storage::load_text(&paths.processed_data_dir, "ai_response_20250309_101112.txt")
                .is_none()
        );
    }

    #[tokio::test]
    async fn chat_rejects_empty_message() {
        let tmp = tempfile::tempdir().unwrap();
        let state = test_state(&tmp, None);

        assert!(matches!(
            chat(&state, "  ").await,
            Err(ApiError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn chat_without_data_prompts_for_scrape() {
        let tmp = tempfile::tempdir().unwrap();
        let state = test_state(&tmp, None);

        // No classifier configured, so the query falls back to a general
        // label and answers from stored content, of which there is none.
        let outcome = chat(&state, "what did the article say?").await.unwrap();
        assert!(outcome.reply.contains("scrape some websites first"));
        assert_eq!(outcome.labels, vec!["general what did the article say?"]);

        let session = state.session.lock().await;
        assert_eq!(session.chat_history.len(), 2);
        assert_eq!(session.chat_history[0].role, "user");
        assert_eq!(session.chat_history[1].role, "assistant");

        let log = storage::load_json(&state.paths.processed_data_dir, "chat_log.json").unwrap();
        assert_eq!(log.as_array().unwrap().len(), 2);
    }
}
