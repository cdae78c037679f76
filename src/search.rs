//! Web-search boundary.
//!
//! Google Custom Search when a key and engine id are configured, with a
//! DuckDuckGo instant-answer fallback that needs no credentials. The whole
//! call is wrapped in the shared retry policy; search backends rate-limit
//! aggressively and a transient failure is the common case, not the edge.

use serde::Serialize;
use serde_json::Value;

use crate::core::config::SearchSettings;
use crate::core::errors::ApiError;
use crate::extract::RetryPolicy;

#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// Searches for `query`, returning up to `count` results in rank order.
pub async fn perform_search(
    settings: &SearchSettings,
    query: &str,
    count: usize,
    policy: &RetryPolicy,
) -> Result<Vec<SearchResult>, ApiError> {
    policy
        .run("web search", || {
            let settings = settings.clone();
            let query = query.to_string();
            async move { search_once(&settings, &query, count).await }
        })
        .await
}

/// Convenience view: just the URLs, in rank order.
pub fn result_urls(results: &[SearchResult]) -> Vec<String> {
    results.iter().map(|r| r.url.clone()).collect()
}

async fn search_once(
    settings: &SearchSettings,
    query: &str,
    count: usize,
) -> Result<Vec<SearchResult>, ApiError> {
    if let (Some(api_key), Some(engine_id)) =
        (&settings.google_api_key, &settings.google_engine_id)
    {
        match google_search(query, api_key, engine_id, count).await {
            Ok(results) if !results.is_empty() => return Ok(results),
            Ok(_) => tracing::info!("Google search returned nothing, trying DuckDuckGo"),
            Err(err) => tracing::warn!("Google search failed: {}, trying DuckDuckGo", err),
        }
    }

    let mut results = duckduckgo_search(query).await?;
    results.truncate(count);
    Ok(results)
}

async fn google_search(
    query: &str,
    api_key: &str,
    engine_id: &str,
    count: usize,
) -> Result<Vec<SearchResult>, ApiError> {
    let url = format!(
        "https://www.googleapis.com/customsearch/v1?key={}&cx={}&q={}&num={}",
        api_key,
        engine_id,
        urlencoding::encode(query),
        count.clamp(1, 10)
    );

    let response = reqwest::Client::new()
        .get(url)
        .send()
        .await
        .map_err(ApiError::internal)?;

    if !response.status().is_success() {
        return Err(ApiError::Internal(format!(
            "Google search failed: {}",
            response.status()
        )));
    }

    let payload: Value = response.json().await.map_err(ApiError::internal)?;
    let items = payload
        .get("items")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default();

    let mut results = Vec::new();
    for item in items {
        let title = item
            .get("title")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();
        let url = item
            .get("link")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();
        let snippet = item
            .get("snippet")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();
        if !title.is_empty() && !url.is_empty() {
            results.push(SearchResult {
                title,
                url,
                snippet,
            });
        }
    }

    Ok(results)
}

async fn duckduckgo_search(query: &str) -> Result<Vec<SearchResult>, ApiError> {
    let url = format!(
        "https://api.duckduckgo.com/?q={}&format=json&no_redirect=1&no_html=1",
        urlencoding::encode(query)
    );

    let response = reqwest::Client::new()
        .get(url)
        .send()
        .await
        .map_err(ApiError::internal)?;

    if !response.status().is_success() {
        return Err(ApiError::Internal(format!(
            "DuckDuckGo search failed: {}",
            response.status()
        )));
    }

    let payload: Value = response.json().await.map_err(ApiError::internal)?;
    let mut results = Vec::new();

    if let Some(abstract_text) = payload.get("AbstractText").and_then(|v| v.as_str()) {
        if let Some(url) = payload.get("AbstractURL").and_then(|v| v.as_str()) {
            if !abstract_text.is_empty() && !url.is_empty() {
                results.push(SearchResult {
                    title: abstract_text
                        .split(" - ")
                        .next()
                        .unwrap_or(abstract_text)
                        .to_string(),
                    url: url.to_string(),
                    snippet: abstract_text.to_string(),
                });
            }
        }
    }

    if let Some(items) = payload.get("Results").and_then(|v| v.as_array()) {
        extract_ddg_topics(items, &mut results);
    }
    if let Some(items) = payload.get("RelatedTopics").and_then(|v| v.as_array()) {
        extract_ddg_topics(items, &mut results);
    }

    Ok(results)
}

fn extract_ddg_topics(items: &[Value], results: &mut Vec<SearchResult>) {
    for item in items {
        if let Some(topics) = item.get("Topics").and_then(|v| v.as_array()) {
            extract_ddg_topics(topics, results);
            continue;
        }
        let text = item.get("Text").and_then(|v| v.as_str()).unwrap_or("");
        let url = item.get("FirstURL").and_then(|v| v.as_str()).unwrap_or("");
        if text.is_empty() || url.is_empty() {
            continue;
        }
        results.push(SearchResult {
            title: text.split(" - ").next().unwrap_or(text).to_string(),
            url: url.to_string(),
            snippet: text.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_urls_preserve_rank_order() {
        let results = vec![
            SearchResult {
                title: "a".into(),
                url: "https://a.example".into(),
                snippet: String::new(),
            },
            SearchResult {
                title: "b".into(),
                url: "https://b.example".into(),
                snippet: String::new(),
            },
        ];
        assert_eq!(
            result_urls(&results),
            vec!["https://a.example", "https://b.example"]
        );
    }

    #[test]
    fn ddg_topics_flatten_nested_groups() {
        let items = vec![serde_json::json!({
            "Topics": [
                {"Text": "Rust - language", "FirstURL": "https://rust-lang.org"},
                {"Text": "", "FirstURL": "https://dropped.example"}
            ]
        })];
        let mut results = Vec::new();
        extract_ddg_topics(&items, &mut results);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "Rust");
        assert_eq!(results[0].url, "https://rust-lang.org");
    }
}
