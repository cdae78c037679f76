use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::provider::LlmProvider;
use crate::core::errors::ApiError;

const COHERE_API_BASE: &str = "https://api.cohere.com/v1";

/// Hosted Cohere backend, used for query classification. The `system`
/// argument of `invoke` maps onto Cohere's preamble field.
#[derive(Clone)]
pub struct CohereProvider {
    api_key: String,
    model: String,
    base_url: String,
    client: Client,
}

impl CohereProvider {
    pub fn new(api_key: String, model: String) -> Self {
        Self::with_base_url(api_key, model, COHERE_API_BASE.to_string())
    }

    pub fn with_base_url(api_key: String, model: String, base_url: String) -> Self {
        Self {
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }
}

#[async_trait]
impl LlmProvider for CohereProvider {
    fn name(&self) -> &str {
        "cohere"
    }

    async fn health_check(&self) -> Result<bool, ApiError> {
        let url = format!("{}/models", self.base_url);
        let res = self.client.get(&url).bearer_auth(&self.api_key).send().await;
        match res {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    async fn invoke(&self, prompt: &str, system: Option<&str>) -> Result<String, ApiError> {
        let url = format!("{}/chat", self.base_url);

        let mut body = json!({
            "model": self.model,
            "message": prompt,
        });
        if let (Some(obj), Some(preamble)) = (body.as_object_mut(), system) {
            obj.insert("preamble".to_string(), json!(preamble));
        }

        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(ApiError::internal)?;

        if !res.status().is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Internal(format!("Cohere error: {}", text)));
        }

        let payload: Value = res.json().await.map_err(ApiError::internal)?;
        let content = payload["text"].as_str().unwrap_or_default().to_string();

        Ok(content)
    }
}
