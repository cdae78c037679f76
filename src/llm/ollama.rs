use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::provider::LlmProvider;
use crate::core::errors::ApiError;

/// Local Ollama backend, used for per-chunk extraction and general chat.
#[derive(Clone)]
pub struct OllamaProvider {
    base_url: String,
    model: String,
    client: Client,
}

impl OllamaProvider {
    pub fn new(base_url: String, model: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            client: Client::new(),
        }
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn health_check(&self) -> Result<bool, ApiError> {
        let url = format!("{}/api/tags", self.base_url);
        match self.client.get(&url).send().await {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    async fn invoke(&self, prompt: &str, system: Option<&str>) -> Result<String, ApiError> {
        let url = format!("{}/api/generate", self.base_url);

        let mut body = json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
        });
        if let (Some(obj), Some(system)) = (body.as_object_mut(), system) {
            obj.insert("system".to_string(), json!(system));
        }

        let res = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(ApiError::internal)?;

        if !res.status().is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Internal(format!("Ollama error: {}", text)));
        }

        let payload: Value = res.json().await.map_err(ApiError::internal)?;
        let content = payload["response"].as_str().unwrap_or_default().to_string();

        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_trailing_slash_from_base_url() {
        let provider = OllamaProvider::new("http://localhost:11434/".to_string(), "llama3".into());
        assert_eq!(provider.base_url, "http://localhost:11434");
    }

    #[tokio::test]
    #[ignore]
    async fn live_ollama_invoke() {
        let provider =
            OllamaProvider::new("http://localhost:11434".to_string(), "llama3".to_string());
        let response = provider.invoke("Say hello in one word.", None).await;
        match response {
            Ok(text) => println!("Ollama response: {}", text),
            Err(err) => panic!("Ollama invoke failed: {}", err),
        }
    }
}
