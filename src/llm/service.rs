use std::sync::Arc;

use serde_json::{json, Value};

use super::cohere::CohereProvider;
use super::ollama::OllamaProvider;
use super::openai::OpenAiProvider;
use super::provider::LlmProvider;
use crate::core::config::LlmSettings;

/// Wires the configured model backends to their pipeline roles.
///
/// The local extractor is always present; the hosted formatter and
/// classifier exist only when their API key is configured. A missing key
/// disables just that role, never the whole service.
#[derive(Clone)]
pub struct LlmService {
    extractor: Arc<OllamaProvider>,
    formatter: Option<Arc<OpenAiProvider>>,
    classifier: Option<Arc<CohereProvider>>,
}

impl LlmService {
    pub fn new(settings: &LlmSettings) -> Self {
        let extractor = Arc::new(OllamaProvider::new(
            settings.ollama_base_url.clone(),
            settings.ollama_model.clone(),
        ));

        let formatter = settings.openai_api_key.clone().map(|key| {
            Arc::new(OpenAiProvider::new(key, settings.openai_model.clone()))
        });
        if formatter.is_none() {
            tracing::info!("OPENAI_API_KEY not set; structured formatting disabled");
        }

        let classifier = settings.cohere_api_key.clone().map(|key| {
            Arc::new(CohereProvider::new(key, settings.cohere_model.clone()))
        });
        if classifier.is_none() {
            tracing::info!("COHERE_API_KEY not set; query classification will fall back");
        }

        Self {
            extractor,
            formatter,
            classifier,
        }
    }

    pub fn extractor(&self) -> Arc<dyn LlmProvider> {
        self.extractor.clone()
    }

    pub fn formatter(&self) -> Option<Arc<OpenAiProvider>> {
        self.formatter.clone()
    }

    pub fn classifier(&self) -> Option<Arc<dyn LlmProvider>> {
        self.classifier
            .clone()
            .map(|provider| provider as Arc<dyn LlmProvider>)
    }

    /// Backend availability summary for the status endpoint.
    pub fn backends(&self) -> Value {
        json!({
            "ollama": true,
            "openai": self.formatter.is_some(),
            "cohere": self.classifier.is_some(),
        })
    }

    /// Probes each configured backend. An unconfigured backend reports
    /// unreachable rather than being omitted, so the shape is stable.
    pub async fn health(&self) -> Value {
        let ollama = self.extractor.health_check().await.unwrap_or(false);
        let openai = match &self.formatter {
            Some(provider) => provider.health_check().await.unwrap_or(false),
            None => false,
        };
        let cohere = match &self.classifier {
            Some(provider) => provider.health_check().await.unwrap_or(false),
            None => false,
        };

        json!({
            "ollama": ollama,
            "openai": openai,
            "cohere": cohere,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::LlmSettings;

    #[test]
    fn hosted_backends_gated_on_keys() {
        let service = LlmService::new(&LlmSettings::default());
        assert!(service.formatter().is_none());
        assert!(service.classifier().is_none());

        let with_keys = LlmSettings {
            openai_api_key: Some("sk-test".to_string()),
            cohere_api_key: Some("co-test".to_string()),
            ..LlmSettings::default()
        };
        let service = LlmService::new(&with_keys);
        assert!(service.formatter().is_some());
        assert!(service.classifier().is_some());
        assert_eq!(service.backends()["openai"], true);
    }

    #[tokio::test]
    async fn health_reports_unconfigured_backends_unreachable() {
        let service = LlmService::new(&LlmSettings::default());
        let health = service.health().await;

        // Hosted backends without keys are never probed.
        assert_eq!(health["openai"], false);
        assert_eq!(health["cohere"], false);
        assert!(health["ollama"].is_boolean());
    }
}
