use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::paths::AppPaths;

/// Runtime configuration, merged from an optional `config.yml` and
/// environment variables. Secrets only ever come from the environment;
/// a missing key disables the corresponding hosted backend, nothing else.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub scraping: ScrapeSettings,
    pub llm: LlmSettings,
    pub search: SearchSettings,
    pub retry: RetrySettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScrapeSettings {
    pub page_load_timeout_secs: u64,
    pub settle_delay_secs: u64,
    pub user_agent: String,
    pub proxy_server: Option<String>,
    pub chunk_size: usize,
}

impl Default for ScrapeSettings {
    fn default() -> Self {
        Self {
            page_load_timeout_secs: 30,
            settle_delay_secs: 5,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/90.0.4430.212 Safari/537.36"
                .to_string(),
            proxy_server: None,
            chunk_size: 6000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub ollama_base_url: String,
    pub ollama_model: String,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub cohere_api_key: Option<String>,
    pub cohere_model: String,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            ollama_base_url: "http://localhost:11434".to_string(),
            ollama_model: "llama3".to_string(),
            openai_api_key: None,
            openai_model: "gpt-3.5-turbo-1106".to_string(),
            cohere_api_key: None,
            cohere_model: "command-r-plus".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub google_api_key: Option<String>,
    pub google_engine_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: usize,
    pub base_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
        }
    }
}

impl Settings {
    /// Loads settings from the config file (if present) and applies
    /// environment overrides.
    pub fn load(paths: &AppPaths) -> Self {
        let mut settings = load_yaml_file(&config_path(paths));
        settings.apply_env_overrides();
        settings
    }

    fn apply_env_overrides(&mut self) {
        if let Some(value) = env_nonempty("OLLAMA_BASE_URL") {
            self.llm.ollama_base_url = value;
        }
        if let Some(value) = env_nonempty("OLLAMA_MODEL") {
            self.llm.ollama_model = value;
        }
        if let Some(value) = env_nonempty("OPENAI_API_KEY") {
            self.llm.openai_api_key = Some(value);
        }
        if let Some(value) = env_nonempty("COHERE_API_KEY") {
            self.llm.cohere_api_key = Some(value);
        }
        if let Some(value) = env_nonempty("PROXY_SERVER") {
            self.scraping.proxy_server = Some(value);
        }
        if let Some(value) = env_nonempty("GOOGLE_SEARCH_API_KEY") {
            self.search.google_api_key = Some(value);
        }
        if let Some(value) = env_nonempty("GOOGLE_SEARCH_ENGINE_ID") {
            self.search.google_engine_id = Some(value);
        }
    }
}

fn config_path(paths: &AppPaths) -> PathBuf {
    if let Ok(path) = env::var("INTELLISCRAPE_CONFIG_PATH") {
        return PathBuf::from(path);
    }
    paths.project_root.join("config.yml")
}

fn load_yaml_file(path: &Path) -> Settings {
    if !path.exists() {
        return Settings::default();
    }

    match fs::read_to_string(path) {
        Ok(contents) => match serde_yaml::from_str::<Settings>(&contents) {
            Ok(settings) => settings,
            Err(err) => {
                tracing::warn!("Invalid config file {}: {}", path.display(), err);
                Settings::default()
            }
        },
        Err(err) => {
            tracing::warn!("Failed to read config file {}: {}", path.display(), err);
            Settings::default()
        }
    }
}

fn env_nonempty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_behavior() {
        let settings = Settings::default();
        assert_eq!(settings.scraping.chunk_size, 6000);
        assert_eq!(settings.scraping.page_load_timeout_secs, 30);
        assert_eq!(settings.retry.max_attempts, 3);
        assert!(settings.llm.openai_api_key.is_none());
    }

    #[test]
    fn parses_partial_yaml() {
        let parsed: Settings = serde_yaml::from_str(
            "scraping:\n  chunk_size: 512\nllm:\n  ollama_model: mistral\n",
        )
        .unwrap();
        assert_eq!(parsed.scraping.chunk_size, 512);
        assert_eq!(parsed.llm.ollama_model, "mistral");
        // Untouched sections keep their defaults.
        assert_eq!(parsed.retry.max_attempts, 3);
    }
}
