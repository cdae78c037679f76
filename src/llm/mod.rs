pub mod cohere;
pub mod ollama;
pub mod openai;
pub mod provider;
pub mod service;

pub use provider::LlmProvider;
pub use service::LlmService;
