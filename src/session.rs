//! In-memory session record.
//!
//! The only mutable state in the system: scraped URLs, the append-only chat
//! transcript, and the most recent normalized content and extraction. Owned
//! by the orchestration layer behind a lock; pipeline components stay
//! stateless and reentrant.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Session {
    pub scraped_urls: Vec<String>,
    pub chat_history: Vec<ChatTurn>,
    pub last_content: Option<String>,
    pub last_extraction: Option<String>,
}

impl Session {
    /// Records a successful scrape. URLs are kept unique, first-seen order.
    pub fn record_scrape(&mut self, url: &str, content: String) {
        if !self.scraped_urls.iter().any(|existing| existing == url) {
            self.scraped_urls.push(url.to_string());
        }
        self.last_content = Some(content);
    }

    pub fn push_turn(&mut self, turn: ChatTurn) {
        self.chat_history.push(turn);
    }

    /// Most recently scraped URLs, newest last, capped at `limit`.
    pub fn recent_urls(&self, limit: usize) -> Vec<String> {
        let start = self.scraped_urls.len().saturating_sub(limit);
        self.scraped_urls[start..].to_vec()
    }

    pub fn history_json(&self) -> Value {
        serde_json::to_value(&self.chat_history).unwrap_or_else(|_| Value::Array(Vec::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_scrape_dedupes_urls_and_updates_content() {
        let mut session = Session::default();
        session.record_scrape("https://a.example", "first".to_string());
        session.record_scrape("https://b.example", "second".to_string());
        session.record_scrape("https://a.example", "third".to_string());

        assert_eq!(
            session.scraped_urls,
            vec!["https://a.example", "https://b.example"]
        );
        assert_eq!(session.last_content.as_deref(), Some("third"));
    }

    #[test]
    fn recent_urls_returns_newest_tail() {
        let mut session = Session::default();
        for i in 0..8 {
            session.record_scrape(&format!("https://site{i}.example"), String::new());
        }
        let recent = session.recent_urls(5);
        assert_eq!(recent.len(), 5);
        assert_eq!(recent[0], "https://site3.example");
        assert_eq!(recent[4], "https://site7.example");
    }

    #[test]
    fn chat_history_serializes_role_and_content() {
        let mut session = Session::default();
        session.push_turn(ChatTurn::user("hi"));
        session.push_turn(ChatTurn::assistant("hello"));

        let json = session.history_json();
        assert_eq!(json[0]["role"], "user");
        assert_eq!(json[1]["content"], "hello");
    }
}
