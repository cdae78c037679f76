pub mod chat;
pub mod extract;
pub mod health;
pub mod scrape;
pub mod search;
