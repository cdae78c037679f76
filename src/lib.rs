pub mod classify;
pub mod core;
pub mod extract;
pub mod llm;
pub mod scrape;
pub mod search;
pub mod server;
pub mod session;
pub mod state;
pub mod storage;
pub mod workflow;
