use std::sync::Arc;

use tokio::sync::Mutex;

use crate::core::config::{AppPaths, Settings};
use crate::extract::RetryPolicy;
use crate::llm::LlmService;
use crate::scrape::{ChromiumFetcher, PageFetcher};
use crate::session::Session;

/// Global application state shared across all routes.
///
/// The pipeline components are stateless; the session record is the single
/// piece of mutable state and lives behind a lock. The execution model is
/// one pipeline invocation in flight at a time, so the lock is about
/// exclusive session ownership, not contention.
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub settings: Settings,
    pub llm: LlmService,
    pub fetcher: Arc<dyn PageFetcher>,
    pub retry: RetryPolicy,
    pub session: Mutex<Session>,
}

impl AppState {
    /// Builds production state. Takes the already-built paths so the caller
    /// can stand up logging before any settings or backend wiring runs.
    pub fn initialize(paths: Arc<AppPaths>) -> Arc<Self> {
        let settings = Settings::load(&paths);
        let fetcher = Arc::new(ChromiumFetcher::new(settings.scraping.clone()));
        Self::new(paths, settings, fetcher)
    }

    pub fn new(
        paths: Arc<AppPaths>,
        settings: Settings,
        fetcher: Arc<dyn PageFetcher>,
    ) -> Arc<Self> {
        let llm = LlmService::new(&settings.llm);
        let retry = RetryPolicy::from_settings(&settings.retry);

        Arc::new(Self {
            paths,
            settings,
            llm,
            fetcher,
            retry,
            session: Mutex::new(Session::default()),
        })
    }
}
