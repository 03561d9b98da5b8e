use std::sync::Arc;

use storage::repository::Storage;
use tokio::task::JoinHandle;

use crate::Clock;
use crate::error::AppServicesError;
use crate::explain_service::{Explainer, ExplanationService};
use crate::sessions::{FeedbackDelays, ResultHistoryService, ResultSink, SessionLoopService};

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    session_loop: Arc<SessionLoopService>,
    history: Arc<ResultHistoryService>,
    explainer: Arc<ExplanationService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// Also returns the persistence worker; it finishes once every session
    /// and this value are dropped.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        explainer: ExplanationService,
    ) -> Result<(Self, JoinHandle<usize>), AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(&storage, clock, explainer))
    }

    /// Build services over in-memory storage.
    ///
    /// Must be called from inside a tokio runtime.
    #[must_use]
    pub fn in_memory(clock: Clock) -> (Self, JoinHandle<usize>) {
        Self::from_storage(&Storage::in_memory(), clock, ExplanationService::disabled())
    }

    fn from_storage(
        storage: &Storage,
        clock: Clock,
        explainer: ExplanationService,
    ) -> (Self, JoinHandle<usize>) {
        let (sink, worker) = ResultSink::spawn(Arc::clone(&storage.results));
        let explainer = Arc::new(explainer);
        let session_loop = Arc::new(
            SessionLoopService::new(clock)
                .with_sink(sink)
                .with_explainer(Arc::clone(&explainer) as Arc<dyn Explainer>),
        );
        let history = Arc::new(ResultHistoryService::new(Arc::clone(&storage.results)));

        (
            Self {
                session_loop,
                history,
                explainer,
            },
            worker,
        )
    }

    /// Replace feedback delays on the session loop.
    #[must_use]
    pub fn with_delays(mut self, delays: FeedbackDelays) -> Self {
        let session_loop = (*self.session_loop).clone().with_delays(delays);
        self.session_loop = Arc::new(session_loop);
        self
    }

    #[must_use]
    pub fn session_loop(&self) -> Arc<SessionLoopService> {
        Arc::clone(&self.session_loop)
    }

    #[must_use]
    pub fn history(&self) -> Arc<ResultHistoryService> {
        Arc::clone(&self.history)
    }

    #[must_use]
    pub fn explainer(&self) -> Arc<ExplanationService> {
        Arc::clone(&self.explainer)
    }
}
