use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use math_core::model::GameResult;
use storage::repository::GameResultRepository;

/// Fire-and-forget handoff of finished results to persistence.
///
/// `notify` never blocks and never reports back. A background task appends
/// each result and logs failures; the session has already moved on by then.
#[derive(Debug, Clone)]
pub struct ResultSink {
    tx: mpsc::UnboundedSender<GameResult>,
}

impl ResultSink {
    /// Spawn the persistence worker.
    ///
    /// The returned handle completes once every `ResultSink` clone is dropped
    /// and the queue is drained; it yields the number of results saved.
    pub fn spawn(results: Arc<dyn GameResultRepository>) -> (Self, JoinHandle<usize>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<GameResult>();
        let worker = tokio::spawn(async move {
            let mut saved = 0usize;
            while let Some(result) = rx.recv().await {
                match results.append_result(&result).await {
                    Ok(id) => {
                        saved += 1;
                        tracing::debug!(
                            id,
                            score = result.score(),
                            completed = result.completed(),
                            "result saved"
                        );
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, mode = %result.mode(), "failed to save result");
                    }
                }
            }
            saved
        });
        (Self { tx }, worker)
    }

    /// Queue a result for saving.
    pub fn notify(&self, result: GameResult) {
        if self.tx.send(result).is_err() {
            tracing::warn!("result sink closed; result dropped");
        }
    }
}
