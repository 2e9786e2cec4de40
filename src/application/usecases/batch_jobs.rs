use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use chrono::Utc;
use tokio::sync::watch;
use tracing::{error, info, warn};

use super::entitlement_errors::{EntitlementError, UseCaseResult};
use crate::domain::{
    repositories::{batch::BatchMutationRepository, notifier::Notifier},
    value_objects::batch_jobs::{BatchJobState, BatchMutation, BatchProgress, BatchSummary},
};

/// Chunked mass mutation over every user, one job at a time. Progress is published on a
/// watch channel and, when a handle is given, pushed to the notifier after every chunk.
pub struct BatchJobRunner {
    batch_repo: Arc<dyn BatchMutationRepository + Send + Sync>,
    notifier: Arc<dyn Notifier + Send + Sync>,
    chunk_size: usize,
    running: Arc<AtomicBool>,
    progress: watch::Sender<Option<BatchProgress>>,
}

struct RunningGuard(Arc<AtomicBool>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl BatchJobRunner {
    pub fn new(
        batch_repo: Arc<dyn BatchMutationRepository + Send + Sync>,
        notifier: Arc<dyn Notifier + Send + Sync>,
        chunk_size: usize,
    ) -> Self {
        let (progress, _) = watch::channel(None);
        Self {
            batch_repo,
            notifier,
            chunk_size: chunk_size.max(1),
            running: Arc::new(AtomicBool::new(false)),
            progress,
        }
    }

    pub fn current(&self) -> Option<BatchProgress> {
        self.progress.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<BatchProgress>> {
        self.progress.subscribe()
    }

    /// Runs to completion on the caller's task.
    pub async fn run(&self, mutation: BatchMutation, progress_handle: Option<String>) -> UseCaseResult<BatchSummary> {
        let guard = self.claim()?;
        let result = self.execute(mutation, progress_handle).await;
        drop(guard);
        result
    }

    /// Claims the runner and continues in the background. A second start while a job is
    /// running is refused.
    pub fn start(self: &Arc<Self>, mutation: BatchMutation, progress_handle: Option<String>) -> UseCaseResult<()> {
        let guard = self.claim()?;
        let runner = Arc::clone(self);

        tokio::spawn(async move {
            let _guard = guard;
            if let Err(err) = runner.execute(mutation, progress_handle).await {
                error!(job = %mutation, error = ?err, "batch_jobs: background job failed");
            }
        });

        Ok(())
    }

    fn claim(&self) -> UseCaseResult<RunningGuard> {
        self.running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| EntitlementError::BatchJobAlreadyRunning)?;
        Ok(RunningGuard(Arc::clone(&self.running)))
    }

    async fn execute(&self, mutation: BatchMutation, progress_handle: Option<String>) -> UseCaseResult<BatchSummary> {
        let started_at = Utc::now();
        self.progress
            .send_replace(Some(BatchProgress::started(mutation, 0, started_at)));

        let user_ids = match self.batch_repo.list_user_ids().await {
            Ok(ids) => ids,
            Err(err) => {
                error!(job = %mutation, db_error = ?err, "batch_jobs: failed to list users");
                self.fail(&err);
                return Err(EntitlementError::Internal(err));
            }
        };

        let total = user_ids.len();
        let mut progress = BatchProgress::started(mutation, total, started_at);
        self.progress.send_replace(Some(progress.clone()));
        info!(job = %mutation, total, chunk_size = self.chunk_size, "batch_jobs: started");

        let mut chunks = 0;
        for chunk in user_ids.chunks(self.chunk_size) {
            let affected = match self.batch_repo.apply_chunk(chunk.to_vec(), mutation).await {
                Ok(affected) => affected,
                Err(err) => {
                    error!(
                        job = %mutation,
                        processed = progress.processed,
                        total,
                        db_error = ?err,
                        "batch_jobs: chunk failed, stopping"
                    );
                    self.fail(&err);
                    self.report(progress_handle.as_deref(), format!(
                        "{}: failed after {}/{}",
                        mutation, progress.processed, total
                    ))
                    .await;
                    return Err(EntitlementError::Internal(err));
                }
            };

            chunks += 1;
            progress.processed += chunk.len();
            progress.affected += affected;
            self.progress.send_replace(Some(progress.clone()));
            self.report(progress_handle.as_deref(), progress.progress_line())
                .await;
        }

        progress.state = BatchJobState::Completed;
        progress.finished_at = Some(Utc::now());
        self.progress.send_replace(Some(progress.clone()));

        let summary = BatchSummary {
            job: mutation.as_str().to_string(),
            total,
            affected: progress.affected,
            chunks,
        };
        info!(job = %mutation, total, affected = summary.affected, chunks, "batch_jobs: finished");
        self.report(progress_handle.as_deref(), summary.summary_line())
            .await;

        Ok(summary)
    }

    fn fail(&self, err: &anyhow::Error) {
        self.progress.send_modify(|current| {
            if let Some(progress) = current {
                progress.state = BatchJobState::Failed;
                progress.finished_at = Some(Utc::now());
                progress.error = Some(err.to_string());
            }
        });
    }

    async fn report(&self, handle: Option<&str>, text: String) {
        let Some(handle) = handle else {
            return;
        };
        if let Err(err) = self.notifier.report_progress(handle.to_string(), text).await {
            warn!(handle = %handle, error = ?err, "batch_jobs: progress report not delivered");
        }
    }
}
