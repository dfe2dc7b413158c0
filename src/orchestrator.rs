//! Ties submission to execution to persistence.
//!
//! `submit` validates the upload, extracts text best-effort, creates the
//! pending job record and schedules the pipeline on a background task before
//! returning the job id. The background wrapper is the sole writer of
//! terminal state for a job, which is what makes the store's
//! one-terminal-update-per-id assumption hold.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Semaphore;
use uuid::Uuid;

use crate::error::AppError;
use crate::extract::TextExtractor;
use crate::llm::CompletionSender;
use crate::pipeline::Pipeline;
use crate::store::{Job, JobStatus, JobStore};

/// Effective query when the caller submits an empty or missing one.
pub const DEFAULT_QUERY: &str = "Summarise my blood test report";

pub struct Orchestrator<C> {
    store: Arc<JobStore>,
    pipeline: Arc<Pipeline<C>>,
    extractor: Arc<dyn TextExtractor>,
    admission: Arc<Semaphore>,
    max_report_chars: usize,
}

impl<C: CompletionSender + Send + Sync + 'static> Orchestrator<C> {
    pub fn new(
        store: Arc<JobStore>,
        pipeline: Arc<Pipeline<C>>,
        extractor: Arc<dyn TextExtractor>,
        max_concurrent_jobs: usize,
        max_report_chars: usize,
    ) -> Self {
        Self {
            store,
            pipeline,
            extractor,
            admission: Arc::new(Semaphore::new(max_concurrent_jobs.max(1))),
            max_report_chars,
        }
    }

    /// Accept a submission and schedule its analysis.
    ///
    /// Returns the fresh job id immediately; callers observe completion by
    /// polling [`status`](Self::status). Extraction failures degrade to empty
    /// text rather than rejecting the submission.
    pub fn submit(
        &self,
        query: Option<String>,
        document: &[u8],
        filename: &str,
    ) -> Result<String, AppError> {
        if document.is_empty() {
            return Err(AppError::Validation("uploaded file is empty".into()));
        }

        let query = match query {
            Some(q) if !q.trim().is_empty() => q.trim().to_string(),
            _ => DEFAULT_QUERY.to_string(),
        };

        let report_text = match self.extractor.extract(document) {
            Ok(text) => truncate_chars(text, self.max_report_chars),
            Err(e) => {
                tracing::warn!(
                    file = filename,
                    error = %e,
                    "text extraction failed, proceeding with empty text"
                );
                String::new()
            }
        };

        let job_id = Uuid::new_v4().to_string();
        let meta = HashMap::from([("file_name".to_string(), filename.to_string())]);
        self.store.create(&job_id, &query, meta)?;
        tracing::info!(job_id = %job_id, file = filename, "job created");

        let store = Arc::clone(&self.store);
        let pipeline = Arc::clone(&self.pipeline);
        let admission = Arc::clone(&self.admission);
        let id = job_id.clone();
        tokio::spawn(async move {
            execute(store, pipeline, admission, id, query, report_text).await;
        });

        Ok(job_id)
    }

    pub fn status(&self, job_id: &str) -> Result<Job, AppError> {
        self.store
            .get(job_id)
            .ok_or_else(|| AppError::NotFound(job_id.to_string()))
    }

    pub fn recent(&self, limit: usize) -> Vec<Job> {
        self.store.list(limit)
    }
}

/// Background execution wrapper: runs the pipeline under the admission limit
/// and records exactly one terminal transition. Errors are persisted on the
/// job, never raised to an unattended caller.
async fn execute<C: CompletionSender + Send + Sync>(
    store: Arc<JobStore>,
    pipeline: Arc<Pipeline<C>>,
    admission: Arc<Semaphore>,
    job_id: String,
    query: String,
    report_text: String,
) {
    let _permit = admission
        .acquire_owned()
        .await
        .expect("admission semaphore is never closed");

    let update = match pipeline.run(&query, &report_text).await {
        Ok(report) => {
            tracing::info!(job_id = %job_id, "pipeline completed");
            store.update(
                &job_id,
                JobStatus::Completed,
                Some(report.into_value()),
                None,
            )
        }
        Err(e) => {
            tracing::error!(job_id = %job_id, error = %e, "pipeline failed");
            store.update(&job_id, JobStatus::Failed, None, Some(e.to_string()))
        }
    };

    if let Err(e) = update {
        tracing::error!(job_id = %job_id, error = %e, "failed to persist terminal state");
    }
}

/// Truncate to at most `max` characters, respecting char boundaries.
fn truncate_chars(mut text: String, max: usize) -> String {
    if let Some((idx, _)) = text.char_indices().nth(max) {
        text.truncate(idx);
    }
    text
}
