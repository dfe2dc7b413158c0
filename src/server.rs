//! HTTP surface of the service.
//!
//! Three routes mirror the job lifecycle: `POST /analyze` accepts a multipart
//! submission and returns a job id immediately, `GET /result/:job_id` polls a
//! single job, `GET /history` lists recent jobs. The root path is a health
//! check.

use std::sync::Arc;

use axum::extract::{Multipart, Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use crate::error::AppError;
use crate::llm::CompletionSender;
use crate::orchestrator::Orchestrator;
use crate::store::Job;

const DEFAULT_HISTORY_LIMIT: usize = 20;

pub fn router<C>(orchestrator: Arc<Orchestrator<C>>) -> Router
where
    C: CompletionSender + Send + Sync + 'static,
{
    Router::new()
        .route("/", get(health))
        .route("/analyze", post(analyze::<C>))
        .route("/result/:job_id", get(result::<C>))
        .route("/history", get(history::<C>))
        .with_state(orchestrator)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "message": "Blood test report analyser API is running" }))
}

/// Accepts `file` (required) and `query` (optional) multipart fields and
/// schedules the analysis.
async fn analyze<C>(
    State(orchestrator): State<Arc<Orchestrator<C>>>,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>, AppError>
where
    C: CompletionSender + Send + Sync + 'static,
{
    let mut document: Option<(Vec<u8>, String)> = None;
    let mut query: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("malformed multipart body: {e}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let filename = field.file_name().unwrap_or("upload.pdf").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("failed to read file: {e}")))?;
                document = Some((bytes.to_vec(), filename));
            }
            Some("query") => {
                query = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| AppError::Validation(format!("failed to read query: {e}")))?,
                );
            }
            _ => {}
        }
    }

    let (bytes, filename) =
        document.ok_or_else(|| AppError::Validation("missing 'file' field".into()))?;
    let job_id = orchestrator.submit(query, &bytes, &filename)?;

    Ok(Json(json!({ "status": "processing", "job_id": job_id })))
}

async fn result<C>(
    State(orchestrator): State<Arc<Orchestrator<C>>>,
    Path(job_id): Path<String>,
) -> Result<Json<Job>, AppError>
where
    C: CompletionSender + Send + Sync + 'static,
{
    Ok(Json(orchestrator.status(&job_id)?))
}

#[derive(Debug, Deserialize, Default)]
struct HistoryQuery {
    limit: Option<usize>,
}

async fn history<C>(
    State(orchestrator): State<Arc<Orchestrator<C>>>,
    Query(params): Query<HistoryQuery>,
) -> Json<Vec<Job>>
where
    C: CompletionSender + Send + Sync + 'static,
{
    Json(orchestrator.recent(params.limit.unwrap_or(DEFAULT_HISTORY_LIMIT)))
}
