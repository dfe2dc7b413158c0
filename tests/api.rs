//! End-to-end tests of the HTTP surface: real router, real orchestrator and
//! pipeline, with the Groq backend replaced by a wiremock server.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use bloodwork::agents::{Agent, AgentLimits};
use bloodwork::extract::PlainTextExtractor;
use bloodwork::llm::GroqClient;
use bloodwork::orchestrator::Orchestrator;
use bloodwork::pipeline::{GatePolicy, Pipeline, PipelineSettings, Stage, medical_stages};
use bloodwork::server;
use bloodwork::store::JobStore;

fn completion_body(text: &str) -> Value {
    serde_json::json!({
        "id": "chatcmpl-test",
        "model": "llama3-70b-8192",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": text},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 10, "completion_tokens": 10, "total_tokens": 20}
    })
}

/// Serve the full app against `backend` on an ephemeral port and return its
/// base URL.
async fn spawn_app(backend: &MockServer, stages: Vec<Stage>, gate_policy: GatePolicy) -> String {
    let client = GroqClient::with_base_url(
        "gsk-test".into(),
        format!("{}/chat/completions", backend.uri()),
    );
    let pipeline = Pipeline::new(
        Arc::new(client),
        stages,
        PipelineSettings {
            model: "llama3-70b-8192".into(),
            temperature: 0.0,
            max_tokens: 512,
            stage_timeout: Duration::from_secs(5),
            gate_policy,
        },
    );
    let orchestrator = Arc::new(Orchestrator::new(
        Arc::new(JobStore::in_memory()),
        Arc::new(pipeline),
        Arc::new(PlainTextExtractor),
        4,
        20_000,
    ));
    let app = server::router(orchestrator);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// A single permissive stage, so tests that don't care about the medical
/// catalog stay fast and avoid per-agent rate limits.
fn single_stage() -> Vec<Stage> {
    let agent = Arc::new(Agent::new(
        "Analyst",
        "Answer {query}",
        "Test analyst.",
        AgentLimits {
            max_iterations: 1,
            max_calls_per_minute: 1000,
        },
    ));
    vec![Stage::new("summary", "Summarise: {report_text}", "text", agent)]
}

async fn submit(
    http: &reqwest::Client,
    base: &str,
    file: &[u8],
    query: Option<&str>,
) -> reqwest::Response {
    let mut form = reqwest::multipart::Form::new().part(
        "file",
        reqwest::multipart::Part::bytes(file.to_vec()).file_name("report.pdf"),
    );
    if let Some(q) = query {
        form = form.text("query", q.to_string());
    }
    http.post(format!("{base}/analyze"))
        .multipart(form)
        .send()
        .await
        .unwrap()
}

async fn poll_terminal(http: &reqwest::Client, base: &str, job_id: &str) -> Value {
    for _ in 0..200 {
        let job: Value = http
            .get(format!("{base}/result/{job_id}"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let status = job["status"].as_str().unwrap();
        if status != "pending" {
            return job;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {job_id} never left pending");
}

#[tokio::test]
async fn full_medical_flow_completes_with_all_stage_outputs() {
    let backend = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(
            "Valid report; values within normal ranges.",
        )))
        .mount(&backend)
        .await;

    let base = spawn_app(&backend, medical_stages(), GatePolicy::Continue).await;
    let http = reqwest::Client::new();

    let resp = submit(&http, &base, b"Hemoglobin 13.5 g/dL", Some("How am I doing?")).await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "processing");
    let job_id = body["job_id"].as_str().unwrap().to_string();

    // Retrievable immediately, never "not found" after submission.
    let early = http
        .get(format!("{base}/result/{job_id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(early.status(), 200);

    let job = poll_terminal(&http, &base, &job_id).await;
    assert_eq!(job["status"], "completed");
    assert_eq!(job["query"], "How am I doing?");
    assert_eq!(job["meta"]["file_name"], "report.pdf");
    let result = job["result"].as_object().unwrap();
    for stage in ["verification", "summary", "nutrition", "exercise"] {
        assert!(result.contains_key(stage), "missing stage output: {stage}");
    }
    assert_eq!(result["document_valid"], true);
    assert!(job.get("error").is_none());
}

#[tokio::test]
async fn backend_failure_surfaces_via_polling_with_stage_identity() {
    let backend = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("backend exploded"))
        .mount(&backend)
        .await;

    let base = spawn_app(&backend, single_stage(), GatePolicy::Continue).await;
    let http = reqwest::Client::new();

    let body: Value = submit(&http, &base, b"some text", None)
        .await
        .json()
        .await
        .unwrap();
    let job_id = body["job_id"].as_str().unwrap().to_string();

    let job = poll_terminal(&http, &base, &job_id).await;
    assert_eq!(job["status"], "failed");
    assert!(job.get("result").is_none());
    let error = job["error"].as_str().unwrap();
    assert!(error.contains("stage 'summary'"), "unexpected error: {error}");
}

#[tokio::test]
async fn empty_query_defaults_and_empty_file_is_rejected() {
    let backend = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("ok")))
        .mount(&backend)
        .await;

    let base = spawn_app(&backend, single_stage(), GatePolicy::Continue).await;
    let http = reqwest::Client::new();

    let body: Value = submit(&http, &base, b"text", Some(""))
        .await
        .json()
        .await
        .unwrap();
    let job_id = body["job_id"].as_str().unwrap();
    let job: Value = http
        .get(format!("{base}/result/{job_id}"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(job["query"], "Summarise my blood test report");

    let resp = submit(&http, &base, b"", Some("q")).await;
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("empty"));
}

#[tokio::test]
async fn invalid_document_halts_the_pipeline_when_configured() {
    let backend = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(
            "INVALID: this is a cooking recipe, not a blood-test report",
        )))
        .mount(&backend)
        .await;

    let base = spawn_app(&backend, medical_stages(), GatePolicy::Halt).await;
    let http = reqwest::Client::new();

    let body: Value = submit(&http, &base, b"flour, sugar, eggs", None)
        .await
        .json()
        .await
        .unwrap();
    let job_id = body["job_id"].as_str().unwrap().to_string();

    let job = poll_terminal(&http, &base, &job_id).await;
    assert_eq!(job["status"], "completed");
    let result = job["result"].as_object().unwrap();
    assert_eq!(result["document_valid"], false);
    assert!(result.contains_key("verification"));
    assert!(!result.contains_key("summary"));
    // Only the gate stage hit the backend.
    assert_eq!(backend.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn unknown_job_id_returns_404() {
    let backend = MockServer::start().await;
    let base = spawn_app(&backend, single_stage(), GatePolicy::Continue).await;
    let resp = reqwest::get(format!("{base}/result/no-such-job"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn missing_file_field_returns_400() {
    let backend = MockServer::start().await;
    let base = spawn_app(&backend, single_stage(), GatePolicy::Continue).await;
    let form = reqwest::multipart::Form::new().text("query", "hello");
    let resp = reqwest::Client::new()
        .post(format!("{base}/analyze"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn history_lists_recent_jobs_newest_first() {
    let backend = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("ok")))
        .mount(&backend)
        .await;

    let base = spawn_app(&backend, single_stage(), GatePolicy::Continue).await;
    let http = reqwest::Client::new();

    let mut ids = Vec::new();
    for i in 0..3 {
        let body: Value = submit(&http, &base, b"text", Some(&format!("query {i}")))
            .await
            .json()
            .await
            .unwrap();
        ids.push(body["job_id"].as_str().unwrap().to_string());
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let jobs: Vec<Value> = http
        .get(format!("{base}/history?limit=2"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(jobs.len(), 2);
    assert_eq!(jobs[0]["id"].as_str().unwrap(), ids[2]);
    assert_eq!(jobs[1]["id"].as_str().unwrap(), ids[1]);
}
