//! Asynchronous blood-test report analysis service.
//!
//! A submission (document + query) becomes a tracked job: the orchestrator
//! extracts text, persists a pending record, and runs a fixed sequence of
//! reasoning stages against the LLM backend on a background task. Callers
//! poll the job id for the aggregated result.

pub mod agents;
pub mod cli;
pub mod config;
pub mod error;
pub mod extract;
pub mod llm;
pub mod logging;
pub mod orchestrator;
pub mod pipeline;
pub mod server;
pub mod store;
