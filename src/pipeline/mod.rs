mod medical;
mod runner;
mod stage;

pub use medical::medical_stages;
pub use runner::{
    GatePolicy, INVALID_SENTINEL, Pipeline, PipelineError, PipelineReport, PipelineSettings,
};
pub use stage::{Stage, StageContext};
