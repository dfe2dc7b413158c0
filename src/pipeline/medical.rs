//! The built-in blood-test analysis pipeline.
//!
//! Four roles, each bound to the shared backend: a document validator acting
//! as the gate stage, then a physician, a dietitian and an exercise
//! physiologist. Only evidence-based, non-speculative recommendations should
//! come out of these prompts; where uncertainty exists the wording asks the
//! model to say so and defer to a healthcare provider.

use std::sync::Arc;

use crate::agents::{Agent, AgentLimits};

use super::stage::Stage;

/// Stages of the medical pipeline in execution order:
/// verification → summary → nutrition → exercise.
pub fn medical_stages() -> Vec<Stage> {
    let verifier = Arc::new(Agent::new(
        "Medical Document Validator",
        "Confirm the uploaded file is a blood-test report. Extract basic \
         metadata such as patient name, report date, and laboratory name. \
         If the document is not a blood-test report, return an error message.",
        "Former medical records officer experienced in laboratory reports.",
        AgentLimits {
            max_iterations: 2,
            max_calls_per_minute: 2,
        },
    ));

    let doctor = Arc::new(Agent::new(
        "Internal Medicine Physician",
        "Provide a concise, evidence-based interpretation of the blood-test \
         report and answer the user's specific question ({query}) in plain \
         language. Where uncertainty exists, state it explicitly and advise \
         the user to consult their healthcare provider.",
        "Board-certified physician with 15 years of clinical experience in \
         diagnostic medicine and patient education. Values clarity, safety, \
         and empathy.",
        AgentLimits {
            max_iterations: 3,
            max_calls_per_minute: 3,
        },
    ));

    let nutritionist = Arc::new(Agent::new(
        "Registered Dietitian",
        "Provide personalised, evidence-based dietary guidance based on the \
         blood-test data and user query ({query}). Focus on achievable food \
         choices rather than supplements unless clinically indicated.",
        "Clinical dietitian specialising in cardiometabolic health.",
        AgentLimits {
            max_iterations: 3,
            max_calls_per_minute: 3,
        },
    ));

    let exercise_specialist = Arc::new(Agent::new(
        "Certified Exercise Physiologist",
        "Design a safe, progressive exercise programme tailored to the user's \
         health markers and goals derived from the blood-test report. \
         Emphasise safety, gradual overload, and evidence-based guidelines.",
        "Exercise physiologist with experience in preventive cardiology.",
        AgentLimits {
            max_iterations: 3,
            max_calls_per_minute: 3,
        },
    ));

    vec![
        Stage::new(
            "verification",
            "Given the extracted text of the uploaded document below:\n\n\
             {report_text}\n\n\
             Verify that this document is a blood-test report and extract \
             basic metadata (patient name, date, laboratory). If the document \
             is NOT a blood-test report, respond with 'INVALID' followed by a \
             brief reason.",
            "If valid: return metadata JSON. If invalid: return error string.",
            verifier,
        )
        .gate(),
        Stage::new(
            "summary",
            "Given the extracted text {report_text}, provide an overall \
             summary of the blood-test report and answer the user's question: \
             {query}. Highlight abnormal values, possible implications, and \
             when to seek professional care.",
            "Return a brief report organised into:\n\
             - Key abnormalities with clinical significance\n\
             - Lifestyle considerations\n\
             - Red-flag values warranting prompt in-person review",
            doctor,
        ),
        Stage::new(
            "nutrition",
            "Using the blood-test data, create an evidence-based nutrition \
             plan tailored to the user's query: {query}.",
            "Return:\n\
             - Summary of nutrition-related markers (lipids, glucose, etc.)\n\
             - Specific dietary recommendations (foods to include / limit)\n\
             - Guideline references",
            nutritionist,
        ),
        Stage::new(
            "exercise",
            "Design a safe, progressive 4-week exercise plan informed by the \
             blood-test findings and user goals: {query}.",
            "Return a weekly schedule detailing cardio, strength, recovery \
             and safety notes linked to any abnormal values.",
            exercise_specialist,
        ),
    ]
}
