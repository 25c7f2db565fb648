//! Orchestrator domain types: tunables, persona prompts and turn results

mod config;
mod form;
mod persona;
mod response;

pub use config::OrchestratorConfig;
pub use form::{ActivationForm, FormField};
pub use persona::{
    conversational_prompt, extraction_prompt, parse_extraction, rejection_prompt, slot_question,
    Extraction,
};
pub use response::{
    ActivationOutcome, CandidateSummary, ClarificationReason, OrchestratorResponse, TurnOutcome,
};
