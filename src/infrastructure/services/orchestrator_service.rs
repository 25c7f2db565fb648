//! Orchestrator service - drives a conversation from request to activated workflow

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, warn};

use super::conversation_locks::ConversationLocks;
use crate::domain::conversation::{
    ConversationId, ConversationState, ConversationStatus, ResumePoint, TraceAction, TurnRole,
};
use crate::domain::cost::{CostConfig, CostEstimator};
use crate::domain::inference::{
    GatewayCompletion, InferenceGateway, Message, SensitiveDataClassifier, SensitivityHint,
    TokenUsage,
};
use crate::domain::orchestrator::{
    conversational_prompt, extraction_prompt, parse_extraction, rejection_prompt, slot_question,
    ActivationForm, ActivationOutcome, CandidateSummary, ClarificationReason, Extraction,
    OrchestratorConfig, OrchestratorResponse, TurnOutcome,
};
use crate::domain::storage::Storage;
use crate::domain::template::{MatchResult, Template, TemplateCatalog, TemplateMatcher};
use crate::domain::track::DomainTrack;
use crate::domain::validation::{InputDeclaration, ParameterValidator};
use crate::domain::workflow::{
    MaterializeContext, MaterializerConfig, WorkflowDefinition, WorkflowMaterializer,
};
use crate::domain::DomainError;
use crate::infrastructure::events::EventDispatcher;
use crate::infrastructure::observability::{record_activation, record_turn};

/// Turns of history sent with a conversational reply
const HISTORY_TURNS: usize = 10;

/// Collaborators of the orchestrator
#[derive(Debug, Clone)]
pub struct OrchestratorDeps {
    pub conversations: Arc<dyn Storage<ConversationState>>,
    pub workflows: Arc<dyn Storage<WorkflowDefinition>>,
    pub catalog: Arc<TemplateCatalog>,
    pub gateway: Arc<dyn InferenceGateway>,
    pub dispatcher: Arc<EventDispatcher>,
}

/// Inference spent and inputs resolved during one turn
#[derive(Debug, Default)]
struct TurnLedger {
    model_ids: Vec<String>,
    usage: TokenUsage,
    resolved: Vec<String>,
}

/// Result of a turn before it is committed
#[derive(Debug)]
struct Step {
    response: OrchestratorResponse,
    action: TraceAction,
}

/// Conversation state machine
///
/// Each turn runs on a copy of the stored state and is committed with a
/// single save once it completes, so a failed turn leaves no trace.
#[derive(Debug)]
pub struct OrchestratorService {
    deps: OrchestratorDeps,
    config: OrchestratorConfig,
    matcher: TemplateMatcher,
    materializer: WorkflowMaterializer,
    classifier: SensitiveDataClassifier,
    cost: CostEstimator,
    locks: ConversationLocks,
}

impl OrchestratorService {
    pub fn new(deps: OrchestratorDeps, config: OrchestratorConfig) -> Self {
        Self {
            matcher: TemplateMatcher::new(config.category_prior_weight),
            deps,
            config,
            materializer: WorkflowMaterializer::default(),
            classifier: SensitiveDataClassifier::new(),
            cost: CostEstimator::default(),
            locks: ConversationLocks::new(),
        }
    }

    pub fn with_materializer(mut self, config: MaterializerConfig) -> Self {
        self.materializer = WorkflowMaterializer::new(config);
        self
    }

    pub fn with_cost(mut self, config: CostConfig) -> Self {
        self.cost = CostEstimator::new(config);
        self
    }

    pub fn catalog(&self) -> &TemplateCatalog {
        &self.deps.catalog
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Ranks the catalog against `text` without touching any conversation
    pub fn match_templates(
        &self,
        text: &str,
        active_domain: Option<DomainTrack>,
    ) -> Vec<MatchResult> {
        self.matcher.rank(text, &self.deps.catalog, active_domain)
    }

    pub async fn get_conversation(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<ConversationState, DomainError> {
        self.deps
            .conversations
            .get(conversation_id)
            .await?
            .ok_or_else(|| {
                DomainError::not_found(format!("Conversation '{}' not found", conversation_id))
            })
    }

    /// Handles one user message
    ///
    /// An inference outage yields `TransientError` and commits nothing.
    pub async fn process_message(
        &self,
        conversation_id: &ConversationId,
        text: &str,
    ) -> Result<TurnOutcome, DomainError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(DomainError::validation("Message cannot be empty"));
        }

        let _guard = self.locks.acquire(conversation_id.as_str()).await;
        let start = Instant::now();

        let stored = self.deps.conversations.get(conversation_id).await?;
        let is_new = stored.is_none();
        let mut working =
            stored.unwrap_or_else(|| ConversationState::new(conversation_id.clone()));
        let committed_status = working.status;

        if working.status == ConversationStatus::Activated {
            working.start_new_instance()?;
            debug!(
                conversation_id = %conversation_id,
                instance = working.instance,
                "Starting new workflow instance"
            );
        }

        working.push_turn(TurnRole::User, text);

        let mut ledger = TurnLedger::default();

        let step = match self.run_turn(&mut working, text, &mut ledger).await {
            Ok(step) => step,
            Err(e) if e.is_transient() => {
                warn!(
                    conversation_id = %conversation_id,
                    error = %e,
                    "Turn aborted, state left unchanged"
                );
                record_turn("transient_error", start.elapsed());

                return Ok(TurnOutcome {
                    conversation_id: conversation_id.clone(),
                    status: committed_status,
                    response: OrchestratorResponse::TransientError {
                        message: "The assistant is temporarily unavailable, please send your \
                                  message again."
                            .to_string(),
                        retry_safe: true,
                    },
                });
            }
            Err(e) => return Err(e),
        };

        working.push_turn(TurnRole::Assistant, step.response.assistant_text());
        working.record(step.action, ledger.resolved, ledger.model_ids, ledger.usage);

        let working = self.deps.conversations.save(working).await?;
        record_turn(step.response.kind(), start.elapsed());

        info!(
            conversation_id = %conversation_id,
            new = is_new,
            status = %working.status,
            response = step.response.kind(),
            trace_len = working.trace.len(),
            "Turn committed"
        );

        Ok(TurnOutcome {
            conversation_id: working.id,
            status: working.status,
            response: step.response,
        })
    }

    async fn run_turn(
        &self,
        working: &mut ConversationState,
        text: &str,
        ledger: &mut TurnLedger,
    ) -> Result<Step, DomainError> {
        match working.status {
            ConversationStatus::Init | ConversationStatus::Classifying => {
                self.classify(working, text, ledger).await
            }
            ConversationStatus::Clarifying {
                resume: ResumePoint::Classifying,
            } => self.resolve_intent(working, text, ledger).await,
            ConversationStatus::Clarifying {
                resume: ResumePoint::SlotFilling,
            }
            | ConversationStatus::Delegated { .. } => {
                working.transition(ConversationStatus::SlotFilling)?;
                self.fill_slots(working, text, ledger).await
            }
            ConversationStatus::SlotFilling => self.fill_slots(working, text, ledger).await,
            ConversationStatus::Ready => {
                working.transition(ConversationStatus::Ready)?;
                self.show_form(working, ledger)
            }
            // reset by process_message before the turn runs
            ConversationStatus::Activated => Err(DomainError::internal(
                "Activated conversation reached the turn handler",
            )),
        }
    }

    async fn classify(
        &self,
        working: &mut ConversationState,
        text: &str,
        ledger: &mut TurnLedger,
    ) -> Result<Step, DomainError> {
        if working.status == ConversationStatus::Init {
            working.transition(ConversationStatus::Classifying)?;
        }

        let results = self
            .matcher
            .rank(text, &self.deps.catalog, working.active_domain);

        let Some(top) = results.first() else {
            return self.converse(working, text, ledger).await;
        };

        let runner_up = results.get(1).map(|r| r.confidence);

        if self.config.is_confident(top.confidence, runner_up) {
            let template = Arc::clone(&top.template);
            debug!(
                conversation_id = %working.id,
                template_id = %template.id,
                confidence = top.confidence,
                "Intent classified"
            );
            return self.delegate(working, template, text, ledger).await;
        }

        working.transition(ConversationStatus::Clarifying {
            resume: ResumePoint::Classifying,
        })?;
        Ok(self.ask_choice(working, &results))
    }

    /// Resolves a pending choice by ordinal, id or name, or by a fresh confident match
    async fn resolve_intent(
        &self,
        working: &mut ConversationState,
        text: &str,
        ledger: &mut TurnLedger,
    ) -> Result<Step, DomainError> {
        if let Some(template) = self.pick_candidate(working, text) {
            // "2" carries no inputs, extract from the request that was clarified
            let request = previous_user_text(working).unwrap_or(text).to_string();
            return self.delegate(working, template, &request, ledger).await;
        }

        let results = self
            .matcher
            .rank(text, &self.deps.catalog, working.active_domain);

        if let Some(top) = results.first() {
            let runner_up = results.get(1).map(|r| r.confidence);

            if self.config.is_confident(top.confidence, runner_up) {
                let template = Arc::clone(&top.template);
                working.transition(ConversationStatus::Classifying)?;
                return self.delegate(working, template, text, ledger).await;
            }

            return Ok(self.ask_choice(working, &results));
        }

        let candidates: Vec<MatchResult> = working
            .candidates
            .iter()
            .filter_map(|id| self.deps.catalog.get(id))
            .map(|template| MatchResult {
                template,
                confidence: 0.0,
                matched_keywords: Vec::new(),
            })
            .collect();

        Ok(self.ask_choice(working, &candidates))
    }

    fn pick_candidate(&self, working: &ConversationState, text: &str) -> Option<Arc<Template>> {
        let answer = text.trim().trim_end_matches(['.', ')']);

        if let Ok(ordinal) = answer.parse::<usize>() {
            return ordinal
                .checked_sub(1)
                .and_then(|index| working.candidates.get(index))
                .and_then(|id| self.deps.catalog.get(id));
        }

        let lowered = text.to_lowercase();

        working
            .candidates
            .iter()
            .filter_map(|id| self.deps.catalog.get(id))
            .find(|template| {
                template.id.eq_ignore_ascii_case(answer)
                    || lowered.contains(&template.name.to_lowercase())
            })
    }

    fn ask_choice(&self, working: &mut ConversationState, results: &[MatchResult]) -> Step {
        let candidates: Vec<CandidateSummary> = results
            .iter()
            .take(self.config.candidate_count.max(1))
            .map(CandidateSummary::from)
            .collect();

        working.candidates = candidates.iter().map(|c| c.template_id.clone()).collect();

        let mut prompt = "I can set up a few automations for this. Which one do you mean?".to_string();
        for (index, candidate) in candidates.iter().enumerate() {
            prompt.push_str(&format!("\n{}. {}", index + 1, candidate.name));
        }

        Step {
            response: OrchestratorResponse::ClarificationNeeded {
                reason: ClarificationReason::AmbiguousIntent,
                field: None,
                prompt,
                candidates,
                error: None,
            },
            action: TraceAction::Clarification {
                reason: ClarificationReason::AmbiguousIntent.as_str().to_string(),
            },
        }
    }

    async fn delegate(
        &self,
        working: &mut ConversationState,
        template: Arc<Template>,
        text: &str,
        ledger: &mut TurnLedger,
    ) -> Result<Step, DomainError> {
        let domain = template
            .category
            .parse::<DomainTrack>()
            .unwrap_or(DomainTrack::General);

        working.transition(ConversationStatus::Delegated { domain })?;
        working.active_domain = Some(domain);
        working.template_id = Some(template.id.clone());
        working.candidates.clear();
        working.findings.clear();
        working.pending_field = None;

        working.transition(ConversationStatus::SlotFilling)?;
        self.fill_slots(working, text, ledger).await
    }

    fn active_template(&self, working: &ConversationState) -> Result<Arc<Template>, DomainError> {
        let template_id = working.template_id.as_deref().ok_or_else(|| {
            DomainError::internal(format!("Conversation '{}' has no template", working.id))
        })?;

        self.deps.catalog.get(template_id).ok_or_else(|| {
            DomainError::internal(format!("Template '{}' is no longer in the catalog", template_id))
        })
    }

    /// Resolves required inputs in declaration order, stopping at the first gap
    async fn fill_slots(
        &self,
        working: &mut ConversationState,
        text: &str,
        ledger: &mut TurnLedger,
    ) -> Result<Step, DomainError> {
        let template = self.active_template(working)?;
        let unresolved: Vec<&InputDeclaration> = template
            .required_inputs
            .iter()
            .filter(|input| !working.findings.contains_key(&input.name))
            .collect();

        for input in unresolved {
            match self.extract(working, &template, input, text, ledger).await? {
                Extraction::Value(raw) => match ParameterValidator::validate(input, &raw, true) {
                    Ok(value) => {
                        working.findings.insert(input.name.clone(), value);
                        ledger.resolved.push(input.name.clone());
                    }
                    Err(failure) => {
                        working.pending_field = Some(input.name.clone());
                        debug!(
                            conversation_id = %working.id,
                            field = %input.name,
                            rule = %failure.rule,
                            "Extracted value rejected"
                        );

                        return Ok(Step {
                            action: TraceAction::RejectedSlot {
                                field: input.name.clone(),
                                rule: failure.rule.as_str().to_string(),
                            },
                            response: OrchestratorResponse::ClarificationNeeded {
                                reason: ClarificationReason::InvalidField,
                                field: Some(input.name.clone()),
                                prompt: rejection_prompt(input, &failure.message),
                                candidates: Vec::new(),
                                error: Some(failure),
                            },
                        });
                    }
                },
                Extraction::Missing => {
                    working.transition(ConversationStatus::Clarifying {
                        resume: ResumePoint::SlotFilling,
                    })?;
                    working.pending_field = Some(input.name.clone());

                    return Ok(Step {
                        action: TraceAction::AskedSlot {
                            field: input.name.clone(),
                        },
                        response: OrchestratorResponse::ClarificationNeeded {
                            reason: ClarificationReason::MissingField,
                            field: Some(input.name.clone()),
                            prompt: slot_question(input),
                            candidates: Vec::new(),
                            error: None,
                        },
                    });
                }
                Extraction::Ambiguous { question } => {
                    working.transition(ConversationStatus::Clarifying {
                        resume: ResumePoint::SlotFilling,
                    })?;
                    working.pending_field = Some(input.name.clone());

                    return Ok(Step {
                        action: TraceAction::Clarification {
                            reason: ClarificationReason::AmbiguousField.as_str().to_string(),
                        },
                        response: OrchestratorResponse::ClarificationNeeded {
                            reason: ClarificationReason::AmbiguousField,
                            field: Some(input.name.clone()),
                            prompt: question.unwrap_or_else(|| slot_question(input)),
                            candidates: Vec::new(),
                            error: None,
                        },
                    });
                }
            }
        }

        self.fill_optional(working, &template, text, ledger).await?;

        working.pending_field = None;
        working.transition(ConversationStatus::Ready)?;
        self.show_form(working, ledger)
    }

    /// Picks up optional inputs the message happens to mention
    async fn fill_optional(
        &self,
        working: &mut ConversationState,
        template: &Template,
        text: &str,
        ledger: &mut TurnLedger,
    ) -> Result<(), DomainError> {
        for input in &template.optional_inputs {
            if working.findings.contains_key(&input.name) {
                continue;
            }

            let Extraction::Value(raw) = self.extract(working, template, input, text, ledger).await?
            else {
                continue;
            };

            match ParameterValidator::validate(input, &raw, false) {
                Ok(value) if !value.is_null() => {
                    working.findings.insert(input.name.clone(), value);
                    ledger.resolved.push(input.name.clone());
                }
                Ok(_) => {}
                Err(failure) => debug!(
                    conversation_id = %working.id,
                    field = %input.name,
                    rule = %failure.rule,
                    "Optional value skipped"
                ),
            }
        }

        Ok(())
    }

    fn show_form(
        &self,
        working: &ConversationState,
        ledger: &TurnLedger,
    ) -> Result<Step, DomainError> {
        let template = self.active_template(working)?;

        let mut usage = working.total_usage();
        usage.add(ledger.usage);

        Ok(Step {
            response: OrchestratorResponse::WorkflowReady {
                form: ActivationForm::build(&template, &working.findings, self.cost.estimate(usage)),
            },
            action: TraceAction::Ready {
                template_id: template.id.clone(),
            },
        })
    }

    /// Free reply from the persona matching the request's domain keywords
    async fn converse(
        &self,
        working: &mut ConversationState,
        text: &str,
        ledger: &mut TurnLedger,
    ) -> Result<Step, DomainError> {
        let domain = DomainTrack::route(text);
        let history = history_messages(working);

        let completion = self
            .infer(
                history,
                &conversational_prompt(domain),
                self.config.conversational_temperature,
                self.classifier.classify(text),
                ledger,
            )
            .await?;

        working.transition(ConversationStatus::Init)?;
        if domain != DomainTrack::General {
            working.active_domain = Some(domain);
        }

        Ok(Step {
            response: OrchestratorResponse::Conversational {
                domain,
                reply: completion.text.trim().to_string(),
            },
            action: TraceAction::Conversational { domain },
        })
    }

    async fn extract(
        &self,
        working: &ConversationState,
        template: &Template,
        input: &InputDeclaration,
        text: &str,
        ledger: &mut TurnLedger,
    ) -> Result<Extraction, DomainError> {
        let track = working.active_domain.unwrap_or(DomainTrack::General);
        let hint = self.classifier.classify(text).escalate(input.sensitive);

        let completion = self
            .infer(
                vec![Message::user(text)],
                &extraction_prompt(track, template, input),
                self.config.extraction_temperature,
                hint,
                ledger,
            )
            .await?;

        Ok(parse_extraction(&completion.text))
    }

    /// One gateway call bounded by the turn timeout, retried once
    async fn infer(
        &self,
        messages: Vec<Message>,
        system_prompt: &str,
        temperature: f32,
        hint: SensitivityHint,
        ledger: &mut TurnLedger,
    ) -> Result<GatewayCompletion, DomainError> {
        let timeout = self.config.turn_timeout();
        let mut last_error = None;

        for attempt in 1..=2u32 {
            let call = self
                .deps
                .gateway
                .complete(messages.clone(), system_prompt, temperature, hint);

            match tokio::time::timeout(timeout, call).await {
                Ok(Ok(completion)) => {
                    ledger.model_ids.push(completion.model_id.clone());
                    ledger.usage.add(completion.usage);
                    return Ok(completion);
                }
                Ok(Err(e)) if e.is_transient() => last_error = Some(e.to_string()),
                Ok(Err(e)) => return Err(e),
                Err(_) => {
                    last_error = Some(format!("timed out after {} ms", timeout.as_millis()))
                }
            }

            if attempt == 1 {
                warn!(
                    error = last_error.as_deref().unwrap_or_default(),
                    "Inference call failed, retrying"
                );
                tokio::time::sleep(self.config.retry_backoff()).await;
            }
        }

        Err(DomainError::inference_unavailable(
            last_error.unwrap_or_else(|| "no attempt made".to_string()),
        ))
    }

    /// Materializes and activates the workflow of a `Ready` conversation
    ///
    /// Overrides are raw values keyed by input name and go through the
    /// validator; an invalid one leaves the conversation `Ready`.
    pub async fn activate(
        &self,
        conversation_id: &ConversationId,
        overrides: BTreeMap<String, String>,
    ) -> Result<ActivationOutcome, DomainError> {
        let _guard = self.locks.acquire(conversation_id.as_str()).await;

        let mut working = self.get_conversation(conversation_id).await?;

        if working.status != ConversationStatus::Ready {
            return Err(DomainError::conflict(format!(
                "Conversation '{}' is {}, only a ready conversation can be activated",
                conversation_id, working.status
            )));
        }

        let template = self.active_template(&working)?;

        for (name, raw) in &overrides {
            let input = template.input(name).ok_or_else(|| {
                DomainError::validation(format!(
                    "Template '{}' has no input '{}'",
                    template.id, name
                ))
            })?;

            let value = ParameterValidator::validate(input, raw, template.is_required(name))?;

            if value.is_null() {
                working.findings.remove(name);
            } else {
                working.findings.insert(name.clone(), value);
            }
        }

        let context = MaterializeContext::new(conversation_id.clone())
            .with_model_ids(working.model_ids());
        let definition = self
            .materializer
            .materialize(&template, &working.findings, &context)?;

        self.deps.workflows.create(definition.clone()).await?;

        working.workflow_id = Some(definition.id.to_string());
        working.transition(ConversationStatus::Activated)?;
        working.push_turn(
            TurnRole::Assistant,
            format!("\"{}\" is activated.", definition.name),
        );
        working.record(
            TraceAction::Activated {
                workflow_id: definition.id.to_string(),
            },
            overrides.keys().cloned().collect(),
            Vec::new(),
            TokenUsage::default(),
        );

        let working = self.deps.conversations.save(working).await?;
        record_activation(&template.id);

        info!(
            conversation_id = %conversation_id,
            workflow_id = %definition.id,
            template_id = %template.id,
            audit_trace_id = %definition.manifest.audit_trace_id,
            "Workflow activated"
        );

        if let Err(e) = self.deps.dispatcher.publish_activation(&definition).await {
            error!(
                conversation_id = %conversation_id,
                workflow_id = %definition.id,
                error = %e,
                "Failed to record activation events"
            );
        }

        Ok(ActivationOutcome {
            conversation_id: working.id,
            status: working.status,
            workflow: definition,
        })
    }
}

/// The user message before the current one
fn previous_user_text(working: &ConversationState) -> Option<&str> {
    working
        .turns
        .iter()
        .rev()
        .filter(|turn| turn.role == TurnRole::User)
        .nth(1)
        .map(|turn| turn.text.as_str())
}

/// Recent turns as chat messages, starting with a user turn
fn history_messages(working: &ConversationState) -> Vec<Message> {
    let start = working.turns.len().saturating_sub(HISTORY_TURNS);

    working.turns[start..]
        .iter()
        .skip_while(|turn| turn.role == TurnRole::Assistant)
        .map(|turn| match turn.role {
            TurnRole::User => Message::user(turn.text.as_str()),
            TurnRole::Assistant => Message::assistant(turn.text.as_str()),
        })
        .collect()
}
