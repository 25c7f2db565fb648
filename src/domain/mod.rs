//! Domain layer - Core business logic and entities

pub mod conversation;
pub mod cost;
pub mod engine;
pub mod error;
pub mod event;
pub mod inference;
pub mod orchestrator;
pub mod storage;
pub mod template;
pub mod track;
pub mod validation;
pub mod workflow;

pub use conversation::{
    ConversationId, ConversationState, ConversationStatus, ResumePoint, TraceAction, TraceEntry,
    Turn, TurnRole,
};
pub use cost::{CostConfig, CostEstimator};
pub use engine::{EngineActivation, EngineHandle, EngineRunStatus, ExecutionEngine};
pub use error::DomainError;
pub use event::{
    AuditRecord, ConsumerCursor, DomainEvent, EventHandler, EventId, EventStream, EventType,
    OutboxRecord, OutboxStatus, ProcessedEvent, StreamEntry,
};
pub use inference::{
    select_route, Completion, CompletionRequest, GatewayCompletion, InferenceGateway,
    InferenceProvider, Message, MessageRole, PrivacyPolicy, ProviderRoute, RouteDecision,
    SensitiveDataClassifier, SensitivityHint, TokenUsage,
};
pub use orchestrator::{
    ActivationForm, ActivationOutcome, OrchestratorConfig, OrchestratorResponse, TurnOutcome,
};
pub use storage::{RecordKey, Storage, StorageEntity, StorageKey};
pub use template::{MatchResult, Template, TemplateCatalog, TemplateMatcher};
pub use track::DomainTrack;
pub use validation::{InputDeclaration, InputType, ParameterValidator, ValidationFailure};
pub use workflow::{
    MaterializeContext, ProvenanceManifest, WorkflowDefinition, WorkflowError, WorkflowId,
    WorkflowMaterializer,
};
