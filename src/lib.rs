//! Automation Orchestrator
//!
//! Turns a chat conversation into a validated, ready-to-activate workflow:
//! - Keyword template matching with clarification on ambiguity
//! - Slot filling through a privacy-aware inference gateway
//! - Workflow materialization with a provenance manifest
//! - Outbox-backed event stream with idempotent workers

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use api::state::AppState;
use config::InferenceConfig;
use domain::event::EventStream;
use domain::inference::ProviderRoute;
use domain::{
    AuditRecord, ConsumerCursor, ConversationState, DomainError, EngineActivation, OutboxRecord,
    ProcessedEvent, Storage, WorkflowDefinition,
};
use infrastructure::catalog::CatalogLoader;
use infrastructure::engine::HttpExecutionEngine;
use infrastructure::events::{
    create_event_stream, AuditLogHandler, EventDispatcher, EventWorker, ExecutionTriggerHandler,
    IdempotencyGuard, NotificationHandler, OutboxSweeper,
};
use infrastructure::inference::RoutingInferenceGateway;
use infrastructure::llm::ProviderFactory;
use infrastructure::services::{OrchestratorDeps, OrchestratorService, WorkflowService};
use infrastructure::storage::{tables, StorageBackend};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// One storage per entity, opened once and shared by every component
#[derive(Clone)]
pub struct Stores {
    pub conversations: Arc<dyn Storage<ConversationState>>,
    pub workflows: Arc<dyn Storage<WorkflowDefinition>>,
    pub outbox: Arc<dyn Storage<OutboxRecord>>,
    pub cursors: Arc<dyn Storage<ConsumerCursor>>,
    pub processed: Arc<dyn Storage<ProcessedEvent>>,
    pub audit: Arc<dyn Storage<AuditRecord>>,
    pub activations: Arc<dyn Storage<EngineActivation>>,
}

impl Stores {
    pub async fn open(backend: &StorageBackend) -> Result<Self, DomainError> {
        Ok(Self {
            conversations: backend.open(tables::CONVERSATIONS).await?,
            workflows: backend.open(tables::WORKFLOWS).await?,
            outbox: backend.open(tables::OUTBOX).await?,
            cursors: backend.open(tables::CURSORS).await?,
            processed: backend.open(tables::PROCESSED_EVENTS).await?,
            audit: backend.open(tables::AUDIT_LOG).await?,
            activations: backend.open(tables::ENGINE_ACTIVATIONS).await?,
        })
    }
}

/// Everything a process needs: HTTP state plus the event plumbing
pub struct Application {
    pub state: AppState,
    pub stores: Stores,
    pub stream: Arc<dyn EventStream>,
    pub dispatcher: Arc<EventDispatcher>,
}

/// Connect storage, load the catalog and wire the services
pub async fn create_application(config: &AppConfig) -> anyhow::Result<Application> {
    let backend = StorageBackend::connect(&config.storage.to_storage_config()?).await?;
    let stores = Stores::open(&backend).await?;

    let catalog = Arc::new(CatalogLoader::load(&config.catalog)?);

    let gateway = create_gateway(&config.inference)?;

    let stream = create_event_stream(&config.events).await?;
    let dispatcher = Arc::new(EventDispatcher::new(
        stores.outbox.clone(),
        stream.clone(),
        &config.events,
    ));
    info!(stream = dispatcher.stream_name(), "Event stream ready");

    let deps = OrchestratorDeps {
        conversations: stores.conversations.clone(),
        workflows: stores.workflows.clone(),
        catalog,
        gateway: Arc::new(gateway),
        dispatcher: dispatcher.clone(),
    };

    let orchestrator = OrchestratorService::new(deps, config.orchestrator.clone())
        .with_materializer(config.materializer.clone())
        .with_cost(config.cost.clone());

    let workflows = WorkflowService::new(stores.workflows.clone(), stores.activations.clone());

    let state = AppState::new(Arc::new(orchestrator), Arc::new(workflows), backend);

    Ok(Application {
        state,
        stores,
        stream,
        dispatcher,
    })
}

/// Gateway with a local route always and a cloud route when a key is set
pub fn create_gateway(config: &InferenceConfig) -> Result<RoutingInferenceGateway, DomainError> {
    let mut gateway = RoutingInferenceGateway::new(config.gateway.clone())
        .with_provider(ProviderRoute::Local, ProviderFactory::create_local(&config.local)?);

    if config.cloud.api_key.trim().is_empty() {
        warn!("No cloud API key configured, all inference stays local");
    } else {
        gateway = gateway.with_provider(ProviderRoute::Cloud, ProviderFactory::create_cloud(&config.cloud)?);
        info!(model = %config.cloud.model, "Cloud provider configured");
    }

    info!(model = %config.local.model, base_url = %config.local.base_url, "Local provider configured");

    Ok(gateway)
}

/// The audit, notification and execution consumers, each with its own cursor
pub fn create_workers(app: &Application, config: &AppConfig) -> anyhow::Result<Vec<EventWorker>> {
    let guard = Arc::new(IdempotencyGuard::new(
        app.stores.processed.clone(),
        config.events.idempotency_cache_capacity,
    ));
    let engine = Arc::new(HttpExecutionEngine::from_config(&config.engine)?);

    let worker = |consumer: &str| {
        EventWorker::new(
            consumer,
            app.stream.clone(),
            app.stores.cursors.clone(),
            guard.clone(),
            &config.events,
        )
    };

    Ok(vec![
        worker("audit").with_handler(Arc::new(AuditLogHandler::new(app.stores.audit.clone()))),
        worker("notifications").with_handler(Arc::new(NotificationHandler::new(&config.notifications)?)),
        worker("execution").with_handler(Arc::new(ExecutionTriggerHandler::new(
            app.stores.workflows.clone(),
            app.stores.activations.clone(),
            engine,
        ))),
    ])
}

/// Spawns the outbox sweeper and, when `with_workers`, the event workers
pub fn spawn_background(
    app: &Application,
    config: &AppConfig,
    with_workers: bool,
    shutdown: &watch::Receiver<bool>,
) -> anyhow::Result<Vec<JoinHandle<()>>> {
    let mut handles = Vec::new();

    let sweeper = OutboxSweeper::new(app.dispatcher.clone(), config.events.sweep_interval());
    handles.push(tokio::spawn(sweeper.run(shutdown.clone())));

    if with_workers {
        for worker in create_workers(app, config)? {
            info!(consumer = worker.consumer(), "Starting event worker");
            handles.push(tokio::spawn(worker.run(shutdown.clone())));
        }
    }

    Ok(handles)
}
