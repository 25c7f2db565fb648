//! Workflow materialization with provenance

mod definition;
mod error;
mod materializer;

pub use definition::{
    ComponentRef, ProvenanceManifest, WorkflowDefinition, WorkflowId, MANIFEST_SCHEMA_VERSION,
};
pub use error::WorkflowError;
pub use materializer::{MaterializeContext, MaterializerConfig, WorkflowMaterializer};
