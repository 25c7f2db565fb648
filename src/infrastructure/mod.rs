//! Infrastructure layer - storage, providers, event plumbing and services

pub mod catalog;
pub mod engine;
pub mod events;
pub mod inference;
pub mod llm;
pub mod observability;
pub mod services;
pub mod storage;
