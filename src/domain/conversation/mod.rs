//! Conversation state, status machine and trace

mod entity;
mod status;
mod trace;

pub use entity::{
    ConversationId, ConversationState, Turn, TurnRole, MAX_CONVERSATION_ID_LENGTH,
};
pub use status::{check_transition, ConversationStatus, ResumePoint};
pub use trace::{TraceAction, TraceEntry};
