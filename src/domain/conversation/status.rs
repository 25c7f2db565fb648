//! Conversation state machine

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::track::DomainTrack;
use crate::domain::DomainError;

/// State a clarification returns to once resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResumePoint {
    Classifying,
    SlotFilling,
}

/// Orchestrator status of a conversation
///
/// `Init` is the only initial state. `Activated` ends a workflow instance;
/// the next message starts a new one from `Init`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ConversationStatus {
    #[default]
    Init,
    Classifying,
    Delegated {
        domain: DomainTrack,
    },
    SlotFilling,
    Clarifying {
        resume: ResumePoint,
    },
    Ready,
    Activated,
}

impl ConversationStatus {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Classifying => "classifying",
            Self::Delegated { .. } => "delegated",
            Self::SlotFilling => "slot_filling",
            Self::Clarifying { .. } => "clarifying",
            Self::Ready => "ready",
            Self::Activated => "activated",
        }
    }

    pub fn can_transition_to(&self, next: &ConversationStatus) -> bool {
        use ConversationStatus::*;

        match (self, next) {
            (Init, Classifying) => true,
            (Classifying, Delegated { .. }) => true,
            (Classifying, Init) => true,
            (
                Classifying,
                Clarifying {
                    resume: ResumePoint::Classifying,
                },
            ) => true,
            (
                Clarifying {
                    resume: ResumePoint::Classifying,
                },
                Classifying,
            ) => true,
            (
                Clarifying {
                    resume: ResumePoint::Classifying,
                },
                Delegated { .. },
            ) => true,
            (
                Clarifying {
                    resume: ResumePoint::SlotFilling,
                },
                SlotFilling,
            ) => true,
            (Delegated { .. }, SlotFilling) => true,
            (SlotFilling, SlotFilling) => true,
            (
                SlotFilling,
                Clarifying {
                    resume: ResumePoint::SlotFilling,
                },
            ) => true,
            (SlotFilling, Ready) => true,
            (Ready, Ready) => true,
            (Ready, Activated) => true,
            (Activated, Init) => true,
            _ => false,
        }
    }
}

impl fmt::Display for ConversationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Delegated { domain } => write!(f, "delegated({})", domain),
            Self::Clarifying { resume } => write!(
                f,
                "clarifying({})",
                match resume {
                    ResumePoint::Classifying => "classifying",
                    ResumePoint::SlotFilling => "slot_filling",
                }
            ),
            other => write!(f, "{}", other.name()),
        }
    }
}

/// Returns `Conflict` for a transition the state machine does not allow
pub fn check_transition(
    from: &ConversationStatus,
    to: &ConversationStatus,
) -> Result<(), DomainError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(DomainError::conflict(format!(
            "Invalid conversation transition from {} to {}",
            from, to
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_main_path_is_allowed() {
        let path = [
            ConversationStatus::Init,
            ConversationStatus::Classifying,
            ConversationStatus::Delegated {
                domain: DomainTrack::Finance,
            },
            ConversationStatus::SlotFilling,
            ConversationStatus::Ready,
            ConversationStatus::Activated,
            ConversationStatus::Init,
        ];

        for pair in path.windows(2) {
            assert!(check_transition(&pair[0], &pair[1]).is_ok(), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_clarifying_returns_to_prior_state() {
        let from_slots = ConversationStatus::Clarifying {
            resume: ResumePoint::SlotFilling,
        };
        assert!(from_slots.can_transition_to(&ConversationStatus::SlotFilling));
        assert!(!from_slots.can_transition_to(&ConversationStatus::Classifying));

        let from_classifying = ConversationStatus::Clarifying {
            resume: ResumePoint::Classifying,
        };
        assert!(from_classifying.can_transition_to(&ConversationStatus::Classifying));
        assert!(!from_classifying.can_transition_to(&ConversationStatus::Ready));
    }

    #[test]
    fn test_shortcuts_are_rejected() {
        assert!(check_transition(&ConversationStatus::Init, &ConversationStatus::Ready).is_err());
        assert!(
            check_transition(&ConversationStatus::SlotFilling, &ConversationStatus::Activated)
                .is_err()
        );
        assert!(
            check_transition(&ConversationStatus::Activated, &ConversationStatus::Ready).is_err()
        );
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_value(ConversationStatus::Clarifying {
            resume: ResumePoint::SlotFilling,
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({"state": "clarifying", "resume": "slot_filling"})
        );

        let json = serde_json::to_value(ConversationStatus::Ready).unwrap();
        assert_eq!(json, serde_json::json!({"state": "ready"}));
    }
}
