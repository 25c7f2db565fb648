//! Domain tracks and their reasoning personas

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::DomainError;

/// Business domain a conversation is delegated to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainTrack {
    Sales,
    Logistics,
    Finance,
    General,
}

const SALES_KEYWORDS: &[&str] = &["ouedkniss", "leads", "sales", "client"];
const LOGISTICS_KEYWORDS: &[&str] = &["delivery", "yalidine", "ship", "transport"];
const FINANCE_KEYWORDS: &[&str] = &["payment", "baridimob", "ccp", "invoice"];

impl DomainTrack {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sales => "sales",
            Self::Logistics => "logistics",
            Self::Finance => "finance",
            Self::General => "general",
        }
    }

    /// Keyword routing used when no template claims the request
    ///
    /// Checked in order sales, logistics, finance; the first track with a
    /// keyword contained in the lowercased text wins.
    pub fn route(text: &str) -> Self {
        let lowered = text.to_lowercase();
        let hit = |keywords: &[&str]| keywords.iter().any(|k| lowered.contains(k));

        if hit(SALES_KEYWORDS) {
            Self::Sales
        } else if hit(LOGISTICS_KEYWORDS) {
            Self::Logistics
        } else if hit(FINANCE_KEYWORDS) {
            Self::Finance
        } else {
            Self::General
        }
    }

    /// Opening line of every system prompt sent on behalf of this track
    pub fn persona(&self) -> &'static str {
        match self {
            Self::Sales => {
                "You are a Sales Automation Expert focused on lead generation and CRM \
                 integration in Algeria (Ouedkniss, social media)."
            }
            Self::Logistics => {
                "You are a Logistics Specialist focused on delivery automation and order \
                 tracking (Yalidine, local transport)."
            }
            Self::Finance => {
                "You are a Fintech Advisor focused on payment tracking and invoice \
                 automation (Baridimob, CCP payment verification)."
            }
            Self::General => "You are a General Automation Architect for Algerian businesses.",
        }
    }
}

impl fmt::Display for DomainTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DomainTrack {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sales" => Ok(Self::Sales),
            "logistics" => Ok(Self::Logistics),
            "finance" => Ok(Self::Finance),
            "general" => Ok(Self::General),
            other => Err(DomainError::validation(format!(
                "Unknown domain track '{}'",
                other
            ))),
        }
    }
}
