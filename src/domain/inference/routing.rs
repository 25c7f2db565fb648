//! Provider route selection

use std::fmt;

use serde::{Deserialize, Serialize};

use super::sensitivity::SensitivityHint;

/// Which provider a request is sent to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderRoute {
    Cloud,
    Local,
}

impl ProviderRoute {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cloud => "cloud",
            Self::Local => "local",
        }
    }

    pub fn other(&self) -> Self {
        match self {
            Self::Cloud => Self::Local,
            Self::Local => Self::Cloud,
        }
    }
}

impl fmt::Display for ProviderRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteReason {
    Sensitive,
    PolicyForced,
    Default,
}

/// Privacy policy applied to every request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivacyPolicy {
    /// Send everything to the local provider
    #[serde(default)]
    pub force_local: bool,
    /// Keep privacy-routed requests on the local provider even when it fails
    #[serde(default)]
    pub block_sensitive_failover: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteDecision {
    pub route: ProviderRoute,
    pub reason: RouteReason,
}

impl RouteDecision {
    pub fn is_privacy_driven(&self) -> bool {
        !matches!(self.reason, RouteReason::Default)
    }

    /// Provider to fail over to, if the policy allows one
    pub fn failover(&self, policy: &PrivacyPolicy) -> Option<ProviderRoute> {
        if self.is_privacy_driven() && policy.block_sensitive_failover {
            None
        } else {
            Some(self.route.other())
        }
    }
}

/// Local when the hint is sensitive or the policy forces it, cloud otherwise
pub fn select_route(hint: SensitivityHint, policy: &PrivacyPolicy) -> RouteDecision {
    if hint.is_sensitive() {
        RouteDecision {
            route: ProviderRoute::Local,
            reason: RouteReason::Sensitive,
        }
    } else if policy.force_local {
        RouteDecision {
            route: ProviderRoute::Local,
            reason: RouteReason::PolicyForced,
        }
    } else {
        RouteDecision {
            route: ProviderRoute::Cloud,
            reason: RouteReason::Default,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_route() {
        let policy = PrivacyPolicy::default();

        assert_eq!(
            select_route(SensitivityHint::Normal, &policy).route,
            ProviderRoute::Cloud
        );
        assert_eq!(
            select_route(SensitivityHint::Sensitive, &policy),
            RouteDecision {
                route: ProviderRoute::Local,
                reason: RouteReason::Sensitive
            }
        );

        let forced = PrivacyPolicy {
            force_local: true,
            ..Default::default()
        };
        assert_eq!(
            select_route(SensitivityHint::Normal, &forced).reason,
            RouteReason::PolicyForced
        );
    }

    #[test]
    fn test_failover_allowed_by_default() {
        let policy = PrivacyPolicy::default();

        let sensitive = select_route(SensitivityHint::Sensitive, &policy);
        assert_eq!(sensitive.failover(&policy), Some(ProviderRoute::Cloud));

        let normal = select_route(SensitivityHint::Normal, &policy);
        assert_eq!(normal.failover(&policy), Some(ProviderRoute::Local));
    }

    #[test]
    fn test_failover_blocked_for_privacy_routes_when_configured() {
        let strict = PrivacyPolicy {
            block_sensitive_failover: true,
            ..Default::default()
        };

        let sensitive = select_route(SensitivityHint::Sensitive, &strict);
        assert_eq!(sensitive.failover(&strict), None);

        let forced = PrivacyPolicy {
            force_local: true,
            block_sensitive_failover: true,
        };
        assert_eq!(select_route(SensitivityHint::Normal, &forced).failover(&forced), None);

        let normal = select_route(SensitivityHint::Normal, &strict);
        assert_eq!(normal.failover(&strict), Some(ProviderRoute::Local));
    }
}
