//! Capacity policy for roster mutations
//!
//! Decides whether a school may add `requested` students. The rules run in
//! a fixed order and the first failing rule wins:
//!
//! 1. no plan assigned
//! 2. subscription expired
//! 3. allowance would be exceeded
//!
//! The function is pure. Callers must pass a freshly read roster count.

use crate::models::School;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Why a roster mutation was refused
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum CapacityRejection {
    NoSubscription,
    SubscriptionExpired {
        expired_at: Option<DateTime<Utc>>,
    },
    LimitExceeded {
        plan: String,
        limit: i64,
        current: i64,
        requested: i64,
    },
}

impl CapacityRejection {
    /// Short machine-readable reason
    pub fn reason(&self) -> &'static str {
        match self {
            CapacityRejection::NoSubscription => "no subscription",
            CapacityRejection::SubscriptionExpired { .. } => "subscription expired",
            CapacityRejection::LimitExceeded { .. } => "limit exceeded",
        }
    }
}

impl fmt::Display for CapacityRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapacityRejection::NoSubscription => {
                write!(f, "No active subscription. Choose a plan before adding students.")
            }
            CapacityRejection::SubscriptionExpired { expired_at: Some(at) } => {
                write!(f, "Subscription expired on {}. Renew to add students.", at.to_rfc3339())
            }
            CapacityRejection::SubscriptionExpired { expired_at: None } => {
                write!(f, "Subscription expired. Renew to add students.")
            }
            CapacityRejection::LimitExceeded { plan, limit, current, requested } => write!(
                f,
                "Student limit exceeded: the '{}' plan allows {} students and the school \
                 currently has {} (requested {} more).",
                plan, limit, current, requested
            ),
        }
    }
}

impl std::error::Error for CapacityRejection {}

/// Outcome of evaluating the capacity policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapacityDecision {
    Admissible,
    Rejected(CapacityRejection),
}

impl CapacityDecision {
    pub fn is_admissible(&self) -> bool {
        matches!(self, CapacityDecision::Admissible)
    }

    /// Convert into a `Result`, keeping the rejection as the error
    pub fn into_result(self) -> Result<(), CapacityRejection> {
        match self {
            CapacityDecision::Admissible => Ok(()),
            CapacityDecision::Rejected(rejection) => Err(rejection),
        }
    }
}

/// Evaluate whether `school` may add `requested` students at `now`
pub fn can_add(
    school: &School,
    current_count: i64,
    requested: i64,
    now: DateTime<Utc>,
) -> CapacityDecision {
    let Some(plan) = school.plan_name() else {
        return CapacityDecision::Rejected(CapacityRejection::NoSubscription);
    };

    match school.subscription_expiry {
        Some(expiry) if now <= expiry => {}
        expired_at => {
            return CapacityDecision::Rejected(CapacityRejection::SubscriptionExpired {
                expired_at,
            })
        }
    }

    if current_count.saturating_add(requested) > school.students_allowed {
        return CapacityDecision::Rejected(CapacityRejection::LimitExceeded {
            plan: plan.to_string(),
            limit: school.students_allowed,
            current: current_count,
            requested,
        });
    }

    CapacityDecision::Admissible
}
