//! Subscription plan table
//!
//! Plans are an immutable table keyed by plan identifier. The table is
//! loaded from the bootstrap TOML config (or the built-in defaults) once
//! at startup and shared read-only by every request.

use crate::time::add_days;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Longest subscription a plan may grant (1000 years)
pub const MAX_DURATION_DAYS: u32 = 365_250;

/// Capacity and duration granted by one plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanTerms {
    /// Maximum number of students a school on this plan may hold
    pub students_allowed: i64,
    /// Subscription length, counted from signup
    pub duration_days: u32,
}

/// Subscription granted to a school at signup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub plan: String,
    pub students_allowed: i64,
    pub expires_at: DateTime<Utc>,
}

/// Immutable plan identifier -> terms mapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlanTable {
    plans: BTreeMap<String, PlanTerms>,
}

impl Default for PlanTable {
    fn default() -> Self {
        let mut plans = BTreeMap::new();
        plans.insert(
            "basic".to_string(),
            PlanTerms { students_allowed: 100, duration_days: 30 },
        );
        plans.insert(
            "standard".to_string(),
            PlanTerms { students_allowed: 500, duration_days: 180 },
        );
        plans.insert(
            "premium".to_string(),
            PlanTerms { students_allowed: 2000, duration_days: 365 },
        );
        Self { plans }
    }
}

impl PlanTable {
    /// Check that every plan has a usable identifier, a non-negative
    /// allowance and a bounded duration
    pub fn validate(&self) -> Result<()> {
        if self.plans.is_empty() {
            return Err(Error::Config("plan table is empty".to_string()));
        }
        for (name, terms) in &self.plans {
            if name.trim().is_empty() || name.trim() != name {
                return Err(Error::Config(format!("invalid plan identifier: {:?}", name)));
            }
            if terms.students_allowed < 0 {
                return Err(Error::Config(format!(
                    "plan '{}' has negative students_allowed",
                    name
                )));
            }
            if terms.duration_days > MAX_DURATION_DAYS {
                return Err(Error::Config(format!(
                    "plan '{}' duration_days {} exceeds the maximum of {}",
                    name, terms.duration_days, MAX_DURATION_DAYS
                )));
            }
        }
        Ok(())
    }

    /// Look up the terms of a plan
    pub fn terms(&self, plan: &str) -> Option<&PlanTerms> {
        self.plans.get(plan)
    }

    /// Known plan identifiers, sorted
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.plans.keys().map(String::as_str)
    }

    /// Derive the subscription a school receives when signing up on `plan`
    ///
    /// This is the only place allowance and expiry are computed; stored
    /// schools keep whatever was derived here.
    pub fn subscribe(&self, plan: &str, signed_up_at: DateTime<Utc>) -> Option<Subscription> {
        self.terms(plan).map(|terms| Subscription {
            plan: plan.to_string(),
            students_allowed: terms.students_allowed,
            expires_at: add_days(signed_up_at, terms.duration_days),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_default_table_has_three_plans() {
        let table = PlanTable::default();
        let names: Vec<&str> = table.names().collect();
        assert_eq!(names, vec!["basic", "premium", "standard"]);
        assert_eq!(table.terms("basic").unwrap().students_allowed, 100);
        assert!(table.validate().is_ok());
    }

    #[test]
    fn test_subscribe_derives_limit_and_expiry() {
        let table = PlanTable::default();
        let signup = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();

        let sub = table.subscribe("basic", signup).unwrap();
        assert_eq!(sub.plan, "basic");
        assert_eq!(sub.students_allowed, 100);
        assert_eq!(sub.expires_at, Utc.with_ymd_and_hms(2024, 3, 31, 8, 0, 0).unwrap());
    }

    #[test]
    fn test_subscribe_unknown_plan() {
        let table = PlanTable::default();
        assert!(table.subscribe("platinum", Utc::now()).is_none());
    }

    fn table(name: &str, terms: PlanTerms) -> PlanTable {
        let mut plans = BTreeMap::new();
        plans.insert(name.to_string(), terms);
        PlanTable { plans }
    }

    #[test]
    fn test_rejects_negative_allowance() {
        let broken = table("broken", PlanTerms { students_allowed: -1, duration_days: 1 });
        assert!(broken.validate().is_err());
    }

    #[test]
    fn test_rejects_empty_table() {
        let empty = PlanTable { plans: BTreeMap::new() };
        assert!(empty.validate().is_err());
    }

    #[test]
    fn test_rejects_unbounded_duration() {
        let forever = table(
            "forever",
            PlanTerms { students_allowed: 10, duration_days: 3_000_000 },
        );
        assert!(matches!(forever.validate(), Err(Error::Config(_))));

        let longest = table(
            "longest",
            PlanTerms { students_allowed: 10, duration_days: MAX_DURATION_DAYS },
        );
        assert!(longest.validate().is_ok());
    }

    #[test]
    fn test_longest_plan_expiry_stays_storable() {
        let longest = table(
            "longest",
            PlanTerms { students_allowed: 10, duration_days: MAX_DURATION_DAYS },
        );
        let sub = longest.subscribe("longest", Utc::now()).unwrap();
        assert!(sub.expires_at <= crate::time::latest_storable());
    }

    #[test]
    fn test_deserialize_from_toml() {
        let toml_str = r#"
            [gold]
            students_allowed = 250
            duration_days = 90
        "#;
        let table: PlanTable = toml::from_str(toml_str).unwrap();
        assert_eq!(
            table.terms("gold"),
            Some(&PlanTerms { students_allowed: 250, duration_days: 90 })
        );
    }
}
