//! # Roster Common Library
//!
//! Shared code for the school roster service including:
//! - Error and result types
//! - Bootstrap configuration and root folder resolution
//! - Subscription plan table and the capacity policy
//! - Domain models (schools, students, spreadsheet columns)
//! - Import row representation and text-field normalization
//! - Database schema initialization

pub mod capacity;
pub mod config;
#[cfg(feature = "sqlx")]
pub mod db;
pub mod error;
pub mod models;
pub mod plans;
pub mod row;
pub mod time;

pub use capacity::{can_add, CapacityDecision, CapacityRejection};
pub use error::{Error, Result};
pub use plans::{PlanTable, PlanTerms};
