//! HTTP API handlers for roster-api

pub mod accounts;
pub mod health;
pub mod students;
pub mod transfer;

pub use accounts::{login, profile, signup};
pub use health::health_routes;
pub use students::{add_student, delete_student, list_students, update_student};
pub use transfer::{export_students, import_students, import_template};
