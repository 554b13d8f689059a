//! School authentication: password hashing, session tokens, request guard

pub mod middleware;
pub mod password;
pub mod token;

pub use middleware::{require_school, AuthenticatedSchool};
pub use password::{hash_password, verify_password};
pub use token::{Claims, IssuedToken, TokenService};
