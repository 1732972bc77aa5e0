//! Repository implementations for database access.
//!
//! Each repository wraps a SQLx connection, provides strongly-typed CRUD
//! operations, handles query construction and parameter binding, and returns
//! DTOs from [`crate::db::models`]. Association operations (attaching notes,
//! runs, and devices to libraries, IP allowlist maintenance, memberships)
//! live as inherent methods next to the trait implementations.

pub mod devices;
pub mod libraries;
pub mod notes;
pub mod repository;
pub mod runs;
pub mod users;

pub use devices::Devices;
pub use libraries::Libraries;
pub use notes::Notes;
pub use repository::{Repository, UpdateOutcome};
pub use runs::Runs;
pub use users::Users;
