//! Database record models matching table schemas.
//!
//! These structs are the request/response DTOs exchanged with the
//! repositories. They are distinct from the API models so storage and API
//! representations can evolve independently; conversions live on the DB
//! side (`From<ApiModel> for ...DBRequest`).

pub mod devices;
pub mod libraries;
pub mod notes;
pub mod runs;
pub mod users;
