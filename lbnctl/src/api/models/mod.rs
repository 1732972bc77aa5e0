//! API request and response data models.
//!
//! These structures define the public API contract: serde handles
//! deserialization of request payloads and query strings, `utoipa`
//! annotations feed the generated OpenAPI document, and every response
//! model converts `From` its database counterpart so the storage shape
//! never leaks directly.
//!
//! - [`query`]: shared window parameters and the normalized descriptor
//! - [`envelope`]: the uniform success wrapper
//! - [`libraries`], [`notes`], [`runs`], [`devices`], [`users`]: resource models
//! - [`auth`]: login payloads

pub mod auth;
pub mod devices;
pub mod envelope;
pub mod libraries;
pub mod notes;
pub mod query;
pub mod runs;
pub mod users;
