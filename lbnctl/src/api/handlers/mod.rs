//! HTTP request handlers for all API endpoints.
//!
//! This module contains Axum route handlers organized by resource type.
//! Each handler is responsible for:
//! - Request validation and deserialization
//! - Business logic execution via database repositories
//! - Response serialization into the envelope shape
//!
//! # Handler Modules
//!
//! - [`auth`]: Login, logout, and session introspection
//! - [`devices`]: Measurement device CRUD and library attachment
//! - [`libraries`]: Library CRUD and IP allowlist maintenance
//! - [`notes`]: Note CRUD and library attachment
//! - [`runs`]: Measurement run CRUD and library attachment
//! - [`users`]: User CRUD
//!
//! # Status Conventions
//!
//! Reads return 200, creations 201, and bodiless mutations (deletes,
//! attach/detach, updates of existing rows) 204. A PUT against a missing
//! identity materializes the row and returns 201 with the created row, so
//! callers can distinguish update-in-place from upsert.
//!
//! # Error Handling
//!
//! Handlers return [`crate::errors::Error`] which converts to the
//! appropriate HTTP status code and envelope-shaped JSON error response.

pub mod auth;
pub mod devices;
pub mod libraries;
pub mod notes;
pub mod runs;
pub mod users;
