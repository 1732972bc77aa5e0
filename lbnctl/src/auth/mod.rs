//! Authentication building blocks.
//!
//! Browser clients authenticate with a username and password via
//! `POST /api/v1/login`; the signed-in user is serialized into a signed JWT
//! stored in a secure, HTTP-only cookie, and deserialized back out of it on
//! every request. Both directions are pure functions of the token and the
//! configured secret - no session state lives in the process.
//!
//! Authorization (which user may touch which library) is enforced by
//! deployment-specific middleware in front of the handlers; the handlers in
//! this crate assume that check has already passed. The
//! [`crate::db::handlers::Libraries::is_member_of`] predicate exists for that
//! middleware to call.
//!
//! # Modules
//!
//! - [`current_user`]: extractor for the authenticated user in handlers
//! - [`password`]: password hashing and verification using Argon2
//! - [`session`]: JWT session token creation and verification

pub mod current_user;
pub mod password;
pub mod session;
