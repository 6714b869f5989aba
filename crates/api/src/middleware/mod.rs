//! Request extractors.
//!
//! - [`auth::AuthUser`] -- the authenticated user from a JWT Bearer token.
//! - [`auth::MaybeAuthUser`] -- the same, optional, for public reads.
//! - [`memorial_access::MemorialAccessToken`] -- a memorial unlock token.

pub mod auth;
pub mod memorial_access;
