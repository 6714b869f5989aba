//! Token and password primitives used by the auth handlers and extractors.

pub mod jwt;
pub mod memorial_access;
pub mod password;
