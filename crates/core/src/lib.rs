//! Domain rules for the memorial platform.
//!
//! Everything in this crate is pure: no database, no network, no clock
//! reads except where a function takes `now` explicitly. The `db` and `api`
//! crates call into it for validation and state-machine decisions.

pub mod account;
pub mod error;
pub mod guestbook;
pub mod hashing;
pub mod media;
pub mod memorial;
pub mod pagination;
pub mod payment;
pub mod platform_events;
pub mod prayer_list;
pub mod rate_limit;
pub mod roles;
pub mod spam;
pub mod status;
pub mod types;
