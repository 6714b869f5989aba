//! Row models and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - `Deserialize` create/update DTOs where the entity is written from requests
//!
//! Status columns are stored as SMALLINT ids and decoded straight into the
//! closed enums from `gather_core::status`.

pub mod blocked_user;
pub mod event;
pub mod guestbook;
pub mod media;
pub mod memorial;
pub mod moderator;
pub mod payment;
pub mod prayer_list;
pub mod session;
pub mod user;
