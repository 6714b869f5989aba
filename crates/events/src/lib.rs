//! Event bus and notification plumbing for the memorial platform.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`PlatformEvent`]: the domain event envelope.
//! - [`EventPersistence`]: background service writing every event to
//!   `event_log`.
//! - [`notification`]: turns guestbook events into addressed emails.
//! - [`delivery`]: SMTP delivery.

pub mod bus;
pub mod delivery;
pub mod notification;
pub mod persistence;

pub use bus::{EventBus, PlatformEvent};
pub use delivery::email::{EmailConfig, EmailDelivery, EmailError};
pub use notification::Notification;
pub use persistence::EventPersistence;
