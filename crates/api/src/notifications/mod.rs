//! Notification routing infrastructure.
//!
//! The [`NotificationRouter`] subscribes to the event bus and emails the
//! users an event concerns.

pub mod router;

pub use router::NotificationRouter;
