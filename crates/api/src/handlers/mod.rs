pub mod access;
pub mod auth;
pub mod autosave;
pub mod guestbook;
pub mod media;
pub mod memorial;
pub mod moderation;
pub mod moderators;
pub mod payment;
pub mod prayer_list;
