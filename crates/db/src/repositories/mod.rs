//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument. Multi-statement writes open their
//! own transaction.

pub mod blocked_user_repo;
pub mod event_repo;
pub mod guestbook_repo;
pub mod media_asset_repo;
pub mod memorial_moderator_repo;
pub mod memorial_repo;
pub mod payment_repo;
pub mod prayer_list_repo;
pub mod rate_limit_repo;
pub mod session_repo;
pub mod user_repo;

pub use blocked_user_repo::BlockedUserRepo;
pub use event_repo::EventRepo;
pub use guestbook_repo::GuestbookRepo;
pub use media_asset_repo::MediaAssetRepo;
pub use memorial_moderator_repo::MemorialModeratorRepo;
pub use memorial_repo::MemorialRepo;
pub use payment_repo::PaymentRepo;
pub use prayer_list_repo::PrayerListRepo;
pub use rate_limit_repo::RateLimitRepo;
pub use session_repo::SessionRepo;
pub use user_repo::UserRepo;
