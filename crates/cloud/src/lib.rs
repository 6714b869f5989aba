//! Clients for the external services the platform depends on.
//!
//! Both providers sit behind async traits so the API can hold them as
//! `Arc<dyn PaymentProvider>` / `Arc<dyn MediaProvider>` and tests can swap
//! in fakes.

pub mod error;
mod http;
pub mod media;
pub mod payment;

pub use error::ProviderError;
pub use media::cloudinary::{CloudinaryClient, CloudinaryConfig};
pub use media::{MediaProvider, SignedUpload, UploadRequest, UploadedMedia};
pub use payment::stripe::{StripeClient, StripeConfig};
pub use payment::{CheckoutRequest, CheckoutSession, PaymentProvider, WebhookEvent};
