use std::sync::Arc;

use gather_cloud::{MediaProvider, PaymentProvider};

use crate::config::ServerConfig;
use crate::error::{AppError, AppResult};

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: gather_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Centralized event bus for publishing platform events.
    pub event_bus: Arc<gather_events::EventBus>,
    /// Checkout provider. `None` when payment credentials are not configured.
    pub payments: Option<Arc<dyn PaymentProvider>>,
    /// Media CDN. `None` when CDN credentials are not configured.
    pub media: Option<Arc<dyn MediaProvider>>,
}

impl AppState {
    pub fn payment_provider(&self) -> AppResult<&dyn PaymentProvider> {
        self.payments
            .as_deref()
            .ok_or_else(|| AppError::ServiceUnavailable("Payments are not configured".into()))
    }

    pub fn media_provider(&self) -> AppResult<&dyn MediaProvider> {
        self.media
            .as_deref()
            .ok_or_else(|| AppError::ServiceUnavailable("Media uploads are not configured".into()))
    }
}
