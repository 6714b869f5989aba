//! Event-to-email routing.
//!
//! [`NotificationRouter`] renders each platform event that concerns a user
//! into a [`Notification`] and emails it. Without SMTP settings the
//! notification is only logged.

use gather_db::repositories::UserRepo;
use gather_db::DbPool;
use gather_events::{EmailDelivery, Notification, PlatformEvent};
use tokio::sync::broadcast;

/// Routes platform events to user notifications.
pub struct NotificationRouter {
    pool: DbPool,
    email: Option<EmailDelivery>,
}

impl NotificationRouter {
    pub fn new(pool: DbPool, email: Option<EmailDelivery>) -> Self {
        Self { pool, email }
    }

    /// Run the routing loop until the event bus is dropped.
    pub async fn run(self, mut receiver: broadcast::Receiver<PlatformEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    if let Err(e) = self.route_event(&event).await {
                        tracing::error!(
                            error = %e,
                            event_type = %event.event_type,
                            "Failed to route event"
                        );
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Notification router lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, notification router shutting down");
                    break;
                }
            }
        }
    }

    /// Deliver the notification for a single event, if it has one.
    async fn route_event(
        &self,
        event: &PlatformEvent,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let Some(notification) = Notification::for_event(event) else {
            return Ok(());
        };

        // Actors are not notified about their own actions.
        if event.actor_user_id == Some(notification.recipient_user_id) {
            return Ok(());
        }

        let Some(user) = UserRepo::find_by_id(&self.pool, notification.recipient_user_id).await?
        else {
            tracing::warn!(
                user_id = notification.recipient_user_id,
                "Notification recipient no longer exists"
            );
            return Ok(());
        };
        if !user.is_active {
            return Ok(());
        }

        match &self.email {
            Some(email) => email.deliver(&user.email, &notification).await?,
            None => {
                tracing::info!(
                    user_id = user.id,
                    subject = %notification.subject,
                    "Email not configured, notification logged only"
                );
            }
        }
        Ok(())
    }
}
