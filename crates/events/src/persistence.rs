//! Durable event persistence service.
//!
//! [`EventPersistence`] subscribes to the [`EventBus`](crate::bus::EventBus)
//! and writes every [`PlatformEvent`] to `event_log`. It runs as a
//! long-lived background task and stops when the bus is dropped.

use gather_core::types::DbId;
use gather_db::repositories::EventRepo;
use gather_db::DbPool;
use tokio::sync::broadcast;

use crate::bus::PlatformEvent;

/// Background service that persists platform events to the database.
pub struct EventPersistence;

impl EventPersistence {
    /// Run the persistence loop until the channel closes.
    pub async fn run(pool: DbPool, mut receiver: broadcast::Receiver<PlatformEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    if let Err(e) = Self::persist(&pool, &event).await {
                        tracing::error!(
                            error = %e,
                            event_type = %event.event_type,
                            "Failed to persist event"
                        );
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(
                        skipped = n,
                        "Event persistence lagged, some events were not persisted"
                    );
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, persistence shutting down");
                    break;
                }
            }
        }
    }

    /// Write a single event to `event_log`.
    pub async fn persist(pool: &DbPool, event: &PlatformEvent) -> Result<DbId, sqlx::Error> {
        EventRepo::insert(
            pool,
            &event.event_type,
            event.source_entity_type.as_deref(),
            event.source_entity_id,
            event.actor_user_id,
            &event.payload,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::EventBus;
    use gather_core::platform_events::{ENTITY_MEMORIAL, MEMORIAL_PUBLISHED};

    #[sqlx::test(migrations = "../../db/migrations")]
    async fn persists_events_until_bus_closes(pool: sqlx::PgPool) {
        let bus = EventBus::default();
        let handle = tokio::spawn(EventPersistence::run(pool.clone(), bus.subscribe()));

        bus.publish(
            PlatformEvent::new(MEMORIAL_PUBLISHED)
                .with_source(ENTITY_MEMORIAL, 11)
                .with_actor(3),
        );
        drop(bus);
        handle.await.unwrap();

        let rows = EventRepo::list_for_entity(&pool, ENTITY_MEMORIAL, 11, 10)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].event_type, MEMORIAL_PUBLISHED);
        assert_eq!(rows[0].actor_user_id, Some(3));
    }
}
