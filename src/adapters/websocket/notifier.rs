//! Recipient-scoped fan-out over the connection registry.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::chat::ChatNotification;
use crate::domain::foundation::MemberId;
use crate::ports::{ConnectionRegistry, NotificationPublisher, PublishError, PushOutcome};

/// Pushes each event into every live connection of the recipient.
///
/// Connections whose transport has gone away are pruned on the way.
pub struct RegistryNotificationPublisher {
    registry: Arc<dyn ConnectionRegistry>,
}

impl RegistryNotificationPublisher {
    pub fn new(registry: Arc<dyn ConnectionRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl NotificationPublisher for RegistryNotificationPublisher {
    async fn publish(
        &self,
        recipient: MemberId,
        event: ChatNotification,
    ) -> Result<usize, PublishError> {
        let connections = self
            .registry
            .list_connections(recipient)
            .await
            .map_err(|e| PublishError::Transport(e.to_string()))?;

        let mut delivered = 0;
        for connection in connections {
            match connection.push(event.clone()) {
                PushOutcome::Delivered => delivered += 1,
                PushOutcome::Full => {
                    tracing::warn!(
                        member_id = %recipient,
                        connection_id = %connection.id(),
                        kind = event.kind(),
                        "push buffer full, dropping notification"
                    );
                }
                PushOutcome::Closed => {
                    if let Err(e) = self.registry.unregister(recipient, connection.id()).await {
                        tracing::warn!(
                            connection_id = %connection.id(),
                            error = %e,
                            "failed to prune closed connection"
                        );
                    }
                }
            }
        }

        tracing::debug!(member_id = %recipient, kind = event.kind(), delivered, "notification published");
        Ok(delivered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::websocket::InMemoryConnectionRegistry;
    use crate::domain::chat::MessageView;
    use crate::domain::foundation::{MessageId, RoomId, Timestamp};
    use crate::ports::LiveConnection;

    fn event() -> ChatNotification {
        ChatNotification::new_message(&MessageView {
            id: MessageId::new(1),
            room_id: RoomId::new(1),
            sender_id: MemberId::new(2),
            text: "hello".to_string(),
            created_at: Timestamp::now(),
        })
    }

    fn setup() -> (Arc<InMemoryConnectionRegistry>, RegistryNotificationPublisher) {
        let registry = Arc::new(InMemoryConnectionRegistry::new());
        let publisher = RegistryNotificationPublisher::new(registry.clone());
        (registry, publisher)
    }

    #[tokio::test]
    async fn delivers_to_every_connection_of_recipient() {
        let (registry, publisher) = setup();
        let (a, mut rx_a) = LiveConnection::open(MemberId::new(1), 4);
        let (b, mut rx_b) = LiveConnection::open(MemberId::new(1), 4);
        let (other, mut rx_other) = LiveConnection::open(MemberId::new(2), 4);
        registry.register(a).await.unwrap();
        registry.register(b).await.unwrap();
        registry.register(other).await.unwrap();

        let delivered = publisher.publish(MemberId::new(1), event()).await.unwrap();

        assert_eq!(delivered, 2);
        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_ok());
        assert!(rx_other.try_recv().is_err());
    }

    #[tokio::test]
    async fn recipient_without_connections_is_noop() {
        let (_, publisher) = setup();
        assert_eq!(publisher.publish(MemberId::new(1), event()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn prunes_closed_connections() {
        let (registry, publisher) = setup();
        let (conn, rx) = LiveConnection::open(MemberId::new(1), 4);
        registry.register(conn).await.unwrap();
        drop(rx);

        let delivered = publisher.publish(MemberId::new(1), event()).await.unwrap();

        assert_eq!(delivered, 0);
        assert_eq!(registry.connection_count().await, 0);
    }

    #[tokio::test]
    async fn full_connection_is_skipped_not_pruned() {
        let (registry, publisher) = setup();
        let (slow, _rx_slow) = LiveConnection::open(MemberId::new(1), 1);
        registry.register(slow).await.unwrap();

        assert_eq!(publisher.publish(MemberId::new(1), event()).await.unwrap(), 1);
        assert_eq!(publisher.publish(MemberId::new(1), event()).await.unwrap(), 0);
        assert_eq!(registry.connection_count().await, 1);
    }
}
