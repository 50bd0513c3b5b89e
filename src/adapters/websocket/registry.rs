//! Process-local connection registry.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::foundation::MemberId;
use crate::ports::{
    ConnectionId, ConnectionRegistry, ConnectionRegistryError, LiveConnection, Registration,
};

/// Live connections of this process, grouped by member.
#[derive(Default)]
pub struct InMemoryConnectionRegistry {
    members: RwLock<HashMap<MemberId, HashMap<ConnectionId, LiveConnection>>>,
}

impl InMemoryConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total connections across all members.
    pub async fn connection_count(&self) -> usize {
        self.members.read().await.values().map(HashMap::len).sum()
    }
}

#[async_trait]
impl ConnectionRegistry for InMemoryConnectionRegistry {
    async fn register(
        &self,
        connection: LiveConnection,
    ) -> Result<Registration, ConnectionRegistryError> {
        let registration = Registration {
            member_id: connection.member_id(),
            connection_id: connection.id(),
        };
        self.members
            .write()
            .await
            .entry(registration.member_id)
            .or_default()
            .entry(registration.connection_id)
            .or_insert(connection);
        Ok(registration)
    }

    async fn unregister(
        &self,
        member_id: MemberId,
        connection_id: ConnectionId,
    ) -> Result<bool, ConnectionRegistryError> {
        let mut members = self.members.write().await;
        let Some(connections) = members.get_mut(&member_id) else {
            return Ok(false);
        };
        let removed = connections.remove(&connection_id).is_some();
        if connections.is_empty() {
            members.remove(&member_id);
        }
        Ok(removed)
    }

    async fn list_connections(
        &self,
        member_id: MemberId,
    ) -> Result<Vec<LiveConnection>, ConnectionRegistryError> {
        Ok(self
            .members
            .read()
            .await
            .get(&member_id)
            .map(|connections| connections.values().cloned().collect())
            .unwrap_or_default())
    }
}
