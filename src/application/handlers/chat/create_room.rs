//! CreateRoomHandler - Create-or-get the room between a guest and a listing's host.

use std::sync::Arc;

use crate::application::{AfterCommitRunner, EffectError, TransactionScope};
use crate::domain::chat::{ChatError, ChatNotification, Room};
use crate::domain::foundation::{ListingId, MemberId};
use crate::ports::{
    ChatReader, ChatStore, ListingDirectory, MemberDirectory, NewRoom, NotificationPublisher,
    StoreError,
};

/// Command to open a conversation about a listing.
#[derive(Debug, Clone)]
pub struct CreateRoomCommand {
    pub listing_id: ListingId,
    /// The guest asking about the listing.
    pub requester_id: MemberId,
}

#[derive(Debug, Clone)]
pub struct CreateRoomResult {
    pub room: Room,
    /// `false` when the room already existed.
    pub created: bool,
}

/// Handler for creating rooms.
///
/// At most one room exists per (listing, guest). A uniqueness conflict from a
/// concurrent first request is resolved by returning the winner's room.
pub struct CreateRoomHandler {
    store: Arc<dyn ChatStore>,
    reader: Arc<dyn ChatReader>,
    listings: Arc<dyn ListingDirectory>,
    members: Arc<dyn MemberDirectory>,
    notifications: Arc<dyn NotificationPublisher>,
    runner: AfterCommitRunner,
}

impl CreateRoomHandler {
    pub fn new(
        store: Arc<dyn ChatStore>,
        reader: Arc<dyn ChatReader>,
        listings: Arc<dyn ListingDirectory>,
        members: Arc<dyn MemberDirectory>,
        notifications: Arc<dyn NotificationPublisher>,
        runner: AfterCommitRunner,
    ) -> Self {
        Self {
            store,
            reader,
            listings,
            members,
            notifications,
            runner,
        }
    }

    pub async fn handle(&self, cmd: CreateRoomCommand) -> Result<CreateRoomResult, ChatError> {
        // 1. Resolve the listing and refuse self-chat
        let listing = self
            .listings
            .find_listing(cmd.listing_id)
            .await?
            .ok_or(ChatError::ListingNotFound(cmd.listing_id))?;
        if listing.owner_id == cmd.requester_id {
            return Err(ChatError::SelfChat(cmd.listing_id));
        }

        // 2. Existing room wins
        let mut scope = TransactionScope::begin(self.store.as_ref(), &self.runner).await?;
        if let Some(room) = scope
            .tx()
            .find_room_for_guest(cmd.listing_id, cmd.requester_id)
            .await?
        {
            scope.rollback().await?;
            return Ok(CreateRoomResult {
                room,
                created: false,
            });
        }

        // 3. Create room and both memberships
        let guest = self
            .members
            .find_profile(cmd.requester_id)
            .await?
            .ok_or(ChatError::MemberNotFound(cmd.requester_id))?;

        let inserted = scope
            .tx()
            .insert_room(NewRoom {
                listing_id: listing.id,
                host_id: listing.owner_id,
                guest_id: cmd.requester_id,
                title_snapshot: listing.title,
            })
            .await;
        let created = match inserted {
            Ok(created) => created,
            Err(StoreError::UniqueViolation(_)) => {
                scope.rollback().await?;
                return self.existing_room(&cmd).await;
            }
            Err(e) => return Err(e.into()),
        };

        // 4. Tell the host, once the room is durable
        let notifications = self.notifications.clone();
        let host_id = listing.owner_id;
        let event = ChatNotification::new_room(&created.room, guest);
        scope.run_after_commit("notify.new_room", async move {
            notifications
                .publish(host_id, event)
                .await
                .map(drop)
                .map_err(EffectError::from)
        });

        match scope.commit().await {
            Ok(()) => {
                tracing::info!(
                    room_id = %created.room.id(),
                    listing_id = %cmd.listing_id,
                    guest_id = %cmd.requester_id,
                    "chat room created"
                );
                Ok(CreateRoomResult {
                    room: created.room,
                    created: true,
                })
            }
            Err(StoreError::UniqueViolation(_)) => self.existing_room(&cmd).await,
            Err(e) => Err(e.into()),
        }
    }

    /// Re-read the room a concurrent request just committed.
    async fn existing_room(&self, cmd: &CreateRoomCommand) -> Result<CreateRoomResult, ChatError> {
        tracing::debug!(
            listing_id = %cmd.listing_id,
            guest_id = %cmd.requester_id,
            "room created concurrently, returning existing room"
        );
        let room = self
            .reader
            .find_room_for_guest(cmd.listing_id, cmd.requester_id)
            .await?
            .ok_or_else(|| ChatError::storage("room missing after uniqueness conflict"))?;
        Ok(CreateRoomResult {
            room,
            created: false,
        })
    }
}
