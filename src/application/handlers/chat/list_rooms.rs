//! ListRoomsHandler - A member's rooms, most recent activity first.

use std::sync::Arc;

use futures::future::join_all;

use crate::application::UnreadTracker;
use crate::domain::chat::{ChatError, RoomSummary};
use crate::domain::foundation::{MemberId, Page, PageRequest};
use crate::ports::ChatReader;

#[derive(Debug, Clone)]
pub struct ListRoomsQuery {
    pub member_id: MemberId,
    pub page: PageRequest,
    /// Case-insensitive substring of the listing title or the other
    /// member's nickname. Blank means no filter.
    pub keyword: Option<String>,
}

/// Handler for the room list.
///
/// Unread counts come from the counter store and read as 0 when it is
/// unavailable.
pub struct ListRoomsHandler {
    reader: Arc<dyn ChatReader>,
    tracker: UnreadTracker,
}

impl ListRoomsHandler {
    pub fn new(reader: Arc<dyn ChatReader>, tracker: UnreadTracker) -> Self {
        Self { reader, tracker }
    }

    pub async fn handle(&self, query: ListRoomsQuery) -> Result<Page<RoomSummary>, ChatError> {
        let keyword = query
            .keyword
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty());

        let page = self
            .reader
            .list_rooms(query.member_id, keyword, query.page)
            .await?;

        let counts = join_all(
            page.content
                .iter()
                .map(|entry| self.tracker.count(query.member_id, entry.room.id())),
        )
        .await;

        let mut counts = counts.into_iter();
        Ok(page.map(|entry| {
            RoomSummary::new(&entry.room, entry.other_member, counts.next().unwrap_or(0))
        }))
    }
}
