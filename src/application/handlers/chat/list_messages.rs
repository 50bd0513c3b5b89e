//! ListMessagesHandler - A room's history, newest first.

use std::sync::Arc;

use crate::domain::chat::{ChatError, MessageView};
use crate::domain::foundation::{MemberId, Page, PageRequest, RoomId};
use crate::ports::ChatReader;

#[derive(Debug, Clone)]
pub struct ListMessagesQuery {
    pub room_id: RoomId,
    pub member_id: MemberId,
    pub page: PageRequest,
}

pub struct ListMessagesHandler {
    reader: Arc<dyn ChatReader>,
}

impl ListMessagesHandler {
    pub fn new(reader: Arc<dyn ChatReader>) -> Self {
        Self { reader }
    }

    pub async fn handle(&self, query: ListMessagesQuery) -> Result<Page<MessageView>, ChatError> {
        self.reader
            .find_participants(query.room_id, query.member_id)
            .await?
            .ok_or_else(|| ChatError::forbidden(query.room_id, query.member_id))?;

        Ok(self.reader.list_messages(query.room_id, query.page).await?)
    }
}
