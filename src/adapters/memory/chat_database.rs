//! In-memory implementation of the room store ports.
//!
//! Transactions run under snapshot isolation: `begin` copies the committed
//! tables, reads and writes go to the copy, and `commit` re-checks the
//! `(listing, guest)` uniqueness rule against the committed tables before
//! replaying the writes. Two transactions racing to create the same room
//! therefore both succeed at insert and the second one fails at commit with
//! `UniqueViolation`, as it would against a real database.
//!
//! Ids come from shared sequences, so a rolled-back insert leaves a gap.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::domain::chat::{
    ListingSnapshot, Membership, MemberProfile, Message, MessageView, Participants, Room,
    MAX_MESSAGE_LENGTH,
};
use crate::domain::foundation::{
    ListingId, MemberId, MembershipId, MessageId, Page, PageRequest, RoomId, Timestamp,
};
use crate::ports::{
    ChatReader, ChatStore, ChatTransaction, CreatedRoom, ListingDirectory, MemberDirectory,
    NewMessage, NewRoom, RoomListEntry, StoreError, UnreadRecount,
};

#[derive(Debug, Clone, Default)]
struct Tables {
    rooms: BTreeMap<RoomId, Room>,
    memberships: BTreeMap<MembershipId, Membership>,
    messages: BTreeMap<MessageId, Message>,
    listings: HashMap<ListingId, ListingSnapshot>,
    members: HashMap<MemberId, MemberProfile>,
}

impl Tables {
    fn room_for_guest(&self, listing_id: ListingId, guest_id: MemberId) -> Option<&Room> {
        self.rooms
            .values()
            .find(|room| room.listing_id() == listing_id && room.guest_id() == guest_id)
    }

    fn memberships_of(&self, room_id: RoomId) -> Vec<Membership> {
        self.memberships
            .values()
            .filter(|m| m.room_id() == room_id)
            .cloned()
            .collect()
    }

    fn participants(&self, room_id: RoomId, member_id: MemberId) -> Option<Participants> {
        let mut pair = self.memberships_of(room_id).into_iter();
        let (first, second) = (pair.next()?, pair.next()?);
        Participants::for_member(member_id, first, second)
    }

    fn latest_at_or_before(&self, room_id: RoomId, upto: MessageId) -> Option<MessageId> {
        self.messages
            .range(..=upto)
            .rev()
            .find(|(_, message)| message.room_id == room_id)
            .map(|(id, _)| *id)
    }

    fn recount(&self, membership_id: MembershipId) -> UnreadRecount {
        let Some(reader) = self.memberships.get(&membership_id) else {
            return UnreadRecount::default();
        };
        let read_upto = reader.last_read_message_id();
        let in_room = self
            .messages
            .values()
            .filter(|m| m.room_id == reader.room_id());

        let mut recount = UnreadRecount {
            read_upto,
            ..UnreadRecount::default()
        };
        for message in in_room {
            recount.through = recount.through.max(Some(message.id));
            if message.sender_membership_id != membership_id
                && read_upto.map_or(true, |read| message.id > read)
            {
                recount.count += 1;
            }
        }
        recount
    }

    fn profile_or_placeholder(&self, member_id: MemberId) -> MemberProfile {
        self.members
            .get(&member_id)
            .cloned()
            .unwrap_or_else(|| MemberProfile {
                id: member_id,
                nickname: String::new(),
                avatar_url: None,
            })
    }

    fn apply(&mut self, write: &Write) {
        match write {
            Write::InsertRoom(created) => {
                self.rooms.insert(created.room.id(), created.room.clone());
                for membership in [&created.host, &created.guest] {
                    self.memberships.insert(membership.id(), membership.clone());
                }
            }
            Write::InsertMessage(message) => {
                self.messages.insert(message.id, message.clone());
            }
            Write::UpdateLastMessage { room_id, text, at } => {
                if let Some(room) = self.rooms.get_mut(room_id) {
                    room.record_message(text.clone(), *at);
                }
            }
            Write::AdvanceReadPointer { membership_id, to } => {
                if let Some(membership) = self.memberships.get_mut(membership_id) {
                    membership.advance_read_pointer(*to);
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
enum Write {
    InsertRoom(CreatedRoom),
    InsertMessage(Message),
    UpdateLastMessage {
        room_id: RoomId,
        text: String,
        at: Timestamp,
    },
    AdvanceReadPointer {
        membership_id: MembershipId,
        to: MessageId,
    },
}

#[derive(Debug, Default)]
struct Shared {
    tables: Mutex<Tables>,
    room_seq: AtomicI64,
    membership_seq: AtomicI64,
    message_seq: AtomicI64,
    listing_seq: AtomicI64,
    member_seq: AtomicI64,
}

impl Shared {
    fn tables(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Database("chat tables lock poisoned".to_string()))
    }
}

fn next(seq: &AtomicI64) -> i64 {
    seq.fetch_add(1, Ordering::SeqCst) + 1
}

/// Room store, reader and marketplace directories backed by process memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryChatDatabase {
    shared: Arc<Shared>,
}

impl InMemoryChatDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a marketplace member.
    pub fn add_member(&self, nickname: &str, avatar_url: Option<&str>) -> MemberProfile {
        let profile = MemberProfile {
            id: MemberId::new(next(&self.shared.member_seq)),
            nickname: nickname.to_string(),
            avatar_url: avatar_url.map(str::to_string),
        };
        if let Ok(mut tables) = self.shared.tables() {
            tables.members.insert(profile.id, profile.clone());
        }
        profile
    }

    /// Change a member's display name, as a profile edit would.
    pub fn rename_member(&self, member_id: MemberId, nickname: &str) {
        if let Ok(mut tables) = self.shared.tables() {
            if let Some(profile) = tables.members.get_mut(&member_id) {
                profile.nickname = nickname.to_string();
            }
        }
    }

    /// Register a listing owned by `owner_id`.
    pub fn add_listing(&self, owner_id: MemberId, title: &str) -> ListingSnapshot {
        let listing = ListingSnapshot {
            id: ListingId::new(next(&self.shared.listing_seq)),
            owner_id,
            title: title.to_string(),
        };
        if let Ok(mut tables) = self.shared.tables() {
            tables.listings.insert(listing.id, listing.clone());
        }
        listing
    }

    /// Change a listing's title after rooms may have snapshotted it.
    pub fn retitle_listing(&self, listing_id: ListingId, title: &str) {
        if let Ok(mut tables) = self.shared.tables() {
            if let Some(listing) = tables.listings.get_mut(&listing_id) {
                listing.title = title.to_string();
            }
        }
    }

    pub fn room_count(&self) -> usize {
        self.shared.tables().map(|t| t.rooms.len()).unwrap_or(0)
    }

    pub fn message_count(&self) -> usize {
        self.shared.tables().map(|t| t.messages.len()).unwrap_or(0)
    }

    /// Committed memberships of a room.
    pub fn memberships(&self, room_id: RoomId) -> Vec<Membership> {
        self.shared
            .tables()
            .map(|t| t.memberships_of(room_id))
            .unwrap_or_default()
    }
}

/// An open snapshot transaction.
pub struct InMemoryTransaction {
    shared: Arc<Shared>,
    snapshot: Tables,
    writes: Vec<Write>,
}

impl InMemoryTransaction {
    fn record(&mut self, write: Write) {
        self.snapshot.apply(&write);
        self.writes.push(write);
    }
}

#[async_trait]
impl ChatStore for InMemoryChatDatabase {
    async fn begin(&self) -> Result<Box<dyn ChatTransaction>, StoreError> {
        let snapshot = self.shared.tables()?.clone();
        Ok(Box::new(InMemoryTransaction {
            shared: self.shared.clone(),
            snapshot,
            writes: Vec::new(),
        }))
    }
}

#[async_trait]
impl ChatTransaction for InMemoryTransaction {
    async fn find_room_for_guest(
        &mut self,
        listing_id: ListingId,
        guest_id: MemberId,
    ) -> Result<Option<Room>, StoreError> {
        Ok(self.snapshot.room_for_guest(listing_id, guest_id).cloned())
    }

    async fn insert_room(&mut self, new_room: NewRoom) -> Result<CreatedRoom, StoreError> {
        if self
            .snapshot
            .room_for_guest(new_room.listing_id, new_room.guest_id)
            .is_some()
        {
            return Err(StoreError::UniqueViolation(
                "uq_chat_rooms_listing_guest".to_string(),
            ));
        }

        let room_id = RoomId::new(next(&self.shared.room_seq));
        let room = Room::reconstitute(
            room_id,
            new_room.listing_id,
            new_room.guest_id,
            new_room.title_snapshot,
            Timestamp::now(),
            None,
        );
        let host = Membership::reconstitute(
            MembershipId::new(next(&self.shared.membership_seq)),
            room_id,
            new_room.host_id,
            None,
        );
        let guest = Membership::reconstitute(
            MembershipId::new(next(&self.shared.membership_seq)),
            room_id,
            new_room.guest_id,
            None,
        );

        let created = CreatedRoom { room, host, guest };
        self.record(Write::InsertRoom(created.clone()));
        Ok(created)
    }

    async fn find_participants(
        &mut self,
        room_id: RoomId,
        member_id: MemberId,
    ) -> Result<Option<Participants>, StoreError> {
        Ok(self.snapshot.participants(room_id, member_id))
    }

    async fn insert_message(&mut self, new_message: NewMessage) -> Result<Message, StoreError> {
        let length = new_message.text.chars().count();
        if length == 0 || length > MAX_MESSAGE_LENGTH {
            return Err(StoreError::ConstraintViolation(
                "ck_chat_messages_content_length".to_string(),
            ));
        }
        let sender_in_room = self
            .snapshot
            .memberships
            .get(&new_message.sender_membership_id)
            .is_some_and(|m| m.room_id() == new_message.room_id);
        if !sender_in_room {
            return Err(StoreError::ConstraintViolation(
                "fk_chat_messages_sender_membership".to_string(),
            ));
        }

        let message = Message {
            id: MessageId::new(next(&self.shared.message_seq)),
            room_id: new_message.room_id,
            sender_membership_id: new_message.sender_membership_id,
            text: new_message.text,
            created_at: Timestamp::now(),
        };
        self.record(Write::InsertMessage(message.clone()));
        Ok(message)
    }

    async fn update_last_message(
        &mut self,
        room_id: RoomId,
        text: &str,
        at: Timestamp,
    ) -> Result<(), StoreError> {
        self.record(Write::UpdateLastMessage {
            room_id,
            text: text.to_string(),
            at,
        });
        Ok(())
    }

    async fn latest_message_at_or_before(
        &mut self,
        room_id: RoomId,
        upto: MessageId,
    ) -> Result<Option<MessageId>, StoreError> {
        Ok(self.snapshot.latest_at_or_before(room_id, upto))
    }

    async fn advance_read_pointer(
        &mut self,
        membership_id: MembershipId,
        to: MessageId,
    ) -> Result<bool, StoreError> {
        let moves = self
            .snapshot
            .memberships
            .get(&membership_id)
            .is_some_and(|m| m.is_behind(to));
        if moves {
            self.record(Write::AdvanceReadPointer { membership_id, to });
        }
        Ok(moves)
    }

    async fn count_unread(
        &mut self,
        membership_id: MembershipId,
    ) -> Result<UnreadRecount, StoreError> {
        Ok(self.snapshot.recount(membership_id))
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let mut committed = self.shared.tables()?;

        for write in &self.writes {
            if let Write::InsertRoom(created) = write {
                let room = &created.room;
                if committed
                    .room_for_guest(room.listing_id(), room.guest_id())
                    .is_some()
                {
                    return Err(StoreError::UniqueViolation(
                        "uq_chat_rooms_listing_guest".to_string(),
                    ));
                }
            }
        }

        for write in &self.writes {
            committed.apply(write);
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
impl ChatReader for InMemoryChatDatabase {
    async fn find_room(&self, room_id: RoomId) -> Result<Option<Room>, StoreError> {
        Ok(self.shared.tables()?.rooms.get(&room_id).cloned())
    }

    async fn find_room_for_guest(
        &self,
        listing_id: ListingId,
        guest_id: MemberId,
    ) -> Result<Option<Room>, StoreError> {
        Ok(self
            .shared
            .tables()?
            .room_for_guest(listing_id, guest_id)
            .cloned())
    }

    async fn find_participants(
        &self,
        room_id: RoomId,
        member_id: MemberId,
    ) -> Result<Option<Participants>, StoreError> {
        Ok(self.shared.tables()?.participants(room_id, member_id))
    }

    async fn list_rooms(
        &self,
        member_id: MemberId,
        keyword: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<RoomListEntry>, StoreError> {
        let tables = self.shared.tables()?;
        let needle = keyword.map(str::to_lowercase);

        let mut entries: Vec<RoomListEntry> = tables
            .memberships
            .values()
            .filter(|m| m.member_id() == member_id)
            .filter_map(|mine| {
                let room = tables.rooms.get(&mine.room_id())?;
                let participants = tables.participants(room.id(), member_id)?;
                let other_member = tables.profile_or_placeholder(participants.other.member_id());
                Some(RoomListEntry {
                    room: room.clone(),
                    other_member,
                })
            })
            .filter(|entry| match &needle {
                Some(needle) => {
                    entry.room.title_snapshot().to_lowercase().contains(needle)
                        || entry.other_member.nickname.to_lowercase().contains(needle)
                }
                None => true,
            })
            .collect();

        entries.sort_by(|a, b| {
            b.room
                .activity_at()
                .cmp(&a.room.activity_at())
                .then_with(|| b.room.id().cmp(&a.room.id()))
        });

        let total = entries.len() as u64;
        let content = entries
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.size() as usize)
            .collect();
        Ok(Page::new(content, page, total))
    }

    async fn list_messages(
        &self,
        room_id: RoomId,
        page: PageRequest,
    ) -> Result<Page<MessageView>, StoreError> {
        let tables = self.shared.tables()?;

        let in_room: Vec<&Message> = tables
            .messages
            .values()
            .rev()
            .filter(|m| m.room_id == room_id)
            .collect();
        let total = in_room.len() as u64;

        let content = in_room
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.size() as usize)
            .filter_map(|message| {
                let sender = tables.memberships.get(&message.sender_membership_id)?;
                Some(MessageView::from_message(message, sender.member_id()))
            })
            .collect();
        Ok(Page::new(content, page, total))
    }

    async fn count_unread(&self, membership_id: MembershipId) -> Result<UnreadRecount, StoreError> {
        Ok(self.shared.tables()?.recount(membership_id))
    }
}

#[async_trait]
impl ListingDirectory for InMemoryChatDatabase {
    async fn find_listing(&self, listing_id: ListingId) -> Result<Option<ListingSnapshot>, StoreError> {
        Ok(self.shared.tables()?.listings.get(&listing_id).cloned())
    }
}

#[async_trait]
impl MemberDirectory for InMemoryChatDatabase {
    async fn find_profile(&self, member_id: MemberId) -> Result<Option<MemberProfile>, StoreError> {
        Ok(self.shared.tables()?.members.get(&member_id).cloned())
    }
}
