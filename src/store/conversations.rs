use std::collections::HashMap;

use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use tracing::debug;

use super::metrics::summary;
use super::schema::{conversations, members, messages};
use super::{inserted, members as member_rows, new_id, not_found, CareStore};
use crate::db::{decode_list, encode_list, from_millis, now_ms, to_millis};
use crate::error::Result;
use crate::insights::latest_n;
use crate::models::{
    Conversation, ConversationDetail, ConversationStatus, ConversationThread, ConversationUpdate,
    Message, NewConversation, NewMessage, SenderRole,
};

#[derive(Queryable, Selectable)]
#[diesel(table_name = conversations)]
struct ConversationRow {
    id: String,
    member_id: String,
    title: Option<String>,
    description: Option<String>,
    category: String,
    status: String,
    created_at: i64,
    updated_at: i64,
}

#[derive(Insertable)]
#[diesel(table_name = conversations)]
struct NewConversationRow {
    id: String,
    member_id: String,
    title: Option<String>,
    description: Option<String>,
    category: String,
    status: String,
    created_at: i64,
    updated_at: i64,
}

#[derive(AsChangeset)]
#[diesel(table_name = conversations)]
struct ConversationChangeset {
    title: Option<Option<String>>,
    description: Option<Option<String>>,
    category: Option<String>,
    status: Option<String>,
    updated_at: i64,
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = messages)]
struct MessageRow {
    id: String,
    conversation_id: String,
    sender_id: String,
    sender_name: String,
    sender_role: String,
    content: String,
    timestamp: i64,
    message_type: String,
    is_read: bool,
    sentiment: Option<String>,
    topics: String,
    action_items: String,
    created_at: i64,
}

#[derive(Insertable)]
#[diesel(table_name = messages)]
struct NewMessageRow {
    id: String,
    conversation_id: String,
    sender_id: String,
    sender_name: String,
    sender_role: String,
    content: String,
    timestamp: i64,
    message_type: String,
    is_read: bool,
    sentiment: Option<String>,
    topics: String,
    action_items: String,
    created_at: i64,
}

impl CareStore {
    pub async fn create_conversation(&self, input: NewConversation) -> Result<Conversation> {
        input.validate()?;
        let now = now_ms();
        let row = NewConversationRow {
            id: new_id(input.id),
            member_id: input.member_id.trim().to_string(),
            title: input.title,
            description: input.description,
            category: input.category.unwrap_or_else(|| "general".to_string()),
            status: input.status.unwrap_or_default().as_str().to_string(),
            created_at: now,
            updated_at: now,
        };
        let id = row.id.clone();

        let mut conn = self.conn().await?;
        diesel::insert_into(conversations::table)
            .values(&row)
            .execute(&mut conn)
            .await?;
        debug!(conversation_id = %id, "conversation created");
        drop(conn);
        self.get_conversation_record(&id).await
    }

    /// Status may be set to any value at any time.
    pub async fn update_conversation(
        &self,
        id: &str,
        input: ConversationUpdate,
    ) -> Result<Conversation> {
        let changes = ConversationChangeset {
            title: input.title,
            description: input.description,
            category: input.category,
            status: input.status.map(|v| v.as_str().to_string()),
            updated_at: now_ms(),
        };
        let mut conn = self.conn().await?;
        let count = diesel::update(conversations::table.filter(conversations::id.eq(id)))
            .set(&changes)
            .execute(&mut conn)
            .await?;
        if count == 0 {
            return Err(not_found("Conversation"));
        }
        drop(conn);
        self.get_conversation_record(id).await
    }

    pub async fn get_conversation_record(&self, id: &str) -> Result<Conversation> {
        let mut conn = self.conn().await?;
        let row: Option<ConversationRow> = conversations::table
            .filter(conversations::id.eq(id))
            .select(ConversationRow::as_select())
            .first(&mut conn)
            .await
            .optional()?;
        row.map(map_conversation)
            .ok_or_else(|| not_found("Conversation"))
    }

    /// The conversation, its member and every message oldest first.
    pub async fn get_conversation(&self, id: &str) -> Result<ConversationDetail> {
        let mut conn = self.conn().await?;
        let found: Option<(ConversationRow, member_rows::MemberRow)> = conversations::table
            .inner_join(members::table)
            .filter(conversations::id.eq(id))
            .select((
                ConversationRow::as_select(),
                member_rows::MemberRow::as_select(),
            ))
            .first(&mut conn)
            .await
            .optional()?;
        let Some((conversation, member)) = found else {
            return Err(not_found("Conversation"));
        };
        let rows: Vec<MessageRow> = messages::table
            .filter(messages::conversation_id.eq(id))
            .select(MessageRow::as_select())
            .order((messages::timestamp.asc(), inserted("messages").asc()))
            .load(&mut conn)
            .await?;
        Ok(ConversationDetail {
            conversation: map_conversation(conversation),
            member: member_rows::map_row(member),
            messages: rows.into_iter().map(map_message).collect(),
        })
    }

    /// Most recently updated first, each with its member summary and the
    /// newest `preview` messages.
    pub async fn list_conversations(
        &self,
        limit: i64,
        preview: usize,
    ) -> Result<Vec<ConversationThread>> {
        let mut conn = self.conn().await?;
        let rows: Vec<(ConversationRow, (String, String, String, Option<String>))> =
            conversations::table
                .inner_join(members::table)
                .select((
                    ConversationRow::as_select(),
                    (
                        members::id,
                        members::name,
                        members::email,
                        members::profile_image,
                    ),
                ))
                .order((
                    conversations::updated_at.desc(),
                    inserted("conversations").asc(),
                ))
                .limit(limit.max(0))
                .load(&mut conn)
                .await?;

        let ids: Vec<String> = rows.iter().map(|(row, _)| row.id.clone()).collect();
        let message_rows: Vec<MessageRow> = messages::table
            .filter(messages::conversation_id.eq_any(ids))
            .select(MessageRow::as_select())
            .order((messages::timestamp.desc(), inserted("messages").asc()))
            .load(&mut conn)
            .await?;
        let mut grouped = group_messages(message_rows.into_iter().map(map_message).collect());

        Ok(rows
            .into_iter()
            .map(|(conversation, member)| {
                let thread = grouped.remove(&conversation.id).unwrap_or_default();
                ConversationThread {
                    conversation: map_conversation(conversation),
                    member: Some(summary(member)),
                    messages: latest_n(&thread, preview, |m| m.timestamp),
                }
            })
            .collect())
    }

    /// Appends a message and bumps the conversation's `updatedAt`.
    pub async fn add_message(&self, conversation_id: &str, input: NewMessage) -> Result<Message> {
        input.validate()?;
        // Unknown path ids are a lookup miss, not a dangling reference.
        self.get_conversation_record(conversation_id).await?;

        let now = now_ms();
        let row = NewMessageRow {
            id: new_id(input.id),
            conversation_id: conversation_id.to_string(),
            sender_id: input.sender_id,
            sender_name: input.sender_name,
            sender_role: input
                .sender_role
                .unwrap_or(SenderRole::CareCoordinator)
                .as_str()
                .to_string(),
            content: input.content,
            timestamp: input.timestamp.map(to_millis).unwrap_or(now),
            message_type: input.message_type.unwrap_or_else(|| "text".to_string()),
            is_read: input.is_read,
            sentiment: input.sentiment,
            topics: encode_list(&input.topics)?,
            action_items: encode_list(&input.action_items)?,
            created_at: now,
        };
        let id = row.id.clone();

        let mut conn = self.conn().await?;
        diesel::insert_into(messages::table)
            .values(&row)
            .execute(&mut conn)
            .await?;
        diesel::update(conversations::table.filter(conversations::id.eq(conversation_id)))
            .set(conversations::updated_at.eq(now))
            .execute(&mut conn)
            .await?;
        let created: MessageRow = messages::table
            .filter(messages::id.eq(&id))
            .select(MessageRow::as_select())
            .first(&mut conn)
            .await?;
        debug!(message_id = %id, conversation_id, "message appended");
        Ok(map_message(created))
    }

    /// A member's conversations, most recently updated first, each carrying
    /// all of its messages newest first.
    pub async fn member_conversations(&self, member_id: &str) -> Result<Vec<ConversationThread>> {
        let mut conn = self.conn().await?;
        let rows: Vec<ConversationRow> = conversations::table
            .filter(conversations::member_id.eq(member_id))
            .select(ConversationRow::as_select())
            .order((
                conversations::updated_at.desc(),
                inserted("conversations").asc(),
            ))
            .load(&mut conn)
            .await?;
        let message_rows: Vec<MessageRow> = messages::table
            .inner_join(conversations::table)
            .filter(conversations::member_id.eq(member_id))
            .select(MessageRow::as_select())
            .order((messages::timestamp.desc(), inserted("messages").asc()))
            .load(&mut conn)
            .await?;
        let grouped = group_messages(message_rows.into_iter().map(map_message).collect());
        Ok(threads(
            rows.into_iter().map(map_conversation).collect(),
            grouped,
        ))
    }

    /// Every conversation, most recently updated first.
    pub async fn all_conversations(&self) -> Result<Vec<Conversation>> {
        let mut conn = self.conn().await?;
        let rows: Vec<ConversationRow> = conversations::table
            .select(ConversationRow::as_select())
            .order((
                conversations::updated_at.desc(),
                inserted("conversations").asc(),
            ))
            .load(&mut conn)
            .await?;
        Ok(rows.into_iter().map(map_conversation).collect())
    }

    /// Every message, newest first.
    pub async fn all_messages(&self) -> Result<Vec<Message>> {
        let mut conn = self.conn().await?;
        let rows: Vec<MessageRow> = messages::table
            .select(MessageRow::as_select())
            .order((messages::timestamp.desc(), inserted("messages").asc()))
            .load(&mut conn)
            .await?;
        Ok(rows.into_iter().map(map_message).collect())
    }
}

/// Buckets messages by conversation, keeping their incoming order.
pub(crate) fn group_messages(messages: Vec<Message>) -> HashMap<String, Vec<Message>> {
    let mut grouped: HashMap<String, Vec<Message>> = HashMap::new();
    for message in messages {
        grouped
            .entry(message.conversation_id.clone())
            .or_default()
            .push(message);
    }
    grouped
}

/// Pairs conversations with their grouped messages; no member summary.
pub(crate) fn threads(
    conversations: Vec<Conversation>,
    mut grouped: HashMap<String, Vec<Message>>,
) -> Vec<ConversationThread> {
    conversations
        .into_iter()
        .map(|conversation| ConversationThread {
            messages: grouped.remove(&conversation.id).unwrap_or_default(),
            conversation,
            member: None,
        })
        .collect()
}

fn map_conversation(row: ConversationRow) -> Conversation {
    Conversation {
        id: row.id,
        member_id: row.member_id,
        title: row.title,
        description: row.description,
        category: row.category,
        status: ConversationStatus::from_db(&row.status),
        created_at: from_millis(row.created_at),
        updated_at: from_millis(row.updated_at),
    }
}

fn map_message(row: MessageRow) -> Message {
    Message {
        id: row.id,
        conversation_id: row.conversation_id,
        sender_id: row.sender_id,
        sender_name: row.sender_name,
        sender_role: SenderRole::from_db(&row.sender_role),
        content: row.content,
        timestamp: from_millis(row.timestamp),
        message_type: row.message_type,
        is_read: row.is_read,
        sentiment: row.sentiment,
        topics: decode_list(&row.topics),
        action_items: decode_list(&row.action_items),
        created_at: from_millis(row.created_at),
    }
}
