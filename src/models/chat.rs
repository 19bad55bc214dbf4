use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct Conversation {
    pub id: Uuid,
    pub subject: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub body: String,
    pub is_broadcast: bool,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ConversationResponse {
    pub id: Uuid,
    pub subject: Option<String>,
    pub created_by: Uuid,
    pub member_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl ConversationResponse {
    pub fn from_conversation(c: Conversation, member_ids: Vec<Uuid>) -> Self {
        Self {
            id: c.id,
            subject: c.subject,
            created_by: c.created_by,
            member_ids,
            created_at: c.created_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateConversationRequest {
    pub subject: Option<String>,
    pub member_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SendMessageRequest {
    pub body: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BroadcastRequest {
    pub body: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BroadcastResponse {
    pub conversations_reached: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TypingRequest {
    pub typing: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct MessageQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}
