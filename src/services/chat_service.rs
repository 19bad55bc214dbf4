use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::realtime::{ChatEvent, ChatHub};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct ChatService {
    pool: PgPool,
    hub: ChatHub,
}

impl ChatService {
    pub fn new(pool: PgPool, hub: ChatHub) -> Self {
        Self { pool, hub }
    }

    pub fn hub(&self) -> &ChatHub {
        &self.hub
    }

    pub async fn create_conversation(
        &self,
        creator_id: Uuid,
        request: CreateConversationRequest,
    ) -> AppResult<ConversationResponse> {
        if request.member_ids.is_empty() {
            return Err(AppError::ValidationError(
                "A conversation needs at least one other member".to_string(),
            ));
        }

        let mut member_ids = request.member_ids.clone();
        member_ids.push(creator_id);
        member_ids.sort();
        member_ids.dedup();

        let mut tx = self.pool.begin().await?;

        let conversation = sqlx::query_as::<_, Conversation>(
            "INSERT INTO conversations (subject, created_by) VALUES ($1, $2) RETURNING *",
        )
        .bind(&request.subject)
        .bind(creator_id)
        .fetch_one(&mut *tx)
        .await?;

        for member_id in &member_ids {
            sqlx::query(
                "INSERT INTO conversation_members (conversation_id, account_id) VALUES ($1, $2)",
            )
            .bind(conversation.id)
            .bind(member_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(ConversationResponse::from_conversation(
            conversation,
            member_ids,
        ))
    }

    pub async fn list_conversations(
        &self,
        account_id: Uuid,
    ) -> AppResult<Vec<ConversationResponse>> {
        let conversations = sqlx::query_as::<_, Conversation>(
            r#"
            SELECT c.* FROM conversations c
            JOIN conversation_members m ON m.conversation_id = c.id
            WHERE m.account_id = $1
            ORDER BY c.created_at DESC
            "#,
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;

        let conversation_ids: Vec<Uuid> = conversations.iter().map(|c| c.id).collect();
        let memberships: Vec<(Uuid, Uuid)> = sqlx::query_as(
            "SELECT conversation_id, account_id FROM conversation_members WHERE conversation_id = ANY($1)",
        )
        .bind(&conversation_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(conversations
            .into_iter()
            .map(|conversation| {
                let members = memberships
                    .iter()
                    .filter(|(conversation_id, _)| *conversation_id == conversation.id)
                    .map(|(_, account_id)| *account_id)
                    .collect();
                ConversationResponse::from_conversation(conversation, members)
            })
            .collect())
    }

    pub async fn send_message(
        &self,
        sender_id: Uuid,
        conversation_id: Uuid,
        request: SendMessageRequest,
    ) -> AppResult<Message> {
        if request.body.trim().is_empty() {
            return Err(AppError::ValidationError(
                "Message body must not be empty".to_string(),
            ));
        }
        self.require_membership(conversation_id, sender_id).await?;

        let message = sqlx::query_as::<_, Message>(
            r#"
            INSERT INTO messages (conversation_id, sender_id, body)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(conversation_id)
        .bind(sender_id)
        .bind(&request.body)
        .fetch_one(&self.pool)
        .await?;

        self.hub
            .publish(
                conversation_id,
                ChatEvent::Message {
                    message: message.clone(),
                },
            )
            .await;

        Ok(message)
    }

    pub async fn list_messages(
        &self,
        account_id: Uuid,
        conversation_id: Uuid,
        query: &MessageQuery,
    ) -> AppResult<PaginatedResponse<Message>> {
        self.require_membership(conversation_id, account_id).await?;

        let params = PaginationParams::new(query.page, query.per_page);

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM messages WHERE conversation_id = $1")
                .bind(conversation_id)
                .fetch_one(&self.pool)
                .await?;

        let messages = sqlx::query_as::<_, Message>(
            r#"
            SELECT * FROM messages
            WHERE conversation_id = $1
            ORDER BY sent_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(conversation_id)
        .bind(params.get_limit() as i64)
        .bind(params.get_offset() as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(PaginatedResponse::new(messages, &params, total))
    }

    /// Admin announcement: fans the message into a conversation per parent,
    /// creating the admin↔parent conversation on first use.
    pub async fn broadcast(
        &self,
        admin_id: Uuid,
        request: BroadcastRequest,
    ) -> AppResult<BroadcastResponse> {
        if request.body.trim().is_empty() {
            return Err(AppError::ValidationError(
                "Broadcast body must not be empty".to_string(),
            ));
        }

        let parents: Vec<(Uuid,)> =
            sqlx::query_as("SELECT id FROM accounts WHERE role = 'PARENT'")
                .fetch_all(&self.pool)
                .await?;

        let mut reached = 0i64;
        let mut delivered: Vec<(Uuid, Message)> = Vec::new();

        let mut tx = self.pool.begin().await?;

        for (parent_id,) in parents {
            let conversation_id = match self
                .direct_conversation_id(&mut tx, admin_id, parent_id)
                .await?
            {
                Some(id) => id,
                None => {
                    let conversation = sqlx::query_as::<_, Conversation>(
                        "INSERT INTO conversations (subject, created_by) VALUES ('Announcements', $1) RETURNING *",
                    )
                    .bind(admin_id)
                    .fetch_one(&mut *tx)
                    .await?;
                    for member in [admin_id, parent_id] {
                        sqlx::query(
                            "INSERT INTO conversation_members (conversation_id, account_id) VALUES ($1, $2)",
                        )
                        .bind(conversation.id)
                        .bind(member)
                        .execute(&mut *tx)
                        .await?;
                    }
                    conversation.id
                }
            };

            let message = sqlx::query_as::<_, Message>(
                r#"
                INSERT INTO messages (conversation_id, sender_id, body, is_broadcast)
                VALUES ($1, $2, $3, TRUE)
                RETURNING *
                "#,
            )
            .bind(conversation_id)
            .bind(admin_id)
            .bind(&request.body)
            .fetch_one(&mut *tx)
            .await?;

            delivered.push((conversation_id, message));
            reached += 1;
        }

        tx.commit().await?;

        // Live delivery happens after commit so subscribers never see a
        // message that later rolled back.
        for (conversation_id, message) in delivered {
            self.hub
                .publish(conversation_id, ChatEvent::Message { message })
                .await;
        }

        log::info!("Broadcast from {admin_id} reached {reached} conversations");
        Ok(BroadcastResponse {
            conversations_reached: reached,
        })
    }

    pub async fn set_typing(
        &self,
        account_id: Uuid,
        conversation_id: Uuid,
        typing: bool,
    ) -> AppResult<()> {
        self.require_membership(conversation_id, account_id).await?;
        self.hub.set_typing(conversation_id, account_id, typing).await;
        Ok(())
    }

    pub async fn require_membership(
        &self,
        conversation_id: Uuid,
        account_id: Uuid,
    ) -> AppResult<()> {
        let member: Option<i32> = sqlx::query_scalar(
            "SELECT 1 FROM conversation_members WHERE conversation_id = $1 AND account_id = $2",
        )
        .bind(conversation_id)
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?;

        if member.is_none() {
            return Err(AppError::Forbidden);
        }
        Ok(())
    }

    async fn direct_conversation_id(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        a: Uuid,
        b: Uuid,
    ) -> AppResult<Option<Uuid>> {
        let id: Option<Uuid> = sqlx::query_scalar(
            r#"
            SELECT c.id FROM conversations c
            JOIN conversation_members m1 ON m1.conversation_id = c.id AND m1.account_id = $1
            JOIN conversation_members m2 ON m2.conversation_id = c.id AND m2.account_id = $2
            ORDER BY c.created_at
            LIMIT 1
            "#,
        )
        .bind(a)
        .bind(b)
        .fetch_optional(&mut **tx)
        .await?;
        Ok(id)
    }
}
