use crate::handlers::{current_user, require_role};
use crate::models::*;
use crate::realtime::ChatHub;
use crate::services::ChatService;
use actix_web::{web, HttpRequest, HttpResponse, ResponseError, Result};
use futures_util::stream;
use serde_json::json;
use tokio::sync::broadcast;
use uuid::Uuid;

#[utoipa::path(
    post,
    path = "/chat/conversations",
    tag = "chat",
    request_body = CreateConversationRequest,
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Conversation created", body = ConversationResponse))
)]
pub async fn create_conversation(
    chat_service: web::Data<ChatService>,
    req: HttpRequest,
    request: web::Json<CreateConversationRequest>,
) -> Result<HttpResponse> {
    let user = match current_user(&req) {
        Ok(user) => user,
        Err(e) => return Ok(e.error_response()),
    };

    match chat_service
        .create_conversation(user.id, request.into_inner())
        .await
    {
        Ok(conversation) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": conversation
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/chat/conversations",
    tag = "chat",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Conversations for the caller"))
)]
pub async fn list_conversations(
    chat_service: web::Data<ChatService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let user = match current_user(&req) {
        Ok(user) => user,
        Err(e) => return Ok(e.error_response()),
    };

    match chat_service.list_conversations(user.id).await {
        Ok(conversations) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": conversations
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/chat/conversations/{id}/messages",
    tag = "chat",
    params(
        ("id" = Uuid, Path, description = "Conversation id"),
        ("page" = Option<u32>, Query, description = "Page number"),
        ("per_page" = Option<u32>, Query, description = "Page size")
    ),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Message page"),
        (status = 403, description = "Not a member")
    )
)]
pub async fn list_messages(
    chat_service: web::Data<ChatService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    query: web::Query<MessageQuery>,
) -> Result<HttpResponse> {
    let user = match current_user(&req) {
        Ok(user) => user,
        Err(e) => return Ok(e.error_response()),
    };

    match chat_service
        .list_messages(user.id, path.into_inner(), &query.into_inner())
        .await
    {
        Ok(messages) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": messages
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/chat/conversations/{id}/messages",
    tag = "chat",
    params(("id" = Uuid, Path, description = "Conversation id")),
    request_body = SendMessageRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Message sent", body = Message),
        (status = 403, description = "Not a member")
    )
)]
pub async fn send_message(
    chat_service: web::Data<ChatService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    request: web::Json<SendMessageRequest>,
) -> Result<HttpResponse> {
    let user = match current_user(&req) {
        Ok(user) => user,
        Err(e) => return Ok(e.error_response()),
    };

    match chat_service
        .send_message(user.id, path.into_inner(), request.into_inner())
        .await
    {
        Ok(message) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": message
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/chat/conversations/{id}/typing",
    tag = "chat",
    params(("id" = Uuid, Path, description = "Conversation id")),
    request_body = TypingRequest,
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Typing state updated"))
)]
pub async fn set_typing(
    chat_service: web::Data<ChatService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    request: web::Json<TypingRequest>,
) -> Result<HttpResponse> {
    let user = match current_user(&req) {
        Ok(user) => user,
        Err(e) => return Ok(e.error_response()),
    };

    match chat_service
        .set_typing(user.id, path.into_inner(), request.typing)
        .await
    {
        Ok(()) => Ok(HttpResponse::Ok().json(json!({ "success": true }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/chat/broadcast",
    tag = "chat",
    request_body = BroadcastRequest,
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Broadcast delivered", body = BroadcastResponse))
)]
pub async fn broadcast(
    chat_service: web::Data<ChatService>,
    req: HttpRequest,
    request: web::Json<BroadcastRequest>,
) -> Result<HttpResponse> {
    let admin = match require_role(&req, AccountRole::Admin) {
        Ok(user) => user,
        Err(e) => return Ok(e.error_response()),
    };

    match chat_service.broadcast(admin.id, request.into_inner()).await {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

/// Marks the subscriber present for the lifetime of its event stream.
struct PresenceGuard {
    hub: ChatHub,
    account_id: Uuid,
}

impl Drop for PresenceGuard {
    fn drop(&mut self) {
        let hub = self.hub.clone();
        let account_id = self.account_id;
        tokio::spawn(async move {
            hub.disconnect(account_id).await;
        });
    }
}

#[utoipa::path(
    get,
    path = "/chat/conversations/{id}/stream",
    tag = "chat",
    params(("id" = Uuid, Path, description = "Conversation id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Server-sent event stream of chat events"),
        (status = 403, description = "Not a member")
    )
)]
pub async fn stream_events(
    chat_service: web::Data<ChatService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let user = match current_user(&req) {
        Ok(user) => user,
        Err(e) => return Ok(e.error_response()),
    };

    let conversation_id = path.into_inner();
    if let Err(e) = chat_service
        .require_membership(conversation_id, user.id)
        .await
    {
        return Ok(e.error_response());
    }

    let hub = chat_service.hub().clone();
    hub.connect(user.id).await;
    let guard = PresenceGuard {
        hub: hub.clone(),
        account_id: user.id,
    };
    let rx = hub.subscribe(conversation_id).await;

    let event_stream = stream::unfold((rx, guard), |(mut rx, guard)| async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    let payload = match serde_json::to_string(&event) {
                        Ok(payload) => payload,
                        Err(_) => continue,
                    };
                    let chunk = web::Bytes::from(format!("data: {payload}\n\n"));
                    return Some((Ok::<_, std::convert::Infallible>(chunk), (rx, guard)));
                }
                // Slow consumer skipped some events; keep the stream alive.
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    });

    Ok(HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header(("Cache-Control", "no-cache"))
        .streaming(event_stream))
}

pub fn chat_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/chat")
            .route("/conversations", web::post().to(create_conversation))
            .route("/conversations", web::get().to(list_conversations))
            .route("/conversations/{id}/messages", web::get().to(list_messages))
            .route("/conversations/{id}/messages", web::post().to(send_message))
            .route("/conversations/{id}/typing", web::post().to(set_typing))
            .route("/conversations/{id}/stream", web::get().to(stream_events))
            .route("/broadcast", web::post().to(broadcast)),
    );
}
