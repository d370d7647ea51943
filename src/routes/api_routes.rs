use axum::extract::{Multipart, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::errors::AppError;
use crate::models::{ChatRequest, ChatResponse, DocumentResponse};
use crate::service::chat_service::ChatService;

/// The session layer in front of this service resolves the user and forwards
/// their id in this header. Absent header means unauthenticated.
const USER_HEADER: &str = "x-user-id";

/// Fallback owner for requests without a session, so the no-auth deployment
/// still gets working conversation persistence.
const ANONYMOUS_USER: &str = "anonymous";

/// Request body cap for the router. Must stay above the base64-encoded form
/// of a maximum-size attachment plus JSON framing, so the attachment size
/// rule is the one that rejects oversized uploads.
pub const MAX_BODY_BYTES: usize = 8 * 1024 * 1024;

fn user_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// POST `/api/chat`: one chat turn, JSON in/out.
pub async fn chat_handler(
    State(svc): State<ChatService>,
    headers: HeaderMap,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let owner = user_id(&headers).unwrap_or_else(|| ANONYMOUS_USER.to_string());
    let response = svc.chat(request, &owner).await?;
    Ok(Json(response))
}

/// POST `/api/documents`: multipart upload, returns extracted text plus a
/// model-generated summary.
pub async fn upload_document_handler(
    State(svc): State<ChatService>,
    mut multipart: Multipart,
) -> Result<Json<DocumentResponse>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::FileReadError { message: e.to_string() })?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::FileReadError { message: e.to_string() })?;
        let response = svc.summarize_document(&file_name, &bytes).await?;
        return Ok(Json(response));
    }

    Err(AppError::EmptyField { field_name: "file".to_string() })
}

#[derive(serde::Deserialize)]
pub struct DeleteParams {
    pub id: Option<String>,
}

/// DELETE `/api/conversations?id=<chatId>`: owner-only. 404 when the id is
/// missing or unknown, 401 when unauthenticated or not the owner.
pub async fn delete_conversation_handler(
    State(svc): State<ChatService>,
    headers: HeaderMap,
    Query(params): Query<DeleteParams>,
) -> Response {
    let Some(id) = params.id else {
        return (StatusCode::NOT_FOUND, Json(json!({ "error": "Missing chat id" })))
            .into_response();
    };

    match svc.delete_conversation(&id, user_id(&headers).as_deref()).await {
        Ok(()) => (StatusCode::OK, Json(json!({ "deleted": id }))).into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET `/api/conversations`: the requester's conversations as JSON.
pub async fn list_conversations_handler(
    State(svc): State<ChatService>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let owner = user_id(&headers).unwrap_or_else(|| ANONYMOUS_USER.to_string());
    let conversations = svc.get_conversations(&owner).await?;
    Ok(Json(conversations).into_response())
}

/// GET `/api/conversations/{id}/messages`: messages for a conversation.
pub async fn list_messages_handler(
    Path(id): Path<String>,
    State(svc): State<ChatService>,
) -> Result<Response, AppError> {
    let messages = svc.get_messages(&id).await?;
    Ok(Json(messages).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attachment::MAX_ATTACHMENT_BYTES;

    #[test]
    fn body_cap_admits_a_maximum_size_attachment() {
        // base64 encodes 3 bytes as 4 characters.
        let encoded_attachment = MAX_ATTACHMENT_BYTES.div_ceil(3) * 4;
        assert!(MAX_BODY_BYTES > encoded_attachment + 64 * 1024);
    }
}
