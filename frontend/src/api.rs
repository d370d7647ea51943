use gloo_net::http::Request;
use wasm_bindgen::JsValue;
use web_sys::FormData;

use crate::models::{ChatRequest, ChatResponse, Conversation, DocumentResponse, Message};

/// Base URL of the backend API server.
const API_BASE: &str = "http://localhost:8080";

/// Stand-in user identity. Session handling lives in front of this app; the
/// backend only needs a stable owner id per browser.
const USER_ID: &str = "local-user";

/// Fetches the list of the user's conversations from the backend.
pub async fn fetch_conversations() -> Result<Vec<Conversation>, String> {
    let resp = Request::get(&format!("{API_BASE}/api/conversations"))
        .header("x-user-id", USER_ID)
        .send()
        .await
        .map_err(|e| format!("Network error: {e}"))?;

    if !resp.ok() {
        return Err(format!("Server error: {}", resp.status()));
    }

    resp.json::<Vec<Conversation>>()
        .await
        .map_err(|e| format!("Parse error: {e}"))
}

/// Fetches all messages for a given conversation.
pub async fn fetch_messages(conversation_id: &str) -> Result<Vec<Message>, String> {
    let resp = Request::get(&format!(
        "{API_BASE}/api/conversations/{conversation_id}/messages"
    ))
    .header("x-user-id", USER_ID)
    .send()
    .await
    .map_err(|e| format!("Network error: {e}"))?;

    if !resp.ok() {
        return Err(format!("Server error: {}", resp.status()));
    }

    resp.json::<Vec<Message>>()
        .await
        .map_err(|e| format!("Parse error: {e}"))
}

/// Sends one chat turn.
pub async fn send_chat(request: &ChatRequest) -> Result<ChatResponse, String> {
    let resp = Request::post(&format!("{API_BASE}/api/chat"))
        .header("x-user-id", USER_ID)
        .json(request)
        .map_err(|e| format!("Serialize error: {e}"))?
        .send()
        .await
        .map_err(|e| format!("Network error: {e}"))?;

    if !resp.ok() {
        return Err(format!("Server error: {}", resp.status()));
    }

    resp.json::<ChatResponse>()
        .await
        .map_err(|e| format!("Parse error: {e}"))
}

/// Uploads a document for text extraction and summarisation.
pub async fn upload_document(file: &web_sys::File) -> Result<DocumentResponse, String> {
    let form = FormData::new().map_err(|e| format!("Form error: {e:?}"))?;
    form.append_with_blob_and_filename("file", file, &file.name())
        .map_err(|e| format!("Form error: {e:?}"))?;

    let resp = Request::post(&format!("{API_BASE}/api/documents"))
        .header("x-user-id", USER_ID)
        .body(JsValue::from(form))
        .map_err(|e| format!("Request error: {e}"))?
        .send()
        .await
        .map_err(|e| format!("Network error: {e}"))?;

    if !resp.ok() {
        return Err(format!("Server error: {}", resp.status()));
    }

    resp.json::<DocumentResponse>()
        .await
        .map_err(|e| format!("Parse error: {e}"))
}

/// Deletes a conversation the user owns.
pub async fn delete_conversation(conversation_id: &str) -> Result<(), String> {
    let resp = Request::delete(&format!("{API_BASE}/api/conversations?id={conversation_id}"))
        .header("x-user-id", USER_ID)
        .send()
        .await
        .map_err(|e| format!("Network error: {e}"))?;

    if !resp.ok() {
        return Err(format!("Server error: {}", resp.status()));
    }
    Ok(())
}
