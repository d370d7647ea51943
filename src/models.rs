use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn new(id: String, owner_id: String, title: String) -> Self {
        let now = Utc::now();
        Self { id, owner_id, title, created_at: now, updated_at: now }
    }
}

/// Gemini role names. Conversation history must strictly alternate
/// user/model starting with user when replayed as chat context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Model,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Model => "model",
        }
    }
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for MessageRole {
    type Error = String;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "user" => Ok(MessageRole::User),
            "model" => Ok(MessageRole::Model),
            other => Err(format!("Unknown role: {other}")),
        }
    }
}

/// A user-supplied file, already base64-encoded by the client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub name: String,
    pub mime_type: String,
    pub encoded_data: String,
}

impl Attachment {
    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }
}

/// A multiple-choice question extracted from model output. `correct_answer`
/// is guaranteed to be a member of `options` by the extractor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct McqData {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub role: MessageRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mcqs: Vec<McqData>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub graph_expressions: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(conversation_id: String, role: MessageRole, content: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            conversation_id,
            role,
            content,
            attachments: Vec::new(),
            mcqs: Vec::new(),
            graph_expressions: Vec::new(),
            created_at: Utc::now(),
        }
    }
}

/// A single prior turn supplied by a stateless client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryTurn {
    pub role: MessageRole,
    pub content: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    /// Present in the persisted-history variant; the server replays stored
    /// history and appends both turns to the conversation.
    pub conversation_id: Option<String>,
    pub message: String,
    /// Present in the stateless variant; nothing is persisted server-side.
    #[serde(default)]
    pub history: Option<Vec<HistoryTurn>>,
    /// PNG snapshot of the drawing canvas as a data URL.
    #[serde(default)]
    pub canvas_data_url: Option<String>,
    #[serde(default)]
    pub attachment_data: Option<Attachment>,
    /// Raw text pulled out of a previously uploaded document, if any.
    #[serde(default)]
    pub document_text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    pub reply: String,
    pub desmos_expressions: Option<Vec<String>>,
    pub mcq_data: Option<Vec<McqData>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentResponse {
    pub file_name: String,
    pub file_type: String,
    pub summary: String,
    pub raw_text: String,
}
