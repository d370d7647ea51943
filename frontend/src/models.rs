use serde::{Deserialize, Serialize};

/// Matches the backend `Conversation` model.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Matches the backend `Message` model.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub role: String,
    pub content: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub mcqs: Vec<McqData>,
    #[serde(default)]
    pub graph_expressions: Vec<String>,
    pub created_at: String,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
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

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct McqData {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    #[serde(default)]
    pub explanation: Option<String>,
}

/// Request body for `POST /api/chat`.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canvas_data_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment_data: Option<Attachment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_text: Option<String>,
}

/// Response from `POST /api/chat`.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    #[serde(default)]
    pub conversation_id: Option<String>,
    pub reply: String,
    #[serde(default)]
    pub desmos_expressions: Option<Vec<String>>,
    #[serde(default)]
    pub mcq_data: Option<Vec<McqData>>,
}

/// Response from `POST /api/documents`.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentResponse {
    pub file_name: String,
    pub file_type: String,
    pub summary: String,
    pub raw_text: String,
}
