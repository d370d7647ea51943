use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::attachment::DataUrl;
use crate::errors::AppError;
use crate::models::HistoryTurn;

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// The hosted generative model, seen from the service layer. Production uses
/// [`GeminiClient`]; tests inject a stub so the rejection-before-network
/// properties can be checked without a server.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// Stateless one-shot generation.
    async fn generate(
        &self,
        system_instruction: &str,
        message: &str,
        image_data_urls: &[String],
    ) -> Result<String, AppError>;

    /// A turn appended to a session seeded with prior history. History must
    /// strictly alternate user/model starting with user.
    async fn chat(
        &self,
        system_instruction: &str,
        history: &[HistoryTurn],
        message: &str,
        image_data_urls: &[String],
    ) -> Result<String, AppError>;
}

/// Rejects history that would not replay as a valid chat session. Runs before
/// any network call; the error names the first offending position.
pub fn ensure_alternating(history: &[HistoryTurn]) -> Result<(), AppError> {
    use crate::models::MessageRole;
    for (position, turn) in history.iter().enumerate() {
        let expected = if position % 2 == 0 { MessageRole::User } else { MessageRole::Model };
        if turn.role != expected {
            return Err(AppError::InvalidSequence {
                position,
                found: turn.role.to_string(),
            });
        }
    }
    Ok(())
}

// ── Wire types (generateContent) ─────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    system_instruction: Content,
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

/// Builds the final user turn: one text part plus an inline image part per
/// well-formed data URL. A malformed data URL is dropped, not an error.
fn build_user_parts(text: &str, image_data_urls: &[String]) -> Vec<Part> {
    let mut parts = vec![Part { text: Some(text.to_string()), inline_data: None }];
    for url in image_data_urls {
        match DataUrl::parse(url) {
            Some(data_url) => parts.push(Part {
                text: None,
                inline_data: Some(InlineData {
                    mime_type: data_url.mime_type,
                    data: data_url.data,
                }),
            }),
            None => warn!("Dropping malformed image data URL ({} bytes)", url.len()),
        }
    }
    parts
}

/// Client for the hosted Gemini generateContent endpoint.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: String, base_url: String, model: String) -> Self {
        Self { http: reqwest::Client::new(), api_key, base_url, model }
    }

    async fn send(&self, request: &GenerateContentRequest) -> Result<String, AppError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        );

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                error!("Model request failed: {e}");
                if e.is_connect() || e.is_timeout() {
                    AppError::ModelUnavailable { host: self.base_url.clone() }
                } else {
                    AppError::ModelError { message: e.to_string() }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Model API returned {status}: {body}");
            return Err(AppError::ModelError { message: format!("{status}: {body}") });
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| AppError::ModelError { message: format!("malformed response: {e}") })?;

        let reply: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if reply.is_empty() {
            return Err(AppError::ModelError { message: "empty model response".into() });
        }
        Ok(reply)
    }
}

#[async_trait]
impl GenerativeBackend for GeminiClient {
    async fn generate(
        &self,
        system_instruction: &str,
        message: &str,
        image_data_urls: &[String],
    ) -> Result<String, AppError> {
        let request = GenerateContentRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part { text: Some(system_instruction.to_string()), inline_data: None }],
            },
            contents: vec![Content {
                role: Some("user".into()),
                parts: build_user_parts(message, image_data_urls),
            }],
        };
        self.send(&request).await
    }

    async fn chat(
        &self,
        system_instruction: &str,
        history: &[HistoryTurn],
        message: &str,
        image_data_urls: &[String],
    ) -> Result<String, AppError> {
        ensure_alternating(history)?;

        let mut contents: Vec<Content> = history
            .iter()
            .map(|turn| Content {
                role: Some(turn.role.to_string()),
                parts: vec![Part { text: Some(turn.content.clone()), inline_data: None }],
            })
            .collect();
        contents.push(Content {
            role: Some("user".into()),
            parts: build_user_parts(message, image_data_urls),
        });

        let request = GenerateContentRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part { text: Some(system_instruction.to_string()), inline_data: None }],
            },
            contents,
        };
        self.send(&request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MessageRole;

    fn turn(role: MessageRole, content: &str) -> HistoryTurn {
        HistoryTurn { role, content: content.to_string() }
    }

    #[test]
    fn empty_and_alternating_histories_pass() {
        assert!(ensure_alternating(&[]).is_ok());
        let history = [
            turn(MessageRole::User, "hi"),
            turn(MessageRole::Model, "hello"),
            turn(MessageRole::User, "explain fractions"),
            turn(MessageRole::Model, "sure"),
        ];
        assert!(ensure_alternating(&history).is_ok());
    }

    #[test]
    fn history_starting_with_model_is_rejected_at_position_zero() {
        let history = [turn(MessageRole::Model, "hello")];
        let err = ensure_alternating(&history).unwrap_err();
        assert!(matches!(err, AppError::InvalidSequence { position: 0, .. }));
    }

    #[test]
    fn doubled_user_turn_is_rejected_at_its_position() {
        let history = [
            turn(MessageRole::User, "a"),
            turn(MessageRole::User, "b"),
        ];
        let err = ensure_alternating(&history).unwrap_err();
        match err {
            AppError::InvalidSequence { position, found } => {
                assert_eq!(position, 1);
                assert_eq!(found, "user");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn malformed_data_urls_are_dropped_silently() {
        let urls = vec![
            "data:image/png;base64,iVBORw0KGgo=".to_string(),
            "data:image/gif;base64,abcd".to_string(),
            "not a data url".to_string(),
        ];
        let parts = build_user_parts("look at this", &urls);
        // text part + the single well-formed image
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[1].inline_data.as_ref().unwrap().mime_type, "image/png");
    }

    #[test]
    fn request_serializes_with_camel_case_keys() {
        let request = GenerateContentRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part { text: Some("be helpful".into()), inline_data: None }],
            },
            contents: vec![Content {
                role: Some("user".into()),
                parts: build_user_parts("hi", &["data:image/png;base64,abcd".to_string()]),
            }],
        };
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("systemInstruction").is_some());
        let parts = &value["contents"][0]["parts"];
        assert_eq!(parts[0]["text"], "hi");
        assert_eq!(parts[1]["inlineData"]["mimeType"], "image/png");
    }
}
