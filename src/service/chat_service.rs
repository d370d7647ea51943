use std::sync::Arc;

use tracing::error;
use uuid::Uuid;

use crate::agent::GenerativeBackend;
use crate::attachment;
use crate::docs;
use crate::errors::AppError;
use crate::extract;
use crate::models::{
    ChatRequest, ChatResponse, Conversation, DocumentResponse, HistoryTurn, Message, MessageRole,
};
use crate::prompt;
use crate::store::ConversationStore;

const MAX_MESSAGE_LENGTH: usize = 8000;

/// Document text beyond this many characters is truncated before it is sent
/// to the model.
const MAX_DOCUMENT_CHARS: usize = 15_000;

#[derive(Clone)]
pub struct ChatService {
    store: Arc<dyn ConversationStore>,
    backend: Arc<dyn GenerativeBackend>,
}

impl ChatService {
    pub fn new(store: Arc<dyn ConversationStore>, backend: Arc<dyn GenerativeBackend>) -> Self {
        Self { store, backend }
    }

    pub async fn get_conversations(&self, owner_id: &str) -> Result<Vec<Conversation>, AppError> {
        self.store.list_conversations(owner_id).await
    }

    pub async fn get_messages(&self, conversation_id: &str) -> Result<Vec<Message>, AppError> {
        self.store
            .find_conversation(conversation_id)
            .await?
            .ok_or_else(|| AppError::ConversationNotFound { id: conversation_id.to_string() })?;
        self.store.messages_for(conversation_id).await
    }

    /// One chat turn. With `history` in the request the call is stateless and
    /// nothing is persisted; otherwise the server-side conversation is the
    /// source of truth and both turns are appended to it.
    pub async fn chat(&self, request: ChatRequest, owner_id: &str) -> Result<ChatResponse, AppError> {
        // ── Validation ────────────────────────────────────────────────────────
        if request.message.trim().is_empty() {
            return Err(AppError::EmptyField { field_name: "message".to_string() });
        }
        if request.message.len() > MAX_MESSAGE_LENGTH {
            return Err(AppError::FieldTooLong {
                field_name: "message".to_string(),
                max_length: MAX_MESSAGE_LENGTH,
                actual_length: request.message.len(),
            });
        }
        if let Some(att) = &request.attachment_data {
            attachment::validate(att)?;
        }

        // ── Compose the prompt ────────────────────────────────────────────────
        let image_attachment = request
            .attachment_data
            .as_ref()
            .filter(|a| a.is_image());
        let document_attachment = request
            .attachment_data
            .as_ref()
            .filter(|a| !a.is_image());

        let mut document_text = request.document_text.clone();
        if document_text.is_none() {
            if let Some(att) = document_attachment {
                let bytes = attachment::decode(att)?;
                document_text = Some(docs::extract_text(&att.name, &bytes)?.text);
            }
        }

        let has_canvas = request.canvas_data_url.is_some();
        let composed = prompt::compose(&request.message, has_canvas, document_text.is_some());

        let mut message_text = composed.message;
        if let Some(text) = &document_text {
            message_text.push_str("\n\n--- Attached document ---\n");
            message_text.push_str(truncate_chars(text, MAX_DOCUMENT_CHARS));
        }

        // Inline image parts: canvas snapshot first, then any image attachment.
        let mut image_data_urls: Vec<String> = Vec::new();
        if let Some(url) = &request.canvas_data_url {
            image_data_urls.push(url.clone());
        }
        if let Some(att) = image_attachment {
            image_data_urls.push(format!("data:{};base64,{}", att.mime_type, att.encoded_data));
        }

        // ── Stateless variant: replay the client-supplied history ─────────────
        if let Some(history) = &request.history {
            let reply = self
                .backend
                .chat(&composed.system_instruction, history, &message_text, &image_data_urls)
                .await?;
            let extracted = extract::extract(&reply);
            return Ok(ChatResponse {
                conversation_id: None,
                reply,
                desmos_expressions: extracted.desmos_expressions,
                mcq_data: extracted.mcqs,
            });
        }

        // ── Persisted variant: resolve or create the conversation ─────────────
        let conversation_id = request
            .conversation_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        if self.store.find_conversation(&conversation_id).await?.is_none() {
            let title = title_from(&request.message);
            let conv = Conversation::new(conversation_id.clone(), owner_id.to_string(), title);
            self.store.save_conversation(&conv).await?;
        }

        let stored = self.store.messages_for(&conversation_id).await?;
        let history: Vec<HistoryTurn> = stored
            .iter()
            .map(|m| HistoryTurn { role: m.role, content: m.content.clone() })
            .collect();

        // ── Call the model and extract structured output ──────────────────────
        let reply = self
            .backend
            .chat(&composed.system_instruction, &history, &message_text, &image_data_urls)
            .await?;
        let extracted = extract::extract(&reply);

        // Both turns are persisted only once the model call has succeeded, so
        // a failed call leaves the stored history alternating and the
        // conversation usable for a retry.
        let mut user_message = Message::new(
            conversation_id.clone(),
            MessageRole::User,
            request.message.clone(),
        );
        if let Some(att) = &request.attachment_data {
            user_message.attachments.push(att.clone());
        }
        self.store.save_message(&user_message).await?;

        let mut model_message =
            Message::new(conversation_id.clone(), MessageRole::Model, reply.clone());
        if let Some(exprs) = &extracted.desmos_expressions {
            model_message.graph_expressions = exprs.clone();
        }
        if let Some(mcqs) = &extracted.mcqs {
            model_message.mcqs = mcqs.clone();
        }
        self.store.save_message(&model_message).await?;

        if let Err(e) = self.store.touch_conversation(&conversation_id).await {
            error!("Failed to update conversation timestamp: {e}");
        }

        Ok(ChatResponse {
            conversation_id: Some(conversation_id),
            reply,
            desmos_expressions: extracted.desmos_expressions,
            mcq_data: extracted.mcqs,
        })
    }

    /// Extracts text from an uploaded document and asks the model for a short
    /// summary via a one-shot call.
    pub async fn summarize_document(
        &self,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<DocumentResponse, AppError> {
        if bytes.len() > attachment::MAX_ATTACHMENT_BYTES {
            return Err(AppError::FileTooLarge {
                name: file_name.to_string(),
                size: bytes.len(),
                limit: attachment::MAX_ATTACHMENT_BYTES,
            });
        }

        let doc = docs::extract_text(file_name, bytes)?;
        let request = format!(
            "Summarize the following document in a few sentences, then list its key points \
             and any formulas or definitions worth remembering.\n\n{}",
            truncate_chars(&doc.text, MAX_DOCUMENT_CHARS)
        );
        let summary = self
            .backend
            .generate(prompt::SYSTEM_PROMPT, &request, &[])
            .await?;

        Ok(DocumentResponse {
            file_name: file_name.to_string(),
            file_type: doc.file_type,
            summary,
            raw_text: doc.text,
        })
    }

    /// Deletes a conversation. The requester must be the owner.
    pub async fn delete_conversation(
        &self,
        conversation_id: &str,
        requester: Option<&str>,
    ) -> Result<(), AppError> {
        let conversation = self
            .store
            .find_conversation(conversation_id)
            .await?
            .ok_or_else(|| AppError::ConversationNotFound { id: conversation_id.to_string() })?;

        match requester {
            Some(user) if user == conversation.owner_id => {
                self.store.delete_conversation(conversation_id).await
            }
            _ => Err(AppError::Unauthorized),
        }
    }
}

fn title_from(message: &str) -> String {
    let t = message.trim();
    if t.chars().count() > 60 {
        format!("{}…", t.chars().take(60).collect::<String>())
    } else {
        t.to_string()
    }
}

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::ensure_alternating;
    use crate::store::memory::MemoryStore;
    use async_trait::async_trait;
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Backend stub: counts calls, echoes a canned reply, and enforces the
    /// same alternation contract as the production client.
    struct StubBackend {
        reply: String,
        calls: AtomicUsize,
    }

    impl StubBackend {
        fn new(reply: &str) -> Self {
            Self { reply: reply.to_string(), calls: AtomicUsize::new(0) }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl GenerativeBackend for StubBackend {
        async fn generate(
            &self,
            _system_instruction: &str,
            _message: &str,
            _image_data_urls: &[String],
        ) -> Result<String, AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.reply.clone())
        }

        async fn chat(
            &self,
            _system_instruction: &str,
            history: &[HistoryTurn],
            _message: &str,
            _image_data_urls: &[String],
        ) -> Result<String, AppError> {
            ensure_alternating(history)?;
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.reply.clone())
        }
    }

    fn service(reply: &str) -> (ChatService, Arc<StubBackend>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let backend = Arc::new(StubBackend::new(reply));
        (ChatService::new(store.clone(), backend.clone()), backend, store)
    }

    fn plain_request(message: &str) -> ChatRequest {
        ChatRequest {
            conversation_id: None,
            message: message.to_string(),
            history: None,
            canvas_data_url: None,
            attachment_data: None,
            document_text: None,
        }
    }

    #[tokio::test]
    async fn empty_message_is_rejected_before_any_model_call() {
        let (svc, backend, _) = service("unused");
        let err = svc.chat(plain_request("   "), "alice").await.unwrap_err();
        assert!(matches!(err, AppError::EmptyField { .. }));
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn oversized_attachment_is_rejected_before_any_model_call() {
        let (svc, backend, _) = service("unused");
        let mut request = plain_request("look at this");
        request.attachment_data = Some(crate::models::Attachment {
            name: "big.png".into(),
            mime_type: "image/png".into(),
            encoded_data: BASE64.encode(vec![0u8; attachment::MAX_ATTACHMENT_BYTES + 1]),
        });
        let err = svc.chat(request, "alice").await.unwrap_err();
        assert!(matches!(err, AppError::FileTooLarge { .. }));
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn disallowed_attachment_type_is_rejected() {
        let (svc, backend, _) = service("unused");
        let mut request = plain_request("look at this");
        request.attachment_data = Some(crate::models::Attachment {
            name: "anim.gif".into(),
            mime_type: "image/gif".into(),
            encoded_data: BASE64.encode(b"gif bytes"),
        });
        let err = svc.chat(request, "alice").await.unwrap_err();
        assert!(matches!(err, AppError::UnsupportedType { .. }));
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn graph_reply_is_extracted_and_persisted() {
        let reply = "Here you go:\n```json\n{\"desmos_expressions\": [\"y=x^2\"], \"description\": \"a parabola\"}\n```";
        let (svc, _, store) = service(reply);

        let response = svc.chat(plain_request("@graph plot y=x^2"), "alice").await.unwrap();
        assert_eq!(response.desmos_expressions, Some(vec!["y=x^2".to_string()]));
        assert_eq!(response.mcq_data, None);
        assert!(response.reply.contains("Here you go"));

        let conversation_id = response.conversation_id.unwrap();
        let messages = store.messages_for(&conversation_id).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, MessageRole::User);
        assert_eq!(messages[1].role, MessageRole::Model);
        assert_eq!(messages[1].graph_expressions, vec!["y=x^2".to_string()]);
    }

    #[tokio::test]
    async fn mcq_reply_is_extracted() {
        let reply = "```json\n{\"mcqs\": [{\"question\": \"1+1?\", \"options\": [\"1\", \"2\"], \"correctAnswer\": \"2\"}]}\n```";
        let (svc, _, _) = service(reply);
        let response = svc
            .chat(plain_request("@mcq generate 1 question"), "alice")
            .await
            .unwrap();
        let mcqs = response.mcq_data.unwrap();
        assert_eq!(mcqs.len(), 1);
        assert_eq!(mcqs[0].correct_answer, "2");
    }

    #[tokio::test]
    async fn follow_up_turns_replay_alternating_history() {
        let (svc, _, store) = service("sure thing");
        let first = svc.chat(plain_request("hello"), "alice").await.unwrap();
        let conversation_id = first.conversation_id.unwrap();

        let mut second = plain_request("and now?");
        second.conversation_id = Some(conversation_id.clone());
        svc.chat(second, "alice").await.unwrap();

        let messages = store.messages_for(&conversation_id).await.unwrap();
        let roles: Vec<_> = messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![MessageRole::User, MessageRole::Model, MessageRole::User, MessageRole::Model]
        );
    }

    /// Backend stub that fails its first chat call and succeeds afterwards.
    struct FailFirstBackend {
        reply: String,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl GenerativeBackend for FailFirstBackend {
        async fn generate(
            &self,
            _system_instruction: &str,
            _message: &str,
            _image_data_urls: &[String],
        ) -> Result<String, AppError> {
            Ok(self.reply.clone())
        }

        async fn chat(
            &self,
            _system_instruction: &str,
            history: &[HistoryTurn],
            _message: &str,
            _image_data_urls: &[String],
        ) -> Result<String, AppError> {
            ensure_alternating(history)?;
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(AppError::ModelError { message: "quota exceeded".into() });
            }
            Ok(self.reply.clone())
        }
    }

    #[tokio::test]
    async fn failed_model_call_leaves_no_orphaned_user_turn() {
        let store = Arc::new(MemoryStore::new());
        let backend = Arc::new(FailFirstBackend {
            reply: "better now".to_string(),
            calls: AtomicUsize::new(0),
        });
        let svc = ChatService::new(store.clone(), backend);

        let mut first = plain_request("hello");
        first.conversation_id = Some("c1".to_string());
        let err = svc.chat(first, "alice").await.unwrap_err();
        assert!(matches!(err, AppError::ModelError { .. }));
        assert!(store.messages_for("c1").await.unwrap().is_empty());

        // The retry succeeds and the stored history still alternates.
        let mut second = plain_request("hello again");
        second.conversation_id = Some("c1".to_string());
        svc.chat(second, "alice").await.unwrap();

        let roles: Vec<_> = store
            .messages_for("c1")
            .await
            .unwrap()
            .iter()
            .map(|m| m.role)
            .collect();
        assert_eq!(roles, vec![MessageRole::User, MessageRole::Model]);

        // A third turn replays that history without tripping the
        // alternation check.
        let mut third = plain_request("one more");
        third.conversation_id = Some("c1".to_string());
        svc.chat(third, "alice").await.unwrap();
    }

    #[tokio::test]
    async fn stateless_variant_persists_nothing() {
        let (svc, _, store) = service("ok");
        let mut request = plain_request("next question");
        request.history = Some(vec![
            HistoryTurn { role: MessageRole::User, content: "hi".into() },
            HistoryTurn { role: MessageRole::Model, content: "hello".into() },
        ]);

        let response = svc.chat(request, "alice").await.unwrap();
        assert_eq!(response.conversation_id, None);
        assert!(store.list_conversations("alice").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn non_alternating_history_fails_before_any_model_call() {
        let (svc, backend, _) = service("unused");
        let mut request = plain_request("next");
        request.history = Some(vec![
            HistoryTurn { role: MessageRole::User, content: "a".into() },
            HistoryTurn { role: MessageRole::User, content: "b".into() },
        ]);

        let err = svc.chat(request, "alice").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidSequence { position: 1, .. }));
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn delete_requires_the_owner() {
        let (svc, _, _) = service("hi");
        let response = svc.chat(plain_request("hello"), "alice").await.unwrap();
        let id = response.conversation_id.unwrap();

        let err = svc.delete_conversation(&id, None).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized));
        let err = svc.delete_conversation(&id, Some("mallory")).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized));

        svc.delete_conversation(&id, Some("alice")).await.unwrap();
        let err = svc.delete_conversation(&id, Some("alice")).await.unwrap_err();
        assert!(matches!(err, AppError::ConversationNotFound { .. }));
    }

    #[tokio::test]
    async fn unknown_conversation_delete_is_not_found() {
        let (svc, _, _) = service("hi");
        let err = svc.delete_conversation("ghost", Some("alice")).await.unwrap_err();
        assert!(matches!(err, AppError::ConversationNotFound { .. }));
    }

    #[tokio::test]
    async fn document_summary_round_trip() {
        let (svc, backend, _) = service("A short summary.");
        let response = svc
            .summarize_document("notes.txt", b"The mitochondria is the powerhouse of the cell.")
            .await
            .unwrap();
        assert_eq!(response.file_type, "txt");
        assert_eq!(response.summary, "A short summary.");
        assert!(response.raw_text.contains("powerhouse"));
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test]
    async fn long_titles_are_truncated() {
        let (svc, _, store) = service("ok");
        let long = "x".repeat(100);
        let response = svc.chat(plain_request(&long), "alice").await.unwrap();
        let id = response.conversation_id.unwrap();
        let conv = store.find_conversation(&id).await.unwrap().unwrap();
        assert!(conv.title.chars().count() <= 61);
        assert!(conv.title.ends_with('…'));
    }
}
