use leptos::prelude::*;
use leptos::task::spawn_local;

use crate::api;
use crate::files;
use crate::models::{Attachment, ChatRequest, Conversation, DocumentResponse};
use crate::panels::{CanvasPanel, GraphPanel};
use crate::transcript::Transcript;

/// Shared application state, provided via Leptos context.
#[derive(Clone)]
pub struct AppState {
    // --- Read signals (for components to subscribe to) ---
    pub conversations: ReadSignal<Vec<Conversation>>,
    pub active_conversation: ReadSignal<Option<String>>,
    pub transcript: ReadSignal<Transcript>,
    pub is_sending: ReadSignal<bool>,
    pub is_processing_file: ReadSignal<bool>,
    pub notice: ReadSignal<Option<String>>,
    pub pending_attachment: ReadSignal<Option<Attachment>>,
    pub pending_document: ReadSignal<Option<DocumentResponse>>,

    // --- Write signals (for mutating state) ---
    pub set_conversations: WriteSignal<Vec<Conversation>>,
    pub set_active_conversation: WriteSignal<Option<String>>,
    pub set_transcript: WriteSignal<Transcript>,
    pub set_is_sending: WriteSignal<bool>,
    pub set_is_processing_file: WriteSignal<bool>,
    pub set_notice: WriteSignal<Option<String>>,
    pub set_pending_attachment: WriteSignal<Option<Attachment>>,
    pub set_pending_document: WriteSignal<Option<DocumentResponse>>,

    // --- Panel state machines (not Send: they hold widget capabilities) ---
    pub canvas_panel: RwSignal<CanvasPanel, LocalStorage>,
    pub graph_panel: RwSignal<GraphPanel>,
}

impl AppState {
    /// Create a new `AppState` and provide it in the current Leptos context.
    pub fn provide() -> Self {
        let (conversations, set_conversations) = signal(Vec::<Conversation>::new());
        let (active_conversation, set_active_conversation) = signal(None::<String>);
        let (transcript, set_transcript) = signal(Transcript::new());
        let (is_sending, set_is_sending) = signal(false);
        let (is_processing_file, set_is_processing_file) = signal(false);
        let (notice, set_notice) = signal(None::<String>);
        let (pending_attachment, set_pending_attachment) = signal(None::<Attachment>);
        let (pending_document, set_pending_document) = signal(None::<DocumentResponse>);
        let canvas_panel = RwSignal::new_local(CanvasPanel::default());
        let graph_panel = RwSignal::new(GraphPanel::default());

        let state = Self {
            conversations,
            active_conversation,
            transcript,
            is_sending,
            is_processing_file,
            notice,
            pending_attachment,
            pending_document,
            set_conversations,
            set_active_conversation,
            set_transcript,
            set_is_sending,
            set_is_processing_file,
            set_notice,
            set_pending_attachment,
            set_pending_document,
            canvas_panel,
            graph_panel,
        };

        provide_context(state.clone());
        state
    }

    /// Load conversations from the backend.
    pub fn load_conversations(&self) {
        let state = self.clone();
        spawn_local(async move {
            match api::fetch_conversations().await {
                Ok(convos) => state.set_conversations.set(convos),
                Err(e) => {
                    log::error!("Failed to fetch conversations: {e}");
                    state.set_notice.set(Some(e));
                }
            }
        });
    }

    /// Select a conversation and rebuild the transcript from its messages.
    pub fn select_conversation(&self, id: String) {
        let state = self.clone();
        self.set_active_conversation.set(Some(id.clone()));
        self.set_notice.set(None);

        spawn_local(async move {
            match api::fetch_messages(&id).await {
                Ok(messages) => {
                    let mut transcript = Transcript::new();
                    for m in &messages {
                        if m.role == "user" {
                            transcript.push_user(m.content.clone());
                        } else {
                            transcript.push_model(
                                m.content.clone(),
                                m.mcqs.clone(),
                                m.graph_expressions.clone(),
                            );
                        }
                    }
                    state.set_transcript.set(transcript);
                }
                Err(e) => {
                    log::error!("Failed to fetch messages: {e}");
                    state.set_notice.set(Some(e));
                }
            }
        });
    }

    /// Start a fresh conversation.
    pub fn new_conversation(&self) {
        self.set_active_conversation.set(None);
        self.set_transcript.set(Transcript::new());
        self.set_notice.set(None);
        self.set_pending_attachment.set(None);
        self.set_pending_document.set(None);
    }

    /// Delete a conversation and drop it from the sidebar.
    pub fn delete_conversation(&self, id: String) {
        let state = self.clone();
        spawn_local(async move {
            match api::delete_conversation(&id).await {
                Ok(()) => {
                    state.set_conversations.update(|convos| convos.retain(|c| c.id != id));
                    if state.active_conversation.get_untracked().as_deref() == Some(id.as_str()) {
                        state.new_conversation();
                    }
                }
                Err(e) => {
                    log::error!("Failed to delete conversation: {e}");
                    state.set_notice.set(Some(e));
                }
            }
        });
    }

    /// Encode a selected file. Images are held for the next message; documents
    /// go through the upload endpoint for text extraction and a summary.
    pub fn attach_file(&self, file: web_sys::File) {
        let state = self.clone();
        self.set_is_processing_file.set(true);
        self.set_notice.set(None);

        spawn_local(async move {
            match files::read_and_encode(&file).await {
                Ok(attachment) if attachment.is_image() => {
                    state.set_pending_attachment.set(Some(attachment));
                }
                Ok(_) => match api::upload_document(&file).await {
                    Ok(doc) => state.set_pending_document.set(Some(doc)),
                    Err(e) => state.set_notice.set(Some(e)),
                },
                Err(e) => state.set_notice.set(Some(e.to_string())),
            }
            state.set_is_processing_file.set(false);
        });
    }

    /// Send a chat turn. The user's message is appended to the transcript
    /// before the network call goes out; the reply (or an error notice) is
    /// appended when it resolves.
    pub fn send_message(&self, text: String) {
        // Pull the canvas snapshot first: an open-but-unmounted canvas
        // soft-blocks the submission with no transcript append and no call.
        let snapshot = match self.canvas_panel.with_untracked(|p| p.snapshot()) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                self.set_notice.set(Some(e.to_string()));
                return;
            }
        };

        let state = self.clone();
        let conversation_id = self.active_conversation.get_untracked();
        let attachment = self.pending_attachment.get_untracked();
        let document = self.pending_document.get_untracked();

        self.set_transcript.update(|t| {
            t.push_user(text.clone());
        });
        self.set_pending_attachment.set(None);
        self.set_pending_document.set(None);
        self.set_is_sending.set(true);
        self.set_notice.set(None);

        let request = ChatRequest {
            message: text,
            conversation_id,
            canvas_data_url: snapshot,
            attachment_data: attachment,
            document_text: document.map(|d| d.raw_text),
        };

        spawn_local(async move {
            match api::send_chat(&request).await {
                Ok(response) => {
                    if response.conversation_id.is_some() {
                        state.set_active_conversation.set(response.conversation_id.clone());
                    }
                    state.set_transcript.update(|t| {
                        t.push_model(
                            response.reply.clone(),
                            response.mcq_data.clone().unwrap_or_default(),
                            response.desmos_expressions.clone().unwrap_or_default(),
                        );
                    });
                    if let Some(exprs) = response.desmos_expressions {
                        if !exprs.is_empty() {
                            // Blank-then-set; auto-opens a closed panel.
                            state.graph_panel.update(|p| p.set_expressions(exprs));
                        }
                    }
                    state.load_conversations();
                }
                Err(e) => {
                    log::error!("Chat request failed: {e}");
                    state.set_transcript.update(|t| {
                        t.push_notice(format!("{e}. Please try again."));
                    });
                }
            }
            state.set_is_sending.set(false);
        });
    }
}
