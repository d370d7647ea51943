use leptos::ev;
use leptos::prelude::*;
use web_sys::HtmlInputElement;

use crate::components::quiz::QuizCardView;
use crate::state::AppState;
use crate::transcript::{ChatEntry, EntryRole};

/// Main chat area with message history, quiz cards, and the composer.
#[component]
pub fn ChatArea() -> impl IntoView {
    let state = expect_context::<AppState>();

    view! {
        <main class="chat-area">
            // Notice banner (validation errors, soft-blocks, network failures)
            {move || {
                state.notice.get().map(|msg| {
                    view! {
                        <div class="notice-banner">{msg}</div>
                    }
                })
            }}

            // Chat header
            <div class="chat-header">
                {move || {
                    match state.active_conversation.get() {
                        Some(id) => format!("Conversation: {}", &id[..8.min(id.len())]),
                        None => "New conversation".to_string(),
                    }
                }}
            </div>

            // Messages
            <div class="messages-container">
                {move || {
                    if state.transcript.get().is_empty() {
                        view! {
                            <div class="empty-state">
                                "Ask the tutor anything. Try \"@graph plot y=x^2\" or \"@mcq quiz me on fractions\"."
                            </div>
                        }.into_any()
                    } else {
                        view! {
                            <For
                                each=move || state.transcript.get().entries().to_vec()
                                key=|e| e.id
                                let:entry
                            >
                                <MessageBubble entry=entry />
                            </For>
                        }.into_any()
                    }
                }}
            </div>

            // Input area
            <ChatInput />
        </main>
    }
}

/// A single chat entry: message text plus any quiz cards it carries.
#[component]
fn MessageBubble(entry: ChatEntry) -> impl IntoView {
    let (css_class, label) = match entry.role {
        EntryRole::User => ("message user", "you"),
        EntryRole::Model => ("message tutor", "tutor"),
        EntryRole::Notice => ("message notice", "notice"),
    };
    let entry_id = entry.id;
    let quiz_count = entry.quiz.len();

    view! {
        <div class=css_class>
            <div class="role-label">{label}</div>
            <div class="message-content">{entry.content.clone()}</div>
            {(quiz_count > 0)
                .then(|| {
                    (0..quiz_count)
                        .map(|card_index| {
                            view! { <QuizCardView entry_id=entry_id card_index=card_index /> }
                        })
                        .collect_view()
                })}
        </div>
    }
}

/// Composer: textarea, attach button, panel toggles, send button.
#[component]
fn ChatInput() -> impl IntoView {
    let state = expect_context::<AppState>();
    let (input, set_input) = signal(String::new());

    let is_sending = move || state.is_sending.get();

    let file_state = state.clone();
    let send_state = state.clone();
    let send = move || {
        let text = input.get().trim().to_string();
        if text.is_empty() {
            return;
        }
        set_input.set(String::new());
        send_state.send_message(text);
    };

    let send_clone = send.clone();
    let on_keydown = move |ev: ev::KeyboardEvent| {
        if ev.key() == "Enter" && !ev.shift_key() {
            ev.prevent_default();
            send_clone();
        }
    };

    let on_submit = move |_| {
        send();
    };

    let on_file_change = move |ev: ev::Event| {
        let input: HtmlInputElement = event_target(&ev);
        if let Some(file) = input.files().and_then(|files| files.item(0)) {
            file_state.attach_file(file);
        }
        input.set_value("");
    };

    let toggle_canvas = move |_| {
        state.canvas_panel.update(|p| {
            if p.is_open() {
                p.close();
            } else {
                p.open();
            }
        });
    };

    let toggle_graph = move |_| {
        state.graph_panel.update(|p| {
            if p.is_open() {
                p.close();
            } else {
                p.open();
            }
        });
    };

    view! {
        <div class="input-area">
            // Pending attachment / document chips
            {move || {
                state.pending_attachment.get().map(|att| {
                    view! { <div class="attachment-chip">{format!("📎 {}", att.name)}</div> }
                })
            }}
            {move || {
                state.pending_document.get().map(|doc| {
                    view! { <div class="attachment-chip">{format!("📄 {}", doc.file_name)}</div> }
                })
            }}
            {move || {
                state.is_processing_file.get().then(|| {
                    view! { <div class="attachment-chip">"Processing file…"</div> }
                })
            }}

            <div class="input-row">
                <label class="attach-btn">
                    "📎"
                    <input
                        type="file"
                        style="display:none"
                        accept="image/jpeg,image/png,image/webp,.pdf,.docx,.xlsx,.xls,.txt,.md"
                        on:change=on_file_change
                    />
                </label>
                <button class="panel-btn" on:click=toggle_canvas>"✏ Canvas"</button>
                <button class="panel-btn" on:click=toggle_graph>"📈 Graph"</button>
                <textarea
                    rows="1"
                    placeholder="Type a message… (@canvas, @graph, @mcq)"
                    prop:value=input
                    on:input=move |ev| {
                        set_input.set(event_target_value(&ev));
                    }
                    on:keydown=on_keydown
                    disabled=is_sending
                />
                <button
                    class="send-btn"
                    on:click=on_submit
                    disabled=move || is_sending() || input.get().trim().is_empty()
                >
                    {move || if is_sending() { "Sending…" } else { "Send" }}
                </button>
            </div>
        </div>
    }
}
