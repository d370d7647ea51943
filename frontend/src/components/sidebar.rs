use leptos::prelude::*;

use crate::state::AppState;

/// Sidebar showing the conversation list and "New Chat" button.
#[component]
pub fn Sidebar() -> impl IntoView {
    let state = expect_context::<AppState>();

    let new_state = state.clone();
    let on_new = move |_| {
        new_state.new_conversation();
    };

    view! {
        <aside class="sidebar">
            <div class="sidebar-header">
                <h2>"Studypad"</h2>
                <button class="new-chat-btn" on:click=on_new>
                    "+ New Chat"
                </button>
            </div>
            <div class="conversation-list">
                {move || {
                    let convos = state.conversations.get();
                    if convos.is_empty() {
                        view! {
                            <div class="conversation-empty">
                                "No conversations yet"
                            </div>
                        }.into_any()
                    } else {
                        let row_state = state.clone();
                        let conversations = state.conversations;
                        let active = state.active_conversation;
                        view! {
                            <For
                                each=move || conversations.get()
                                key=|c| c.id.clone()
                                let:conv
                            >
                                {
                                    let select_state = row_state.clone();
                                    let delete_state = row_state.clone();
                                    let id = conv.id.clone();
                                    let title = conv.title.clone();
                                    let id_click = id.clone();
                                    let id_active = id.clone();
                                    let id_delete = id.clone();
                                    view! {
                                        <div
                                            class="conversation-item"
                                            class:active=move || {
                                                active.get().as_deref() == Some(id_active.as_str())
                                            }
                                            on:click=move |_| {
                                                select_state.select_conversation(id_click.clone());
                                            }
                                        >
                                            <span class="conversation-title">{title}</span>
                                            <button
                                                class="delete-btn"
                                                on:click=move |ev| {
                                                    ev.stop_propagation();
                                                    delete_state.delete_conversation(id_delete.clone());
                                                }
                                            >
                                                "🗑"
                                            </button>
                                        </div>
                                    }
                                }
                            </For>
                        }.into_any()
                    }
                }}
            </div>
        </aside>
    }
}
