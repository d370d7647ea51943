mod api;
mod components;
mod files;
mod models;
mod panels;
mod state;
mod transcript;

use leptos::mount::mount_to_body;
use leptos::prelude::*;

use components::canvas::CanvasPanelView;
use components::chat::ChatArea;
use components::graph::GraphPanelView;
use components::sidebar::Sidebar;
use state::AppState;

/// Root application component.
#[component]
fn App() -> impl IntoView {
    let state = AppState::provide();

    // Load conversations on mount
    state.load_conversations();

    view! {
        <div class="app-container">
            <Sidebar />
            <ChatArea />
            <div class="panel-column">
                {move || {
                    state.canvas_panel.with(|p| p.is_open()).then(|| view! { <CanvasPanelView /> })
                }}
                {move || {
                    state.graph_panel.with(|p| p.is_open()).then(|| view! { <GraphPanelView /> })
                }}
            </div>
        </div>
    }
}

fn main() {
    console_log::init_with_level(log::Level::Debug).expect("Failed to init logger");
    mount_to_body(App);
}
