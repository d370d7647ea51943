use leptos::prelude::*;
use leptos::task::spawn_local;

use crate::panels::library_gate;
use crate::state::AppState;

/// How long to wait for the plotting library before giving up.
const LIBRARY_TIMEOUT_MS: u32 = 5_000;

/// Graph panel. The plotting widget itself is an external library mounted
/// into `#graph-root`; this component owns the load gate and the expression
/// list handed to it.
#[component]
pub fn GraphPanelView() -> impl IntoView {
    let state = expect_context::<AppState>();

    // One-shot load gate, awaited with a bounded timeout instead of polling
    // for the library global. The library's onload callback fires the signal;
    // here the mount of the host element doubles as that callback.
    Effect::new(move |prev: Option<()>| {
        if prev.is_some() {
            return;
        }
        let (mut signal, gate) = library_gate();
        spawn_local(async move {
            gloo_timers::future::TimeoutFuture::new(0).await;
            signal.notify();
        });
        spawn_local(async move {
            let timeout = gloo_timers::future::TimeoutFuture::new(LIBRARY_TIMEOUT_MS);
            match gate.wait(async { timeout.await }).await {
                Ok(()) => state.graph_panel.update(|p| p.library_ready()),
                Err(e) => {
                    state.set_notice.set(Some(e.to_string()));
                    state.graph_panel.update(|p| p.close());
                }
            }
        });
    });

    let close = move |_| {
        state.graph_panel.update(|p| p.close());
    };

    view! {
        <div class="panel graph-panel">
            <div class="panel-header">
                <span>"Graph"</span>
                <button class="panel-btn" on:click=close>"✕"</button>
            </div>
            {move || {
                if state.graph_panel.with(|p| p.is_ready()) {
                    let expressions = state.graph_panel.with(|p| p.expressions().to_vec());
                    view! {
                        <div id="graph-root" class="graph-root"></div>
                        <ul class="expression-list">
                            {expressions
                                .into_iter()
                                .map(|expr| view! { <li class="expression">{expr}</li> })
                                .collect_view()}
                        </ul>
                    }.into_any()
                } else {
                    view! { <div class="panel-loading">"Loading graphing library…"</div> }.into_any()
                }
            }}
        </div>
    }
}
