use std::rc::Rc;

use leptos::ev;
use leptos::html;
use leptos::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use crate::panels::SnapshotProvider;
use crate::state::AppState;

const CANVAS_WIDTH: u32 = 520;
const CANVAS_HEIGHT: u32 = 380;

/// Snapshot capability backed by the mounted canvas element. The chat flow
/// pulls a PNG data URL through this right before submission.
struct ElementSnapshot {
    canvas: HtmlCanvasElement,
}

impl SnapshotProvider for ElementSnapshot {
    fn snapshot(&self) -> Option<String> {
        self.canvas.to_data_url().ok()
    }
}

fn context_of(canvas: &HtmlCanvasElement) -> Option<CanvasRenderingContext2d> {
    canvas
        .get_context("2d")
        .ok()
        .flatten()?
        .dyn_into::<CanvasRenderingContext2d>()
        .ok()
}

/// Freehand drawing surface. Mention `@canvas` in a message to have the tutor
/// look at the current drawing.
#[component]
pub fn CanvasPanelView() -> impl IntoView {
    let state = expect_context::<AppState>();
    let canvas_ref: NodeRef<html::Canvas> = NodeRef::new();
    let drawing = RwSignal::new(false);

    // Once the element is attached, paint the background and hand the
    // snapshot capability to the panel state machine.
    Effect::new(move |_| {
        if let Some(canvas) = canvas_ref.get() {
            if let Some(ctx) = context_of(&canvas) {
                ctx.set_fill_style_str("#ffffff");
                ctx.fill_rect(0.0, 0.0, CANVAS_WIDTH as f64, CANVAS_HEIGHT as f64);
            }
            state
                .canvas_panel
                .update(|p| p.register(Rc::new(ElementSnapshot { canvas })));
        }
    });

    let on_pointer_down = move |ev: ev::PointerEvent| {
        let Some(canvas) = canvas_ref.get_untracked() else { return };
        let Some(ctx) = context_of(&canvas) else { return };
        ctx.set_stroke_style_str("#1a1a2e");
        ctx.set_line_width(2.5);
        ctx.set_line_cap("round");
        ctx.begin_path();
        ctx.move_to(ev.offset_x() as f64, ev.offset_y() as f64);
        drawing.set(true);
    };

    let on_pointer_move = move |ev: ev::PointerEvent| {
        if !drawing.get_untracked() {
            return;
        }
        let Some(canvas) = canvas_ref.get_untracked() else { return };
        let Some(ctx) = context_of(&canvas) else { return };
        ctx.line_to(ev.offset_x() as f64, ev.offset_y() as f64);
        ctx.stroke();
    };

    let stop_drawing = move |_: ev::PointerEvent| {
        drawing.set(false);
    };

    let clear = move |_| {
        let Some(canvas) = canvas_ref.get_untracked() else { return };
        let Some(ctx) = context_of(&canvas) else { return };
        ctx.set_fill_style_str("#ffffff");
        ctx.fill_rect(0.0, 0.0, CANVAS_WIDTH as f64, CANVAS_HEIGHT as f64);
    };

    let close = move |_| {
        state.canvas_panel.update(|p| p.close());
    };

    view! {
        <div class="panel canvas-panel">
            <div class="panel-header">
                <span>"Canvas"</span>
                <div>
                    <button class="panel-btn" on:click=clear>"Clear"</button>
                    <button class="panel-btn" on:click=close>"✕"</button>
                </div>
            </div>
            <canvas
                node_ref=canvas_ref
                width=CANVAS_WIDTH
                height=CANVAS_HEIGHT
                on:pointerdown=on_pointer_down
                on:pointermove=on_pointer_move
                on:pointerup=stop_drawing
                on:pointerleave=stop_drawing
            />
            <div class="panel-hint">"Include @canvas in your message to share this drawing"</div>
        </div>
    }
}
