use std::rc::Rc;

use futures::channel::oneshot;
use futures::future::{select, Either};
use futures::pin_mut;
use futures::Future;

/// Capability handed to the chat flow by the canvas widget once it has
/// mounted. Returns the current drawing as a PNG data URL, or `None` when the
/// underlying element cannot produce one.
pub trait SnapshotProvider {
    fn snapshot(&self) -> Option<String>;
}

#[derive(Clone, Debug, PartialEq)]
pub enum PanelError {
    /// The panel is open but the widget has not finished mounting; the
    /// submission is soft-blocked with a retry notice.
    NotReady,
    LibraryLoadTimeout,
}

impl std::fmt::Display for PanelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PanelError::NotReady => {
                write!(f, "The canvas is still getting ready, try sending again in a moment")
            }
            PanelError::LibraryLoadTimeout => {
                write!(f, "The graphing library took too long to load")
            }
        }
    }
}

/// Canvas panel: `Closed → Open(no provider) → Open(provider ready)`.
#[derive(Clone, Default)]
pub enum CanvasPanel {
    #[default]
    Closed,
    Open {
        provider: Option<Rc<dyn SnapshotProvider>>,
    },
}

impl CanvasPanel {
    pub fn open(&mut self) {
        if matches!(self, CanvasPanel::Closed) {
            *self = CanvasPanel::Open { provider: None };
        }
    }

    pub fn close(&mut self) {
        *self = CanvasPanel::Closed;
    }

    pub fn is_open(&self) -> bool {
        matches!(self, CanvasPanel::Open { .. })
    }

    /// Called by the canvas widget once it has mounted.
    pub fn register(&mut self, provider: Rc<dyn SnapshotProvider>) {
        if let CanvasPanel::Open { provider: slot } = self {
            *slot = Some(provider);
        }
    }

    /// Pulls the current drawing for submission. A closed panel contributes
    /// no snapshot; an open panel without a ready provider blocks submission.
    pub fn snapshot(&self) -> Result<Option<String>, PanelError> {
        match self {
            CanvasPanel::Closed => Ok(None),
            CanvasPanel::Open { provider: None } => Err(PanelError::NotReady),
            CanvasPanel::Open { provider: Some(p) } => {
                p.snapshot().map(Some).ok_or(PanelError::NotReady)
            }
        }
    }
}

/// Graph panel: `Closed → LoadingLibrary → Ready(blank) → Ready(plotted)`.
/// Expressions arriving before the plotting library is ready are held and
/// applied on the ready transition.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum GraphPanel {
    #[default]
    Closed,
    LoadingLibrary {
        pending: Vec<String>,
    },
    Ready {
        expressions: Vec<String>,
    },
}

impl GraphPanel {
    pub fn open(&mut self) {
        if matches!(self, GraphPanel::Closed) {
            *self = GraphPanel::LoadingLibrary { pending: Vec::new() };
        }
    }

    pub fn close(&mut self) {
        *self = GraphPanel::Closed;
    }

    pub fn is_open(&self) -> bool {
        !matches!(self, GraphPanel::Closed)
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, GraphPanel::Ready { .. })
    }

    /// Fired by the plotting library's one-shot load signal.
    pub fn library_ready(&mut self) {
        if let GraphPanel::LoadingLibrary { pending } = self {
            *self = GraphPanel::Ready { expressions: std::mem::take(pending) };
        }
    }

    /// Replaces the entire plotted set. Blank-then-set, never a merge, so
    /// stale expressions from a prior reply cannot survive a new one.
    pub fn set_expressions(&mut self, exprs: Vec<String>) {
        match self {
            GraphPanel::Closed => {
                // Auto-open on a graph-bearing reply.
                *self = GraphPanel::LoadingLibrary { pending: exprs };
            }
            GraphPanel::LoadingLibrary { pending } => *pending = exprs,
            GraphPanel::Ready { expressions } => *expressions = exprs,
        }
    }

    pub fn expressions(&self) -> &[String] {
        match self {
            GraphPanel::Ready { expressions } => expressions,
            _ => &[],
        }
    }
}

/// One-shot "library loaded" signal. The widget fires [`LibrarySignal`] from
/// the external library's onload callback; the orchestrator awaits the gate
/// with a bounded timeout instead of polling.
pub fn library_gate() -> (LibrarySignal, LibraryGate) {
    let (tx, rx) = oneshot::channel();
    (LibrarySignal { tx: Some(tx) }, LibraryGate { rx })
}

pub struct LibrarySignal {
    tx: Option<oneshot::Sender<()>>,
}

impl LibrarySignal {
    pub fn notify(&mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(());
        }
    }
}

pub struct LibraryGate {
    rx: oneshot::Receiver<()>,
}

impl LibraryGate {
    /// Resolves when the library signals readiness, or with
    /// [`PanelError::LibraryLoadTimeout`] once `timeout` completes first.
    pub async fn wait(self, timeout: impl Future<Output = ()>) -> Result<(), PanelError> {
        let rx = self.rx;
        pin_mut!(rx);
        pin_mut!(timeout);
        match select(rx, timeout).await {
            Either::Left((Ok(()), _)) => Ok(()),
            // A dropped signal can never become ready.
            Either::Left((Err(_), _)) => Err(PanelError::LibraryLoadTimeout),
            Either::Right(((), _)) => Err(PanelError::LibraryLoadTimeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedSnapshot(&'static str);

    impl SnapshotProvider for FixedSnapshot {
        fn snapshot(&self) -> Option<String> {
            Some(self.0.to_string())
        }
    }

    struct FailingSnapshot;

    impl SnapshotProvider for FailingSnapshot {
        fn snapshot(&self) -> Option<String> {
            None
        }
    }

    #[test]
    fn closed_canvas_contributes_no_snapshot() {
        let panel = CanvasPanel::default();
        assert_eq!(panel.snapshot().unwrap(), None);
    }

    #[test]
    fn open_canvas_without_provider_blocks_submission() {
        let mut panel = CanvasPanel::default();
        panel.open();
        assert_eq!(panel.snapshot().unwrap_err(), PanelError::NotReady);
    }

    #[test]
    fn registered_provider_supplies_the_snapshot() {
        let mut panel = CanvasPanel::default();
        panel.open();
        panel.register(Rc::new(FixedSnapshot("data:image/png;base64,abcd")));
        assert_eq!(
            panel.snapshot().unwrap().as_deref(),
            Some("data:image/png;base64,abcd")
        );
    }

    #[test]
    fn provider_failure_reads_as_not_ready() {
        let mut panel = CanvasPanel::default();
        panel.open();
        panel.register(Rc::new(FailingSnapshot));
        assert_eq!(panel.snapshot().unwrap_err(), PanelError::NotReady);
    }

    #[test]
    fn closing_discards_the_provider() {
        let mut panel = CanvasPanel::default();
        panel.open();
        panel.register(Rc::new(FixedSnapshot("x")));
        panel.close();
        panel.open();
        assert_eq!(panel.snapshot().unwrap_err(), PanelError::NotReady);
    }

    #[test]
    fn graph_panel_walks_the_full_sequence() {
        let mut panel = GraphPanel::default();
        assert!(!panel.is_open());
        panel.open();
        assert!(panel.is_open());
        assert!(!panel.is_ready());
        panel.library_ready();
        assert!(panel.is_ready());
        assert!(panel.expressions().is_empty());
        panel.set_expressions(vec!["y=x^2".into()]);
        assert_eq!(panel.expressions(), ["y=x^2".to_string()]);
    }

    #[test]
    fn expressions_replace_never_merge() {
        let mut panel = GraphPanel::default();
        panel.open();
        panel.library_ready();
        panel.set_expressions(vec!["y=x".into(), "y=2x".into()]);
        panel.set_expressions(vec!["y=sin(x)".into()]);
        assert_eq!(panel.expressions(), ["y=sin(x)".to_string()]);
    }

    #[test]
    fn expressions_arriving_before_ready_are_applied_on_ready() {
        let mut panel = GraphPanel::default();
        panel.set_expressions(vec!["y=x^2".into()]);
        // Auto-opened into the loading state.
        assert!(panel.is_open());
        assert!(panel.expressions().is_empty());
        panel.library_ready();
        assert_eq!(panel.expressions(), ["y=x^2".to_string()]);
    }

    #[test]
    fn gate_resolves_when_signalled_first() {
        let (mut signal, gate) = library_gate();
        signal.notify();
        let result = futures::executor::block_on(gate.wait(futures::future::pending()));
        assert_eq!(result, Ok(()));
    }

    #[test]
    fn gate_times_out_without_a_signal() {
        let (_signal, gate) = library_gate();
        let result = futures::executor::block_on(gate.wait(futures::future::ready(())));
        assert_eq!(result, Err(PanelError::LibraryLoadTimeout));
    }

    #[test]
    fn dropped_signal_is_a_timeout() {
        let (signal, gate) = library_gate();
        drop(signal);
        let result = futures::executor::block_on(gate.wait(futures::future::pending()));
        assert_eq!(result, Err(PanelError::LibraryLoadTimeout));
    }

    #[test]
    fn notify_is_idempotent() {
        let (mut signal, gate) = library_gate();
        signal.notify();
        signal.notify();
        let result = futures::executor::block_on(gate.wait(futures::future::pending()));
        assert_eq!(result, Ok(()));
    }
}
