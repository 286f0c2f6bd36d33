//! Collaborator capabilities the walkthrough drives, and the [`Host`] bundle
//! that hands them to the engine.
//!
//! Everything visual lives behind these traits: the engine never knows
//! whether it is talking to a terminal, a web page or a test double. All
//! methods take `&self`; implementations use interior mutability.

use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

/// Displays partially or fully revealed step text.
pub trait ContentSink: Send + Sync {
    fn set_content(&self, fragment: &str);
}

/// The panel hosting the current step's text.
pub trait PresentationSurface: Send + Sync {
    fn show(&self);
    fn close(&self);
    fn is_open(&self) -> bool;
}

/// The affordance inviting a generic advance.
pub trait IndicatorSurface: Send + Sync {
    fn show(&self);
    fn hide(&self);
}

/// The shared layer that de-emphasizes everything except the highlighted control.
pub trait OverlaySurface: Send + Sync {
    fn attach(&self);
    fn detach(&self);
}

/// Receives `Step n of m` progress updates.
pub trait ProgressSink: Send + Sync {
    fn set_progress(&self, current: usize, total: usize);
}

/// Resolves selectors to controls.
pub trait ControlLocator: Send + Sync {
    fn find(&self, selector: &str) -> Option<Arc<dyn ControlHandle>>;
}

/// An external control a gate can observe, highlight or reveal.
pub trait ControlHandle: Send + Sync {
    /// Current value, for input matching.
    fn value(&self) -> String;

    /// Route the control's activations to `notifier` instead of its own
    /// behavior until the returned [`Listener`] is dropped.
    fn intercept_activation(&self, notifier: Notifier) -> Listener;

    /// Call `notifier` on every value change until the listener is dropped.
    fn observe_input(&self, notifier: Notifier) -> Listener;

    /// Run the control's own activation behavior.
    fn invoke_original(&self);

    fn set_visible(&self, visible: bool);

    fn presentation(&self) -> Presentation;

    fn set_presentation(&self, presentation: Presentation);

    /// Short label for diagnostics.
    fn describe(&self) -> String {
        "<control>".to_string()
    }
}

/// The subset of a control's presentation a highlight overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Presentation {
    /// Stacking order hint.
    pub layer: Option<i32>,
    /// Positioning hint (e.g. `"relative"`).
    pub positioning: Option<String>,
    pub emphasized: bool,
}

/// Identifies one installed gate. Signals for a gate that is no longer
/// active are discarded, except intercepted clicks, which still reach the
/// control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GateId(pub(crate) u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    Activated,
    InputChanged,
}

/// A queued control callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signal {
    pub gate: GateId,
    pub kind: SignalKind,
}

/// Handed to a control so it can report events back to the engine.
///
/// Notifications are queued and processed by the engine on its own turn,
/// never re-entrantly.
#[derive(Clone)]
pub struct Notifier {
    tx: UnboundedSender<Signal>,
    signal: Signal,
}

impl Notifier {
    pub(crate) fn new(tx: UnboundedSender<Signal>, signal: Signal) -> Self {
        Self { tx, signal }
    }

    pub fn notify(&self) {
        // The engine owns the receiver; a send only fails once it is gone.
        let _ = self.tx.send(self.signal);
    }
}

impl fmt::Debug for Notifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier").field("signal", &self.signal).finish()
    }
}

/// Detach guard for a control subscription. Dropping it detaches.
pub struct Listener {
    detach: Option<Box<dyn FnOnce() + Send>>,
}

impl Listener {
    pub fn new(detach: impl FnOnce() + Send + 'static) -> Self {
        Self {
            detach: Some(Box::new(detach)),
        }
    }

    /// A listener with nothing to detach.
    pub fn noop() -> Self {
        Self { detach: None }
    }

    pub fn detach(mut self) {
        self.run_detach();
    }

    fn run_detach(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        self.run_detach();
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("attached", &self.detach.is_some())
            .finish()
    }
}

/// The collaborators a [`SequenceEngine`](crate::SequenceEngine) drives.
#[derive(Clone)]
pub struct Host {
    pub content: Arc<dyn ContentSink>,
    pub presentation: Arc<dyn PresentationSurface>,
    pub indicator: Arc<dyn IndicatorSurface>,
    pub overlay: Arc<dyn OverlaySurface>,
    pub progress: Arc<dyn ProgressSink>,
    pub locator: Arc<dyn ControlLocator>,
}

impl Host {
    /// Build a host from one surface implementing every visual capability.
    pub fn with_surface<S>(surface: Arc<S>, locator: Arc<dyn ControlLocator>) -> Self
    where
        S: ContentSink
            + PresentationSurface
            + IndicatorSurface
            + OverlaySurface
            + ProgressSink
            + 'static,
    {
        Self {
            content: surface.clone(),
            presentation: surface.clone(),
            indicator: surface.clone(),
            overlay: surface.clone(),
            progress: surface,
            locator,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_listener_detaches_once_on_drop() {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let listener = Listener::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        drop(listener);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_explicit_detach_does_not_repeat() {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        Listener::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        })
        .detach();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_notifier_queues_signal() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let signal = Signal {
            gate: GateId(7),
            kind: SignalKind::Activated,
        };
        let notifier = Notifier::new(tx, signal);
        notifier.notify();
        notifier.notify();
        assert_eq!(rx.try_recv().unwrap(), signal);
        assert_eq!(rx.try_recv().unwrap(), signal);
        assert!(rx.try_recv().is_err());
    }
}
