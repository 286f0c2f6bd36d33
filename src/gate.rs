//! Gate installation and teardown.
//!
//! A gate blocks generic advance requests until its own condition is met: a
//! click on a control, a matching input value, or a timer. At most one gate
//! is active; [`GateController::teardown`] removes whatever is installed
//! (listeners, timers, highlight) and is safe to call repeatedly.

use crate::error::WalkthroughError;
use crate::highlight::HighlightManager;
use crate::host::{ControlHandle, GateId, Host, Listener, Notifier, Signal, SignalKind};
use crate::scheduler::{Scheduler, Timer, TimerId};
use crate::step::{ActionSpec, Expected};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

/// Everything a gate touches outside the controller itself.
pub(crate) struct GateCx<'a> {
    pub(crate) host: &'a Host,
    pub(crate) scheduler: &'a mut Scheduler,
    pub(crate) highlight: &'a mut HighlightManager,
    pub(crate) signals: &'a UnboundedSender<Signal>,
}

/// What [`GateController::install`] did with an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Installed {
    /// A blocking gate is now active.
    Gate,
    /// The action took effect without blocking advance.
    Passive,
    /// Another gate is already active; the action was dropped.
    Skipped,
}

/// Progress reported when a gate's condition is met.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Satisfied {
    /// Move to the next step now.
    Advance,
    /// Move on once the post-delay timer fires. Click gates keep the
    /// presentation surface out of the way while waiting.
    Delaying { hides_surface: bool },
}

enum GateState {
    Click {
        control: Arc<dyn ControlHandle>,
        listener: Listener,
        post_delay: Duration,
    },
    Input {
        control: Arc<dyn ControlHandle>,
        listener: Listener,
        expected: Expected,
        post_delay: Duration,
    },
    Timed {
        timer: TimerId,
        clears_highlight: bool,
    },
    PostDelay {
        timer: TimerId,
    },
    /// The target could not be found; nothing will ever satisfy this gate.
    Stalled,
}

struct ActiveGate {
    id: GateId,
    state: GateState,
}

#[derive(Default)]
pub(crate) struct GateController {
    active: Option<ActiveGate>,
    next_id: u64,
    /// Controls of click gates that are gone while their intercepted clicks
    /// may still be queued.
    released: Vec<(GateId, Arc<dyn ControlHandle>)>,
}

impl GateController {
    pub(crate) fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub(crate) fn in_post_delay(&self) -> bool {
        matches!(
            self.active,
            Some(ActiveGate {
                state: GateState::PostDelay { .. },
                ..
            })
        )
    }

    /// Apply `action`. Auto-advance is scheduled by the engine at step entry
    /// and is not handled here.
    pub(crate) fn install(
        &mut self,
        action: &ActionSpec,
        cx: &mut GateCx<'_>,
    ) -> Result<Installed, WalkthroughError> {
        if action.is_blocking() && self.active.is_some() {
            warn!(action = action.name(), "a gate is already active, skipping");
            return Ok(Installed::Skipped);
        }

        let id = GateId(self.next_id);
        self.next_id += 1;

        let state = match action {
            ActionSpec::WaitForClick { target, post_delay }
            | ActionSpec::WaitForClickAndReveal { target, post_delay } => {
                let control = self.locate_or_stall(id, target, cx)?;
                if matches!(action, ActionSpec::WaitForClickAndReveal { .. }) {
                    control.set_visible(true);
                }
                cx.highlight.highlight(control.clone(), cx.host.overlay.as_ref());
                // The panel would sit on top of the control.
                if cx.host.presentation.is_open() {
                    cx.host.presentation.close();
                }
                let listener = control.intercept_activation(self.notifier(id, SignalKind::Activated, cx));
                debug!(%target, "waiting for click");
                GateState::Click {
                    control,
                    listener,
                    post_delay: *post_delay,
                }
            }

            ActionSpec::WaitForInputMatch {
                target,
                expected,
                post_delay,
            } => {
                let control = self.locate_or_stall(id, target, cx)?;
                cx.highlight.highlight(control.clone(), cx.host.overlay.as_ref());
                let listener = control.observe_input(self.notifier(id, SignalKind::InputChanged, cx));
                debug!(%target, ?expected, "waiting for input");
                GateState::Input {
                    control,
                    listener,
                    expected: expected.clone(),
                    post_delay: *post_delay,
                }
            }

            ActionSpec::Delay { duration } => GateState::Timed {
                timer: cx.scheduler.schedule(*duration, Timer::Gate(id)),
                clears_highlight: false,
            },

            ActionSpec::Highlight { target, duration } => {
                if self.owns_highlight() {
                    warn!(%target, "the gate target holds the highlight, skipping");
                    return Ok(Installed::Skipped);
                }
                let control = locate(target, cx)?;
                cx.highlight.highlight(control, cx.host.overlay.as_ref());
                if duration.is_zero() {
                    return Ok(Installed::Passive);
                }
                GateState::Timed {
                    timer: cx.scheduler.schedule(*duration, Timer::Gate(id)),
                    clears_highlight: true,
                }
            }

            ActionSpec::RevealAndWait { target } => {
                locate(target, cx)?.set_visible(true);
                cx.host.indicator.show();
                return Ok(Installed::Passive);
            }

            ActionSpec::AutoAdvance { .. } => return Ok(Installed::Passive),
        };

        cx.host.indicator.hide();
        self.active = Some(ActiveGate { id, state });
        Ok(Installed::Gate)
    }

    /// Handle a queued control callback.
    pub(crate) fn on_signal(&mut self, signal: Signal, cx: &mut GateCx<'_>) -> Option<Satisfied> {
        let Some(active) = self.active.take_if(|active| active.id == signal.gate) else {
            self.replay_released(signal);
            return None;
        };

        match (active.state, signal.kind) {
            (
                GateState::Click {
                    control,
                    listener,
                    post_delay,
                },
                SignalKind::Activated,
            ) => {
                listener.detach();
                cx.highlight.clear(cx.host.overlay.as_ref());
                control.invoke_original();
                debug!(control = %control.describe(), "click gate satisfied");
                self.released.push((active.id, control));
                Some(self.satisfied(active.id, post_delay, true, cx))
            }

            (
                GateState::Input {
                    control,
                    listener,
                    expected,
                    post_delay,
                },
                SignalKind::InputChanged,
            ) => {
                let value = control.value();
                if !expected.matches(value.trim()) {
                    self.active = Some(ActiveGate {
                        id: active.id,
                        state: GateState::Input {
                            control,
                            listener,
                            expected,
                            post_delay,
                        },
                    });
                    return None;
                }
                listener.detach();
                cx.highlight.clear(cx.host.overlay.as_ref());
                debug!(control = %control.describe(), %value, "input gate satisfied");
                Some(self.satisfied(active.id, post_delay, false, cx))
            }

            (state, _) => {
                self.active = Some(ActiveGate {
                    id: active.id,
                    state,
                });
                self.replay_released(signal);
                None
            }
        }
    }

    /// A signal that no longer belongs to a listening gate. A click that was
    /// intercepted before its gate went away still runs the control's own
    /// behavior.
    fn replay_released(&self, signal: Signal) {
        let released = self
            .released
            .iter()
            .find(|(id, _)| *id == signal.gate)
            .filter(|_| signal.kind == SignalKind::Activated);
        match released {
            Some((_, control)) => {
                debug!(control = %control.describe(), "replaying click queued before release");
                control.invoke_original();
            }
            None => debug!(?signal, "stale signal"),
        }
    }

    /// Drop released controls once every queued signal has been handled.
    pub(crate) fn forget_released(&mut self) {
        self.released.clear();
    }

    /// Handle a gate or post-delay timer.
    pub(crate) fn on_timer(&mut self, timer: Timer, cx: &mut GateCx<'_>) -> Option<Satisfied> {
        let active = self.active.as_ref()?;
        let clears_highlight = match (timer, &active.state) {
            (Timer::Gate(id), GateState::Timed { clears_highlight, .. }) if id == active.id => {
                *clears_highlight
            }
            (Timer::PostGate(id), GateState::PostDelay { .. }) if id == active.id => false,
            _ => {
                debug!(?timer, "stale gate timer");
                return None;
            }
        };
        if clears_highlight {
            cx.highlight.clear(cx.host.overlay.as_ref());
        }
        self.active = None;
        Some(Satisfied::Advance)
    }

    /// Remove the active gate: detach listeners, cancel timers, clear the
    /// highlight. Idempotent.
    pub(crate) fn teardown(&mut self, cx: &mut GateCx<'_>) {
        if let Some(active) = self.active.take() {
            match active.state {
                GateState::Click { control, listener, .. } => {
                    listener.detach();
                    self.released.push((active.id, control));
                }
                GateState::Input { listener, .. } => {
                    listener.detach();
                }
                GateState::Timed { timer, .. } | GateState::PostDelay { timer } => {
                    cx.scheduler.cancel(timer);
                }
                GateState::Stalled => {}
            }
            debug!(gate = ?active.id, "gate torn down");
        }
        cx.highlight.clear(cx.host.overlay.as_ref());
    }

    fn satisfied(
        &mut self,
        id: GateId,
        post_delay: Duration,
        hides_surface: bool,
        cx: &mut GateCx<'_>,
    ) -> Satisfied {
        if post_delay.is_zero() {
            return Satisfied::Advance;
        }
        let timer = cx.scheduler.schedule(post_delay, Timer::PostGate(id));
        self.active = Some(ActiveGate {
            id,
            state: GateState::PostDelay { timer },
        });
        Satisfied::Delaying { hides_surface }
    }

    fn owns_highlight(&self) -> bool {
        matches!(
            self.active,
            Some(ActiveGate {
                state: GateState::Click { .. } | GateState::Input { .. },
                ..
            })
        )
    }

    fn notifier(&self, id: GateId, kind: SignalKind, cx: &GateCx<'_>) -> Notifier {
        Notifier::new(cx.signals.clone(), Signal { gate: id, kind })
    }

    /// Resolve a blocking gate's target. A miss leaves a stalled gate behind
    /// so generic advance stays blocked.
    fn locate_or_stall(
        &mut self,
        id: GateId,
        target: &str,
        cx: &GateCx<'_>,
    ) -> Result<Arc<dyn ControlHandle>, WalkthroughError> {
        locate(target, cx).inspect_err(|_| {
            self.active = Some(ActiveGate {
                id,
                state: GateState::Stalled,
            });
        })
    }
}

fn locate(target: &str, cx: &GateCx<'_>) -> Result<Arc<dyn ControlHandle>, WalkthroughError> {
    cx.host
        .locator
        .find(target)
        .ok_or_else(|| WalkthroughError::TargetNotFound {
            selector: target.to_string(),
        })
}
