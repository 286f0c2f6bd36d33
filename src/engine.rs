//! The sequencing state machine.
//!
//! [`SequenceEngine`] owns the step list, the current position, the
//! typewriter and the active gate. Exactly one advance mechanism is live per
//! step: either the user's generic advance ([`SequenceEngine::request_advance`])
//! or the step's gate, never both.
//!
//! The engine is single-threaded and never sleeps. Time moves only through
//! [`SequenceEngine::advance_clock`], and control callbacks are queued and
//! drained by [`SequenceEngine::process_signals`]; see [`crate::driver`] for
//! an async loop that maps real time onto both.

use crate::config::Timing;
use crate::definitions::{DefinitionSource, Definitions};
use crate::error::WalkthroughError;
use crate::gate::{GateController, GateCx, Installed, Satisfied};
use crate::highlight::HighlightManager;
use crate::host::{Host, Signal};
use crate::scheduler::{Scheduler, Timer, TimerId};
use crate::step::{ActionSpec, Step};
use crate::typewriter::TypewriterRenderer;
use std::time::Duration;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::{debug, error, info, warn};

/// Where the state machine is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// No sequence loaded yet.
    Idle,
    /// The current step's text is being revealed.
    Typing,
    /// Text fully shown, no gate: a generic advance moves on.
    Ready,
    /// A gate is installed and only its condition can move on.
    AwaitingGate,
    /// The gate was satisfied; waiting out its post-delay.
    PostGateDelay,
    /// The last step was passed; the surface is closed.
    Complete,
}

/// What a [`SequenceEngine::request_advance`] call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceOutcome {
    /// Typing was in progress and has been completed; the step is unchanged.
    FastForwarded,
    /// Moved to the next step (or completed the sequence).
    Advanced,
    /// Nothing happened.
    Ignored(IgnoreReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The current step's gate decides when to move on.
    GateActive,
    /// No sequence is running.
    NotRunning,
    /// Too soon after the previous advance.
    Debounced,
}

macro_rules! gate_cx {
    ($engine:ident) => {
        GateCx {
            host: &$engine.host,
            scheduler: &mut $engine.scheduler,
            highlight: &mut $engine.highlight,
            signals: &$engine.signal_tx,
        }
    };
}

/// Drives a walkthrough over a [`Host`].
pub struct SequenceEngine {
    host: Host,
    definitions: Definitions,
    timing: Timing,

    key: Option<String>,
    steps: Vec<Step>,
    position: usize,
    state: EngineState,
    /// Bumped on every step entry; auto-advance timers carry it.
    epoch: u64,
    auto_advance: Vec<TimerId>,
    last_advance: Option<Duration>,
    last_error: Option<WalkthroughError>,

    scheduler: Scheduler,
    renderer: TypewriterRenderer,
    gates: GateController,
    highlight: HighlightManager,
    signal_tx: UnboundedSender<Signal>,
    signal_rx: UnboundedReceiver<Signal>,
}

impl SequenceEngine {
    pub fn new(host: Host) -> Self {
        Self::with_definitions(host, Definitions::default())
    }

    pub fn with_definitions(host: Host, definitions: Definitions) -> Self {
        let (signal_tx, signal_rx) = unbounded_channel();
        Self {
            host,
            definitions,
            timing: Timing::default(),
            key: None,
            steps: Vec::new(),
            position: 0,
            state: EngineState::Idle,
            epoch: 0,
            auto_advance: Vec::new(),
            last_advance: None,
            last_error: None,
            scheduler: Scheduler::default(),
            renderer: TypewriterRenderer::default(),
            gates: GateController::default(),
            highlight: HighlightManager::default(),
            signal_tx,
            signal_rx,
        }
    }

    // ---- configuration -------------------------------------------------

    pub fn set_typing_speed(&mut self, speed: Duration) {
        self.timing.typing_speed = speed;
    }

    pub fn set_punctuation_pause(&mut self, pause: Duration) {
        self.timing.punctuation_pause = pause;
    }

    pub fn set_advance_debounce(&mut self, debounce: Duration) {
        self.timing.advance_debounce = debounce;
    }

    pub fn set_timing(&mut self, timing: Timing) {
        self.timing = timing;
    }

    pub fn timing(&self) -> Timing {
        self.timing
    }

    /// Replace the known sequences. On failure the previous definitions are
    /// kept and the error is logged; returns whether the load succeeded.
    pub fn load_definitions(&mut self, source: &DefinitionSource) -> bool {
        match self.try_load_definitions(source) {
            Ok(()) => true,
            Err(e) => {
                error!(error = %e, "failed to load definitions");
                self.last_error = Some(e);
                false
            }
        }
    }

    pub fn try_load_definitions(&mut self, source: &DefinitionSource) -> Result<(), WalkthroughError> {
        let definitions = Definitions::load(source)?;
        info!(%source, sequences = definitions.keys().count(), "definitions loaded");
        self.definitions = definitions;
        Ok(())
    }

    pub fn definitions(&self) -> &Definitions {
        &self.definitions
    }

    // ---- control surface -----------------------------------------------

    /// Start the sequence stored under `key` from its first step, tearing
    /// down whatever the previous sequence left behind. An unknown key
    /// yields an empty sequence, which completes immediately.
    pub fn load_sequence(&mut self, key: &str) {
        let steps = match self.definitions.get(key) {
            Some(steps) => steps.to_vec(),
            None => {
                warn!(%key, "unknown sequence key");
                Vec::new()
            }
        };
        self.key = Some(key.to_string());
        self.start(steps);
    }

    /// Start an ad-hoc list of steps, with the same reset as [`load_sequence`](Self::load_sequence).
    pub fn load_steps(&mut self, steps: Vec<Step>) {
        self.key = None;
        self.start(steps);
    }

    /// The generic "proceed" signal.
    ///
    /// While typing this fast-forwards the render. With the text shown and
    /// no gate it moves to the next step. While a gate is installed it is
    /// ignored: only the gate's own event or timer can move on.
    pub fn request_advance(&mut self) -> AdvanceOutcome {
        let now = self.scheduler.now();
        let debounce = self.timing.advance_debounce;
        if !debounce.is_zero()
            && self
                .last_advance
                .is_some_and(|last| now.saturating_sub(last) < debounce)
        {
            debug!("advance debounced");
            return AdvanceOutcome::Ignored(IgnoreReason::Debounced);
        }

        let outcome = match self.state {
            EngineState::Idle | EngineState::Complete => {
                AdvanceOutcome::Ignored(IgnoreReason::NotRunning)
            }
            EngineState::AwaitingGate | EngineState::PostGateDelay => {
                debug!(position = self.position, "waiting for required action");
                AdvanceOutcome::Ignored(IgnoreReason::GateActive)
            }
            EngineState::Typing => {
                self.complete_typing();
                AdvanceOutcome::FastForwarded
            }
            EngineState::Ready => {
                self.next_step();
                AdvanceOutcome::Advanced
            }
        };
        if !matches!(outcome, AdvanceOutcome::Ignored(_)) {
            self.last_advance = Some(now);
        }
        outcome
    }

    /// Show the current step's full text now. Same end state as letting the
    /// render finish on its own; a no-op when nothing is being typed.
    pub fn complete_typing(&mut self) {
        if self
            .renderer
            .complete_now(&mut self.scheduler, self.host.content.as_ref())
        {
            self.on_typing_complete();
        }
    }

    // ---- time and events -----------------------------------------------

    /// Move the virtual clock forward by `by`, firing every timer that
    /// falls due (in deadline order) and draining queued control signals.
    pub fn advance_clock(&mut self, by: Duration) {
        let until = self.scheduler.now().saturating_add(by);
        self.process_signals();
        while let Some(timer) = self.scheduler.pop_due(until) {
            self.fire(timer);
            self.process_signals();
        }
        self.scheduler.settle(until);
    }

    /// Delay until the next pending timer, if any.
    pub fn next_timer_in(&self) -> Option<Duration> {
        self.scheduler.next_in()
    }

    /// Handle control callbacks queued since the last call.
    pub fn process_signals(&mut self) {
        while let Ok(signal) = self.signal_rx.try_recv() {
            let satisfied = self.gates.on_signal(signal, &mut gate_cx!(self));
            if let Some(satisfied) = satisfied {
                self.on_gate_satisfied(satisfied);
            }
        }
        self.gates.forget_released();
    }

    // ---- inspection ----------------------------------------------------

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn current_key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn current_step(&self) -> Option<&Step> {
        self.steps.get(self.position)
    }

    pub fn is_typing(&self) -> bool {
        self.renderer.is_typing()
    }

    pub fn is_gate_active(&self) -> bool {
        self.gates.is_active()
    }

    pub fn in_post_gate_delay(&self) -> bool {
        self.gates.in_post_delay()
    }

    pub fn is_highlight_active(&self) -> bool {
        self.highlight.is_active()
    }

    /// Time on the engine's virtual clock.
    pub fn elapsed(&self) -> Duration {
        self.scheduler.now()
    }

    pub fn pending_timers(&self) -> usize {
        self.scheduler.pending()
    }

    /// The most recent non-fatal error (missing target, failed load).
    pub fn last_error(&self) -> Option<&WalkthroughError> {
        self.last_error.as_ref()
    }

    pub fn take_last_error(&mut self) -> Option<WalkthroughError> {
        self.last_error.take()
    }

    // ---- transitions ---------------------------------------------------

    fn start(&mut self, steps: Vec<Step>) {
        self.renderer.cancel(&mut self.scheduler);
        self.leave_step();
        self.steps = steps;
        self.position = 0;
        self.last_advance = None;
        info!(key = ?self.key, steps = self.steps.len(), "sequence loaded");
        self.enter_step();
    }

    fn enter_step(&mut self) {
        if self.position >= self.steps.len() {
            self.finish();
            return;
        }

        self.epoch += 1;
        self.state = EngineState::Typing;
        self.host.indicator.hide();
        self.host
            .progress
            .set_progress(self.position + 1, self.steps.len());
        if !self.host.presentation.is_open() {
            self.host.presentation.show();
        }

        let step = &self.steps[self.position];
        debug!(position = self.position, actions = step.actions.len(), "entering step");
        for action in &step.actions {
            if let ActionSpec::AutoAdvance { duration } = action {
                let timer = self
                    .scheduler
                    .schedule(*duration, Timer::AutoAdvance { epoch: self.epoch });
                self.auto_advance.push(timer);
            }
        }

        let finished = self.renderer.render(
            &step.text,
            &self.timing,
            &mut self.scheduler,
            self.host.content.as_ref(),
        );
        if finished {
            self.on_typing_complete();
        }
    }

    /// Tear down everything scoped to the current step.
    fn leave_step(&mut self) {
        self.gates.teardown(&mut gate_cx!(self));
        self.highlight.clear(self.host.overlay.as_ref());
        for timer in self.auto_advance.drain(..) {
            self.scheduler.cancel(timer);
        }
    }

    fn next_step(&mut self) {
        self.renderer.cancel(&mut self.scheduler);
        self.leave_step();
        self.position += 1;
        self.enter_step();
    }

    fn finish(&mut self) {
        self.renderer.cancel(&mut self.scheduler);
        self.leave_step();
        self.state = EngineState::Complete;
        self.host.indicator.hide();
        if self.host.presentation.is_open() {
            self.host.presentation.close();
        }
        info!(key = ?self.key, "sequence complete");
    }

    /// Typing finished (naturally or fast-forwarded): show the indicator and
    /// install the step's gate.
    fn on_typing_complete(&mut self) {
        let Some(step) = self.steps.get(self.position) else {
            return;
        };
        let actions: Vec<ActionSpec> = step
            .actions
            .iter()
            .filter(|a| !matches!(a, ActionSpec::AutoAdvance { .. }))
            .cloned()
            .collect();
        if !step.has_click_gate() {
            self.host.indicator.show();
        }

        self.state = EngineState::Ready;
        for action in &actions {
            match self.gates.install(action, &mut gate_cx!(self)) {
                Ok(Installed::Gate) => debug!(action = action.name(), "gate installed"),
                Ok(Installed::Passive | Installed::Skipped) => {}
                Err(e) => {
                    warn!(action = action.name(), error = %e, "gate not installed");
                    self.last_error = Some(e);
                }
            }
        }
        if self.gates.is_active() {
            self.state = EngineState::AwaitingGate;
        }
    }

    fn on_gate_satisfied(&mut self, satisfied: Satisfied) {
        match satisfied {
            Satisfied::Advance => self.next_step(),
            Satisfied::Delaying { hides_surface } => {
                self.state = EngineState::PostGateDelay;
                if hides_surface && self.host.presentation.is_open() {
                    self.host.presentation.close();
                }
            }
        }
    }

    fn fire(&mut self, timer: Timer) {
        match timer {
            Timer::Typewriter => {
                let finished = self.renderer.on_timer(
                    &self.timing,
                    &mut self.scheduler,
                    self.host.content.as_ref(),
                );
                if finished {
                    self.on_typing_complete();
                }
            }
            Timer::Gate(_) | Timer::PostGate(_) => {
                let satisfied = self.gates.on_timer(timer, &mut gate_cx!(self));
                if let Some(satisfied) = satisfied {
                    self.on_gate_satisfied(satisfied);
                }
            }
            Timer::AutoAdvance { epoch } => {
                if epoch != self.epoch {
                    return;
                }
                if self.state == EngineState::Ready {
                    debug!(position = self.position, "auto-advance");
                    self.next_step();
                } else {
                    debug!(state = ?self.state, "auto-advance skipped");
                }
            }
        }
    }
}
