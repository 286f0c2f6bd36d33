//! Typewriter reveal of step text.
//!
//! A render reveals one character per tick. A `<...>` span is revealed
//! whole in a single tick with no delay after it, so embedded markup never
//! shows up half-typed.

use crate::config::Timing;
use crate::host::ContentSink;
use crate::scheduler::{Scheduler, Timer, TimerId};
use std::time::Duration;

/// Result of one reveal tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Tick {
    /// Content grew; the next tick is due after `delay`.
    Revealed { delay: Duration },
    /// Everything was already revealed; the render is complete.
    Finished,
}

#[derive(Debug, Default)]
pub(crate) struct TypewriterRenderer {
    text: String,
    /// Byte offset of the first unrevealed character.
    cursor: usize,
    typing: bool,
    timer: Option<TimerId>,
}

impl TypewriterRenderer {
    pub(crate) fn is_typing(&self) -> bool {
        self.typing
    }

    /// Start rendering `text`. The first unit is revealed immediately.
    ///
    /// Returns true if the render finished synchronously (empty text).
    pub(crate) fn render(
        &mut self,
        text: &str,
        timing: &Timing,
        scheduler: &mut Scheduler,
        sink: &dyn ContentSink,
    ) -> bool {
        self.cancel(scheduler);
        self.text = text.to_string();
        self.cursor = 0;
        self.typing = true;
        if text.is_empty() {
            sink.set_content("");
        }
        self.on_timer(timing, scheduler, sink)
    }

    /// Handle a typewriter tick. Returns true when the render has just completed.
    pub(crate) fn on_timer(
        &mut self,
        timing: &Timing,
        scheduler: &mut Scheduler,
        sink: &dyn ContentSink,
    ) -> bool {
        self.timer = None;
        if !self.typing {
            return false;
        }
        match self.tick(timing, sink) {
            Tick::Revealed { delay } => {
                self.timer = Some(scheduler.schedule(delay, Timer::Typewriter));
                false
            }
            Tick::Finished => {
                self.typing = false;
                true
            }
        }
    }

    /// Fast-forward: show the full text now. Leaves the same state as a
    /// natural finish. Returns true if a render was actually in progress.
    pub(crate) fn complete_now(&mut self, scheduler: &mut Scheduler, sink: &dyn ContentSink) -> bool {
        if !self.typing {
            return false;
        }
        self.cancel(scheduler);
        self.cursor = self.text.len();
        self.typing = false;
        sink.set_content(&self.text);
        true
    }

    /// Stop the pending reveal without touching the sink.
    pub(crate) fn cancel(&mut self, scheduler: &mut Scheduler) {
        if let Some(timer) = self.timer.take() {
            scheduler.cancel(timer);
        }
        self.typing = false;
    }

    fn tick(&mut self, timing: &Timing, sink: &dyn ContentSink) -> Tick {
        let rest = &self.text[self.cursor..];
        let Some(ch) = rest.chars().next() else {
            return Tick::Finished;
        };

        if ch == '<' {
            if let Some(close) = rest.find('>') {
                self.cursor += close + 1;
                sink.set_content(&self.text[..self.cursor]);
                return Tick::Revealed {
                    delay: Duration::ZERO,
                };
            }
        }

        self.cursor += ch.len_utf8();
        sink.set_content(&self.text[..self.cursor]);
        Tick::Revealed {
            delay: timing.delay_after(ch),
        }
    }
}
