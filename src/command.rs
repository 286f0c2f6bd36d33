//! The [`DriverCommand`] trait and the [`Context`] type commands receive when executed.

use crate::engine::SequenceEngine;
use crate::terminal::{OutputHandler, TerminalSurface, VirtualControl, VirtualControls};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, sleep};

/// How engine time relates to wall-clock time.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Clock {
    /// Engine time follows the tokio clock.
    Realtime { synced: Instant },
    /// Engine time jumps straight to the next deadline; nothing sleeps.
    Virtual,
}

/// Execution context passed to [`DriverCommand::execute`].
///
/// Owns the [`SequenceEngine`] together with the terminal surface and the
/// virtual controls it was built over, and keeps engine time in step with
/// the driver's clock.
pub struct Context {
    pub(crate) engine: SequenceEngine,
    pub(crate) surface: Arc<TerminalSurface>,
    pub(crate) controls: Arc<VirtualControls>,
    pub(crate) output: OutputHandler,
    pub(crate) clock: Clock,
}

impl Context {
    /// Bring the engine clock up to date and hand out the engine.
    pub fn engine(&mut self) -> &mut SequenceEngine {
        self.sync();
        &mut self.engine
    }

    pub fn surface(&self) -> &TerminalSurface {
        &self.surface
    }

    pub fn controls(&self) -> &VirtualControls {
        &self.controls
    }

    /// Look up a declared control.
    pub fn control(&self, selector: &str) -> Result<Arc<VirtualControl>> {
        self.controls
            .get(selector)
            .ok_or_else(|| anyhow!("No control declared for selector: '{}'", selector))
    }

    /// Pass bytes through the output handler (e.g. to stdout or a custom sink).
    pub fn emit(&self, data: &[u8]) {
        (self.output)(data);
    }

    pub fn is_instant(&self) -> bool {
        matches!(self.clock, Clock::Virtual)
    }

    /// Feed elapsed wall-clock time into the engine and drain queued
    /// control signals. In instant mode only the signals are drained.
    pub fn sync(&mut self) {
        match &mut self.clock {
            Clock::Realtime { synced } => {
                let now = Instant::now();
                let elapsed = now - *synced;
                *synced = now;
                self.engine.advance_clock(elapsed);
            }
            Clock::Virtual => self.engine.process_signals(),
        }
    }

    /// Let `duration` of engine time pass, firing timers as they fall due.
    pub async fn run_for(&mut self, duration: Duration) {
        match self.clock {
            Clock::Virtual => self.engine.advance_clock(duration),
            Clock::Realtime { .. } => {
                // None: further out than the clock can represent.
                let deadline = Instant::now().checked_add(duration);
                loop {
                    self.sync();
                    let now = Instant::now();
                    let remaining = match deadline {
                        Some(deadline) if now >= deadline => break,
                        Some(deadline) => deadline - now,
                        None => Duration::MAX,
                    };
                    let step = self
                        .engine
                        .next_timer_in()
                        .map_or(remaining, |next| next.min(remaining));
                    sleep(step).await;
                }
            }
        }
    }

    /// Run the engine until the displayed content contains `text`, or until
    /// `timeout` of engine time has passed.
    pub async fn wait_for_content(&mut self, text: &str, timeout: Duration) -> Result<()> {
        let mut waited = Duration::ZERO;
        loop {
            self.sync();
            if self.surface.content().contains(text) {
                return Ok(());
            }
            if waited >= timeout {
                break;
            }
            let remaining = timeout - waited;
            let step = match (self.clock, self.engine.next_timer_in()) {
                (_, Some(next)) => next.min(remaining),
                // Nothing scheduled: in instant mode no amount of waiting helps.
                (Clock::Virtual, None) => break,
                (Clock::Realtime { .. }, None) => remaining.min(Duration::from_millis(10)),
            };
            self.run_for(step).await;
            waited += step;
        }
        Err(anyhow!(
            "Timeout waiting for content: '{}' (showing '{}')",
            text,
            self.surface.content()
        ))
    }
}

/// A single driver-script command.
///
/// Implement this trait to add a new command to the driver. Then:
///
/// 1. Define `pub const NAME: &'static str` on your struct: the script
///    keyword (e.g. `"click"`, `"expect"`) used by the parser.
/// 2. Re-export the struct from `src/commands/mod.rs`.
/// 3. Add one entry to the `REGISTRY` in [`crate::parser`]:
///    `(MyCmd::NAME, MyCmd::parse_boxed)`.
#[async_trait(?Send)]
pub trait DriverCommand: 'static {
    /// The command name, accessible at runtime through a trait object.
    fn name(&self) -> &'static str;

    /// Parse this command from the argument string (everything after the
    /// command keyword on the script line).
    fn parse(args: &str) -> Result<Self>
    where
        Self: Sized;

    /// Parse and box this command. Used as the function-pointer type stored in
    /// the command registry.
    fn parse_boxed(args: &str) -> Result<Box<dyn DriverCommand>>
    where
        Self: Sized,
    {
        Ok(Box::new(Self::parse(args)?))
    }

    async fn execute(&self, ctx: &mut Context) -> Result<()>;
}
