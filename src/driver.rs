//! Async driver: runs a [`SequenceEngine`] against the terminal and
//! executes driver-script commands on it.

use crate::command::{Clock, Context, DriverCommand};
use crate::commands::Advance;
use crate::config::Timing;
use crate::engine::{EngineState, SequenceEngine};
use crate::host::Host;
use crate::parser::parse_str;
use crate::terminal::{OutputHandler, TerminalSurface, VirtualControls, stdout_handler};
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::time::{Instant, sleep};
use tracing::{debug, warn};

/// How long the interactive loop sleeps when no timer is pending.
const IDLE_POLL: Duration = Duration::from_millis(50);

/// Owns the engine, the terminal surface and the virtual controls, and keeps
/// engine time moving while commands run.
pub struct Driver {
    ctx: Context,
}

impl Driver {
    /// A driver printing to stdout.
    pub fn stdout() -> Self {
        Self::build(stdout_handler())
    }

    /// A driver whose output goes to `handler` instead of stdout.
    pub fn with_handler<F>(handler: F) -> Self
    where
        F: Fn(&[u8]) + Send + Sync + 'static,
    {
        Self::build(Arc::new(handler))
    }

    fn build(output: OutputHandler) -> Self {
        let surface = Arc::new(TerminalSurface::with_handler(output.clone()));
        let controls = Arc::new(VirtualControls::with_handler(output.clone()));
        let engine = SequenceEngine::new(Host::with_surface(surface.clone(), controls.clone()));
        Self {
            ctx: Context {
                engine,
                surface,
                controls,
                output,
                clock: Clock::Realtime {
                    synced: Instant::now(),
                },
            },
        }
    }

    /// Switch to virtual time: waits complete immediately and timers fire
    /// in order without sleeping.
    pub fn instant(mut self) -> Self {
        self.ctx.clock = Clock::Virtual;
        self
    }

    pub fn with_timing(mut self, timing: Timing) -> Self {
        self.ctx.engine.set_timing(timing);
        self
    }

    pub fn engine(&mut self) -> &mut SequenceEngine {
        self.ctx.engine()
    }

    pub fn context(&mut self) -> &mut Context {
        &mut self.ctx
    }

    pub fn surface(&self) -> &TerminalSurface {
        self.ctx.surface()
    }

    pub fn controls(&self) -> &VirtualControls {
        self.ctx.controls()
    }

    /// Execute a sequence of commands in order.
    pub async fn execute(&mut self, commands: Vec<Box<dyn DriverCommand>>) -> Result<()> {
        for cmd in commands {
            debug!(command = cmd.name(), "executing");
            self.ctx.sync();
            cmd.execute(&mut self.ctx).await?;
            self.ctx.sync();
        }
        Ok(())
    }

    /// In instant mode, fire every pending timer until the engine is
    /// waiting on the user (or done).
    pub fn settle(&mut self) {
        while let Some(next) = self.ctx.engine.next_timer_in() {
            self.ctx.engine.advance_clock(next);
        }
    }

    /// Read driver commands line by line from `input` while the engine runs.
    /// An empty line is an `advance`. Returns when the input ends or the
    /// sequence completes.
    ///
    /// A line that fails to parse or execute is reported and skipped.
    pub async fn interactive<R>(&mut self, input: R) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = input.lines();
        loop {
            if self.ctx.engine.state() == EngineState::Complete {
                break;
            }
            let line = if self.ctx.is_instant() {
                self.settle();
                lines.next_line().await?
            } else {
                let wait = self.ctx.engine.next_timer_in().unwrap_or(IDLE_POLL);
                tokio::select! {
                    line = lines.next_line() => line?,
                    _ = sleep(wait) => {
                        self.ctx.sync();
                        continue;
                    }
                }
            };
            let Some(line) = line else {
                break;
            };

            let line = line.trim();
            let commands = if line.is_empty() {
                vec![Box::new(Advance) as Box<dyn DriverCommand>]
            } else {
                match parse_str(line) {
                    Ok(commands) => commands,
                    Err(e) => {
                        warn!(error = %format!("{e:#}"), "ignoring input line");
                        continue;
                    }
                }
            };
            if let Err(e) = self.execute(commands).await {
                warn!(error = %format!("{e:#}"), "command failed");
            }
        }
        Ok(())
    }
}
