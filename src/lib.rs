//! # Walkthrough
//!
//! A sequencing engine for guided, step-by-step tutorials.
//!
//! A walkthrough is a named list of steps. Each step types out a short
//! message with a typewriter effect and may carry an action that decides how
//! the user gets to the next step: click a particular control, type a
//! matching value, wait out a delay, or simply press "next". While an action
//! is waiting, the generic "next" is ignored, so the user cannot skip past a
//! step they are meant to perform.
//!
//! ## Quick start
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use walkthrough::{
//!     ActionSpec, EngineState, Host, SequenceEngine, Step, TerminalSurface, VirtualControls,
//! };
//!
//! let surface = Arc::new(TerminalSurface::silent());
//! let controls = Arc::new(VirtualControls::new());
//! let button = controls.declare("#save", true);
//!
//! let mut engine = SequenceEngine::new(Host::with_surface(surface.clone(), controls.clone()));
//! engine.load_steps(vec![
//!     Step::new("Press save").with_action(ActionSpec::wait_for_click("#save")),
//!     Step::new("Saved!"),
//! ]);
//!
//! engine.advance_clock(Duration::from_secs(1));
//! assert_eq!(engine.state(), EngineState::AwaitingGate);
//!
//! button.click();
//! engine.process_signals();
//! assert_eq!(engine.position(), 1);
//! ```
//!
//! ## Definitions
//!
//! Sequences are usually loaded from JSON, keyed by name:
//!
//! ```json
//! {
//!   "intro": [
//!     { "text": "Welcome!" },
//!     { "text": "Open the menu", "action": { "type": "waitForClick", "target": "#menu" } },
//!     { "text": "Your name?", "action": {
//!         "type": "waitForInputMatch", "target": "#name", "expected": { "pattern": "^\\w+$" } } },
//!     { "text": "Look here", "action": [
//!         { "type": "highlight", "target": "#panel", "durationMs": 1500 },
//!         { "type": "autoAdvance", "durationMs": 4000 } ] }
//!   ]
//! }
//! ```
//!
//! See [`DefinitionSource`] and [`SequenceEngine::load_definitions`].
//!
//! ## Time
//!
//! The engine never sleeps. Time passes only through
//! [`SequenceEngine::advance_clock`], and control callbacks are queued until
//! [`SequenceEngine::process_signals`]. The [`Driver`] maps wall-clock time
//! (or instant virtual time) onto both.
//!
//! ## Driver scripts
//!
//! The `walkthrough` binary plays a sequence in the terminal. A driver
//! script simulates the user:
//!
//! | Command | Description |
//! |---------|-------------|
//! | `control "#sel" [hidden]` | Declare a control |
//! | `load "key"` | Start a sequence |
//! | `advance` | Generic next: fast-forward typing or move on |
//! | `click "#sel"` | Click a control |
//! | `type "#sel" "text"` | Type into a control, one keystroke at a time |
//! | `wait 500ms` | Let time pass (`ms` or `s` units, floats allowed) |
//! | `expect "text" [2s]` | Wait until the walkthrough shows `text` |
//! | `show "note"` | Print a note |
//! | `speed 30ms` / `punctuation 200ms` / `debounce 100ms` | Adjust timing |
//! | `# comment` | Full-line or inline comment |

pub mod command;
pub mod commands;
pub mod config;
pub mod definitions;
pub mod driver;
pub mod engine;
pub mod error;
pub(crate) mod gate;
pub(crate) mod highlight;
pub mod host;
pub mod parser;
pub(crate) mod scheduler;
pub mod step;
pub mod terminal;
pub(crate) mod typewriter;

pub use command::{Context, DriverCommand};
pub use config::Timing;
pub use definitions::{DefinitionSource, Definitions};
pub use driver::Driver;
pub use engine::{AdvanceOutcome, EngineState, IgnoreReason, SequenceEngine};
pub use error::{Result, WalkthroughError};
pub use highlight::HIGHLIGHT_LAYER;
pub use host::{
    ContentSink, ControlHandle, ControlLocator, Host, IndicatorSurface, Listener, Notifier,
    OverlaySurface, Presentation, PresentationSurface, ProgressSink,
};
pub use parser::{parse_file, parse_str};
pub use step::{ActionSpec, Expected, Step};
pub use terminal::{TerminalSurface, VirtualControl, VirtualControls};
