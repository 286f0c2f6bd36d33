//! Terminal collaborators: a [`TerminalSurface`] that prints the walkthrough
//! and [`VirtualControl`]s a driver script can click and type into.

use crate::host::{
    ContentSink, ControlHandle, ControlLocator, IndicatorSurface, Listener, Notifier,
    OverlaySurface, Presentation, PresentationSurface, ProgressSink,
};
use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use tracing::debug;

pub type OutputHandler = Arc<dyn Fn(&[u8]) + Send + Sync>;

/// Output handler that writes to stdout.
pub(crate) fn stdout_handler() -> OutputHandler {
    Arc::new(|data| {
        let mut out = io::stdout();
        let _ = out.write_all(data);
        let _ = out.flush();
    })
}

#[derive(Default)]
struct SurfaceState {
    /// Raw content, markup included.
    content: String,
    /// Terminal rendering of the content already written out.
    printed: String,
    open: bool,
    indicator: bool,
    overlay: bool,
    progress: Option<(usize, usize)>,
}

/// Renders the walkthrough to an output handler (stdout by default).
///
/// Only newly revealed text is written, so the typewriter effect plays out
/// naturally on a terminal. `<b>`, `<i>` and `<u>` become ANSI attributes,
/// `<br>` a newline; any other tag is dropped.
pub struct TerminalSurface {
    output: OutputHandler,
    state: Mutex<SurfaceState>,
}

impl TerminalSurface {
    pub fn stdout() -> Self {
        Self::with_handler(stdout_handler())
    }

    pub fn with_handler(output: OutputHandler) -> Self {
        Self {
            output,
            state: Mutex::new(SurfaceState::default()),
        }
    }

    /// A surface that records state but writes nothing.
    pub fn silent() -> Self {
        Self::with_handler(Arc::new(|_| {}))
    }

    /// The raw content currently displayed.
    pub fn content(&self) -> String {
        self.state.lock().unwrap().content.clone()
    }

    pub fn is_indicator_visible(&self) -> bool {
        self.state.lock().unwrap().indicator
    }

    pub fn overlay_attached(&self) -> bool {
        self.state.lock().unwrap().overlay
    }

    pub fn progress(&self) -> Option<(usize, usize)> {
        self.state.lock().unwrap().progress
    }

    pub(crate) fn emit(&self, data: &[u8]) {
        (self.output)(data);
    }
}

impl ContentSink for TerminalSurface {
    fn set_content(&self, fragment: &str) {
        let rendered = render_markup(fragment);
        let out = {
            let mut state = self.state.lock().unwrap();
            state.content = fragment.to_string();
            let out = match rendered.strip_prefix(state.printed.as_str()) {
                Some(suffix) => suffix.to_string(),
                None => format!("\n{rendered}"),
            };
            state.printed = rendered;
            out
        };
        if !out.is_empty() {
            self.emit(out.as_bytes());
        }
    }
}

impl PresentationSurface for TerminalSurface {
    fn show(&self) {
        self.state.lock().unwrap().open = true;
    }

    fn close(&self) {
        let was_open = std::mem::replace(&mut self.state.lock().unwrap().open, false);
        if was_open {
            self.emit(b"\x1b[0m\n");
        }
    }

    fn is_open(&self) -> bool {
        self.state.lock().unwrap().open
    }
}

impl IndicatorSurface for TerminalSurface {
    fn show(&self) {
        let was_visible = std::mem::replace(&mut self.state.lock().unwrap().indicator, true);
        if !was_visible {
            self.emit(" \u{25b8}".as_bytes());
        }
    }

    fn hide(&self) {
        self.state.lock().unwrap().indicator = false;
    }
}

impl OverlaySurface for TerminalSurface {
    fn attach(&self) {
        self.state.lock().unwrap().overlay = true;
    }

    fn detach(&self) {
        self.state.lock().unwrap().overlay = false;
    }
}

impl ProgressSink for TerminalSurface {
    fn set_progress(&self, current: usize, total: usize) {
        {
            let mut state = self.state.lock().unwrap();
            state.progress = Some((current, total));
            state.printed.clear();
        }
        self.emit(format!("\n\x1b[2m[Step {current} of {total}]\x1b[0m ").as_bytes());
    }
}

/// Translate the supported tags to ANSI and drop the rest.
fn render_markup(fragment: &str) -> String {
    let mut out = String::with_capacity(fragment.len());
    let mut rest = fragment;
    while let Some(open) = rest.find('<') {
        out.push_str(&rest[..open]);
        let Some(close) = rest[open..].find('>') else {
            out.push_str(&rest[open..]);
            return out;
        };
        let tag = &rest[open + 1..open + close];
        out.push_str(match tag.trim().to_ascii_lowercase().as_str() {
            "b" | "strong" => "\x1b[1m",
            "/b" | "/strong" => "\x1b[22m",
            "i" | "em" => "\x1b[3m",
            "/i" | "/em" => "\x1b[23m",
            "u" => "\x1b[4m",
            "/u" => "\x1b[24m",
            "br" | "br/" | "br /" => "\n",
            _ => "",
        });
        rest = &rest[open + close + 1..];
    }
    out.push_str(rest);
    out
}

struct ControlState {
    value: String,
    visible: bool,
    presentation: Presentation,
    interceptors: Vec<(u64, Notifier)>,
    observers: Vec<(u64, Notifier)>,
    next_listener: u64,
    activations: usize,
}

/// An in-memory control addressed by selector.
///
/// Clicking an intercepted control notifies the interceptors instead of
/// activating it; the gate re-invokes the activation itself.
pub struct VirtualControl {
    selector: String,
    state: Arc<Mutex<ControlState>>,
    on_activate: Option<OutputHandler>,
}

impl VirtualControl {
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            state: Arc::new(Mutex::new(ControlState {
                value: String::new(),
                visible: true,
                presentation: Presentation::default(),
                interceptors: Vec::new(),
                observers: Vec::new(),
                next_listener: 0,
                activations: 0,
            })),
            on_activate: None,
        }
    }

    pub fn selector(&self) -> &str {
        &self.selector
    }

    /// Simulate a user click. Hidden controls cannot be clicked.
    pub fn click(&self) -> bool {
        let interceptors: Vec<Notifier> = {
            let state = self.state.lock().unwrap();
            if !state.visible {
                debug!(selector = %self.selector, "click on hidden control ignored");
                return false;
            }
            state.interceptors.iter().map(|(_, n)| n.clone()).collect()
        };
        if interceptors.is_empty() {
            self.activate();
        } else {
            interceptors.iter().for_each(Notifier::notify);
        }
        true
    }

    /// Simulate the user changing the control's value.
    pub fn set_value(&self, value: impl Into<String>) {
        let observers: Vec<Notifier> = {
            let mut state = self.state.lock().unwrap();
            state.value = value.into();
            state.observers.iter().map(|(_, n)| n.clone()).collect()
        };
        observers.iter().for_each(Notifier::notify);
    }

    /// How many times the control's own behavior has run.
    pub fn activations(&self) -> usize {
        self.state.lock().unwrap().activations
    }

    pub fn is_visible(&self) -> bool {
        self.state.lock().unwrap().visible
    }

    pub fn is_intercepted(&self) -> bool {
        !self.state.lock().unwrap().interceptors.is_empty()
    }

    pub fn is_observed(&self) -> bool {
        !self.state.lock().unwrap().observers.is_empty()
    }

    fn activate(&self) {
        self.state.lock().unwrap().activations += 1;
        if let Some(output) = &self.on_activate {
            output(format!("\n\x1b[2m({} activated)\x1b[0m", self.selector).as_bytes());
        }
    }

    fn subscribe(&self, notifier: Notifier, observers: bool) -> Listener {
        let id = {
            let mut state = self.state.lock().unwrap();
            let id = state.next_listener;
            state.next_listener += 1;
            if observers {
                state.observers.push((id, notifier));
            } else {
                state.interceptors.push((id, notifier));
            }
            id
        };
        let state = Arc::clone(&self.state);
        Listener::new(move || {
            let mut state = state.lock().unwrap();
            state.interceptors.retain(|(i, _)| *i != id);
            state.observers.retain(|(i, _)| *i != id);
        })
    }
}

impl ControlHandle for VirtualControl {
    fn value(&self) -> String {
        self.state.lock().unwrap().value.clone()
    }

    fn intercept_activation(&self, notifier: Notifier) -> Listener {
        self.subscribe(notifier, false)
    }

    fn observe_input(&self, notifier: Notifier) -> Listener {
        self.subscribe(notifier, true)
    }

    fn invoke_original(&self) {
        self.activate();
    }

    fn set_visible(&self, visible: bool) {
        self.state.lock().unwrap().visible = visible;
    }

    fn presentation(&self) -> Presentation {
        self.state.lock().unwrap().presentation.clone()
    }

    fn set_presentation(&self, presentation: Presentation) {
        self.state.lock().unwrap().presentation = presentation;
    }

    fn describe(&self) -> String {
        self.selector.clone()
    }
}

/// Selector registry for [`VirtualControl`]s.
#[derive(Default)]
pub struct VirtualControls {
    controls: Mutex<HashMap<String, Arc<VirtualControl>>>,
    on_activate: Option<OutputHandler>,
}

impl VirtualControls {
    pub fn new() -> Self {
        Self::default()
    }

    /// Controls created by this registry announce their activations on `output`.
    pub fn with_handler(output: OutputHandler) -> Self {
        Self {
            controls: Mutex::default(),
            on_activate: Some(output),
        }
    }

    /// Register a control, or update the visibility of an existing one.
    pub fn declare(&self, selector: &str, visible: bool) -> Arc<VirtualControl> {
        let mut controls = self.controls.lock().unwrap();
        let control = controls.entry(selector.to_string()).or_insert_with(|| {
            let mut control = VirtualControl::new(selector);
            control.on_activate = self.on_activate.clone();
            Arc::new(control)
        });
        control.set_visible(visible);
        Arc::clone(control)
    }

    pub fn get(&self, selector: &str) -> Option<Arc<VirtualControl>> {
        self.controls.lock().unwrap().get(selector).cloned()
    }
}

impl ControlLocator for VirtualControls {
    fn find(&self, selector: &str) -> Option<Arc<dyn ControlHandle>> {
        self.get(selector).map(|c| c as Arc<dyn ControlHandle>)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn captured() -> (OutputHandler, Arc<Mutex<Vec<u8>>>) {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let sink = buf.clone();
        let handler: OutputHandler = Arc::new(move |data| sink.lock().unwrap().extend_from_slice(data));
        (handler, buf)
    }

    fn text(buf: &Arc<Mutex<Vec<u8>>>) -> String {
        String::from_utf8_lossy(&buf.lock().unwrap()).into_owned()
    }

    #[test]
    fn test_prints_only_new_text() {
        let (handler, buf) = captured();
        let surface = TerminalSurface::with_handler(handler);
        surface.set_content("H");
        surface.set_content("He");
        surface.set_content("Hey");
        assert_eq!(text(&buf), "Hey");
        assert_eq!(surface.content(), "Hey");
    }

    #[test]
    fn test_progress_starts_fresh_line() {
        let (handler, buf) = captured();
        let surface = TerminalSurface::with_handler(handler);
        surface.set_content("one");
        surface.set_progress(2, 3);
        surface.set_content("t");
        assert!(text(&buf).ends_with("[Step 2 of 3]\x1b[0m t"), "got: {:?}", text(&buf));
        assert_eq!(surface.progress(), Some((2, 3)));
    }

    #[test]
    fn test_markup_rendering() {
        assert_eq!(render_markup("<b>bold</b> x"), "\x1b[1mbold\x1b[22m x");
        assert_eq!(render_markup("<span class=\"k\">x</span>"), "x");
        assert_eq!(render_markup("a<br>b"), "a\nb");
        assert_eq!(render_markup("1 < 2"), "1 < 2");
    }

    #[test]
    fn test_indicator_printed_once() {
        let (handler, buf) = captured();
        let surface = TerminalSurface::with_handler(handler);
        IndicatorSurface::show(&surface);
        IndicatorSurface::show(&surface);
        assert!(surface.is_indicator_visible());
        assert_eq!(text(&buf).matches('\u{25b8}').count(), 1);
        surface.hide();
        assert!(!surface.is_indicator_visible());
    }

    #[test]
    fn test_click_without_interceptor_activates() {
        let c = VirtualControl::new("#btn");
        assert!(c.click());
        assert_eq!(c.activations(), 1);
    }

    #[test]
    fn test_hidden_control_ignores_clicks() {
        let controls = VirtualControls::new();
        let c = controls.declare("#secret", false);
        assert!(!c.click());
        assert_eq!(c.activations(), 0);
        controls.declare("#secret", true);
        assert!(c.click());
    }

    #[test]
    fn test_locator() {
        let controls = VirtualControls::new();
        controls.declare("#a", true);
        assert!(controls.find("#a").is_some());
        assert!(controls.find("#b").is_none());
        assert_eq!(controls.find("#a").unwrap().describe(), "#a");
    }

    #[test]
    fn test_activation_is_announced() {
        let (handler, buf) = captured();
        let controls = VirtualControls::with_handler(handler);
        controls.declare("#run", true).click();
        assert!(text(&buf).contains("#run activated"));
    }
}
