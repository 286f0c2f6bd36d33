use std::sync::{Arc, Mutex};
use std::time::Duration;
use walkthrough::{
    ActionSpec, AdvanceOutcome, ContentSink, ControlHandle, DefinitionSource, EngineState,
    Expected, Host, IndicatorSurface, OverlaySurface, Presentation, PresentationSurface,
    ProgressSink, SequenceEngine, Step, TerminalSurface, VirtualControls, HIGHLIGHT_LAYER,
};

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

/// Records every frame the engine puts on screen.
#[derive(Default)]
struct Screen {
    frames: Mutex<Vec<String>>,
    open: Mutex<bool>,
    indicator: Mutex<bool>,
    overlay: Mutex<bool>,
    progress: Mutex<Vec<(usize, usize)>>,
}

impl Screen {
    fn frames(&self) -> Vec<String> {
        self.frames.lock().unwrap().clone()
    }

    fn last(&self) -> String {
        self.frames().last().cloned().unwrap_or_default()
    }
}

impl ContentSink for Screen {
    fn set_content(&self, fragment: &str) {
        self.frames.lock().unwrap().push(fragment.to_string());
    }
}

impl PresentationSurface for Screen {
    fn show(&self) {
        *self.open.lock().unwrap() = true;
    }

    fn close(&self) {
        *self.open.lock().unwrap() = false;
    }

    fn is_open(&self) -> bool {
        *self.open.lock().unwrap()
    }
}

impl IndicatorSurface for Screen {
    fn show(&self) {
        *self.indicator.lock().unwrap() = true;
    }

    fn hide(&self) {
        *self.indicator.lock().unwrap() = false;
    }
}

impl OverlaySurface for Screen {
    fn attach(&self) {
        *self.overlay.lock().unwrap() = true;
    }

    fn detach(&self) {
        *self.overlay.lock().unwrap() = false;
    }
}

impl ProgressSink for Screen {
    fn set_progress(&self, current: usize, total: usize) {
        self.progress.lock().unwrap().push((current, total));
    }
}

fn setup() -> (SequenceEngine, Arc<Screen>, Arc<VirtualControls>) {
    let screen = Arc::new(Screen::default());
    let controls = Arc::new(VirtualControls::new());
    let engine = SequenceEngine::new(Host::with_surface(screen.clone(), controls.clone()));
    (engine, screen, controls)
}

const THREE_STEPS: &str = r##"{
    "demo": [
        { "text": "Hi" },
        { "text": "Click", "action": { "type": "waitForClick", "target": "#btn" } },
        { "text": "Done" }
    ]
}"##;

#[test]
fn test_click_scenario_end_to_end() {
    let (mut engine, screen, controls) = setup();
    let btn = controls.declare("#btn", true);
    assert!(engine.load_definitions(&DefinitionSource::inline(THREE_STEPS)));

    engine.load_sequence("demo");
    assert_eq!(engine.state(), EngineState::Typing);
    assert_eq!(screen.frames(), ["H"]);
    engine.advance_clock(ms(50));
    assert_eq!(screen.frames(), ["H", "Hi"]);

    assert_eq!(engine.request_advance(), AdvanceOutcome::FastForwarded);
    assert_eq!(engine.position(), 0);
    assert_eq!(screen.last(), "Hi");

    assert_eq!(engine.request_advance(), AdvanceOutcome::Advanced);
    assert_eq!(engine.position(), 1);
    engine.advance_clock(ms(1000));
    assert_eq!(screen.last(), "Click");
    assert_eq!(engine.state(), EngineState::AwaitingGate);
    assert!(!screen.is_open());
    assert!(!*screen.indicator.lock().unwrap());

    assert!(btn.click());
    engine.process_signals();
    assert_eq!(engine.position(), 2);
    assert_eq!(btn.activations(), 1);
    assert!(screen.is_open());

    engine.advance_clock(ms(1000));
    assert_eq!(screen.last(), "Done");
    assert_eq!(engine.request_advance(), AdvanceOutcome::Advanced);
    assert_eq!(engine.position(), 3);
    assert_eq!(engine.state(), EngineState::Complete);
    assert!(!screen.is_open());
    assert_eq!(*screen.progress.lock().unwrap(), [(1, 3), (2, 3), (3, 3)]);
}

#[test]
fn test_markup_never_partially_revealed() {
    let (mut engine, screen, _) = setup();
    engine.load_steps(vec![Step::new("a <span class=\"x\">b</span>!")]);
    engine.advance_clock(ms(5000));
    for frame in screen.frames() {
        let opens = frame.matches('<').count();
        let closes = frame.matches('>').count();
        assert_eq!(opens, closes, "partial tag in {frame:?}");
    }
    assert_eq!(screen.last(), "a <span class=\"x\">b</span>!");
}

#[test]
fn test_auto_advance_does_not_cut_typing_short() {
    let (mut engine, screen, _) = setup();
    // 40 characters at the default speed take 2000ms to reveal.
    engine.load_steps(vec![
        Step::new("abcdefghij".repeat(4)).with_action(ActionSpec::AutoAdvance { duration: ms(1000) }),
        Step::new("second"),
    ]);

    engine.advance_clock(ms(1000));
    assert!(engine.is_typing());
    assert_eq!(engine.position(), 0);

    engine.advance_clock(ms(1000));
    assert_eq!(engine.state(), EngineState::Ready);
    assert!(*screen.indicator.lock().unwrap());
    assert_eq!(engine.pending_timers(), 0);
    assert_eq!(engine.position(), 0);

    engine.request_advance();
    assert_eq!(engine.position(), 1);
}

#[test]
fn test_reload_during_click_gate_restores_presentation() {
    let (mut engine, screen, controls) = setup();
    let x = controls.declare("#x", true);
    let original = Presentation {
        layer: Some(2),
        positioning: Some("absolute".into()),
        emphasized: false,
    };
    x.set_presentation(original.clone());

    engine.load_steps(vec![Step::new("Press X").with_action(ActionSpec::wait_for_click("#x"))]);
    engine.complete_typing();
    assert_eq!(x.presentation().layer, Some(HIGHLIGHT_LAYER));
    assert!(*screen.overlay.lock().unwrap());

    engine.load_steps(vec![Step::new("Something else")]);
    assert_eq!(x.presentation(), original);
    assert!(!x.is_intercepted());
    assert!(!*screen.overlay.lock().unwrap());
    assert_eq!(engine.state(), EngineState::Typing);
    assert_eq!(engine.position(), 0);
    assert!(screen.is_open());

    // The control behaves normally again.
    x.click();
    engine.process_signals();
    assert_eq!(x.activations(), 1);
    assert_eq!(engine.position(), 0);
}

#[test]
fn test_input_match_policy() {
    for (value, matches) in [("FOO bar", true), ("xfooy", true), ("fo", false)] {
        let (mut engine, _, controls) = setup();
        let input = controls.declare("#q", true);
        engine.load_steps(vec![
            Step::new("").with_action(ActionSpec::wait_for_input("#q", Expected::text("foo"))),
            Step::new("next"),
        ]);
        input.set_value(value);
        engine.process_signals();
        assert_eq!(engine.position() == 1, matches, "value {value:?}");
    }
}

#[test]
fn test_input_pattern_from_json() {
    let (mut engine, screen, controls) = setup();
    let email = controls.declare("#email", true);
    let json = r##"{ "signup": [
        { "text": "Your email", "action": {
            "type": "waitForInput", "selector": "#email",
            "expectedValue": { "pattern": "^[^@]+@[^@]+$" }, "delayAfter": 300 } },
        { "text": "Thanks" }
    ] }"##;
    assert!(engine.load_definitions(&DefinitionSource::inline(json)));
    engine.load_sequence("signup");
    engine.complete_typing();
    assert!(email.is_observed());

    email.set_value("me@");
    engine.process_signals();
    assert_eq!(engine.state(), EngineState::AwaitingGate);

    email.set_value(" me@example.com ");
    engine.advance_clock(Duration::ZERO);
    assert_eq!(engine.state(), EngineState::PostGateDelay);
    assert!(!email.is_observed());
    assert!(screen.is_open());
    engine.advance_clock(ms(300));
    assert_eq!(engine.position(), 1);
}

#[test]
fn test_reveal_and_wait_from_json() {
    let (mut engine, screen, controls) = setup();
    let panel = controls.declare("#panel", false);
    let json = r##"{ "t": [
        { "text": "See the panel", "action": { "type": "showElement", "selector": "#panel" } },
        { "text": "ok" }
    ] }"##;
    assert!(engine.load_definitions(&DefinitionSource::inline(json)));
    engine.load_sequence("t");
    engine.advance_clock(ms(2000));
    assert!(panel.is_visible());
    assert!(*screen.indicator.lock().unwrap());
    assert_eq!(engine.state(), EngineState::Ready);
}

#[test]
fn test_completion_closes_surface_for_every_last_step_kind() {
    let cases: Vec<(&str, Box<dyn Fn(&VirtualControls)>)> = vec![
        (r##"{ "type": "waitForClick", "target": "#c" }"##, Box::new(|c: &VirtualControls| {
            c.get("#c").unwrap().click();
        })),
        (r##"{ "type": "waitForClickAndReveal", "target": "#c", "postDelayMs": 50 }"##, Box::new(|c: &VirtualControls| {
            c.get("#c").unwrap().click();
        })),
        (r##"{ "type": "waitForInputMatch", "target": "#c", "expected": 42 }"##, Box::new(|c: &VirtualControls| {
            c.get("#c").unwrap().set_value("42");
        })),
        (r##"{ "type": "highlight", "target": "#c", "durationMs": 100 }"##, Box::new(|_: &VirtualControls| {})),
        (r##"{ "type": "highlight", "target": "#c" }"##, Box::new(|_: &VirtualControls| {})),
        (r##"{ "type": "delay", "durationMs": 100 }"##, Box::new(|_: &VirtualControls| {})),
        (r##"{ "type": "autoAdvance", "durationMs": 100 }"##, Box::new(|_: &VirtualControls| {})),
    ];

    for (action, user) in cases {
        let (mut engine, screen, controls) = setup();
        controls.declare("#c", true);
        let json = format!(r#"{{ "k": [ {{ "text": "last", "action": {action} }} ] }}"#);
        assert!(engine.load_definitions(&DefinitionSource::inline(json)), "{action}");
        engine.load_sequence("k");
        engine.complete_typing();
        user(&controls);
        engine.advance_clock(ms(100));
        engine.request_advance();

        assert_eq!(engine.state(), EngineState::Complete, "{action}");
        assert!(!engine.is_highlight_active(), "{action}");
        assert!(!*screen.overlay.lock().unwrap(), "{action}");
        assert!(!screen.is_open(), "{action}");
        assert!(!controls.get("#c").unwrap().presentation().emphasized, "{action}");
    }
}

#[test]
fn test_load_always_resets_to_first_step() {
    let (mut engine, screen, controls) = setup();
    controls.declare("#c", true);
    let steps = vec![
        Step::new("one"),
        Step::new("two").with_action(ActionSpec::Highlight {
            target: "#c".into(),
            duration: ms(1000),
        }),
        Step::new("three"),
    ];

    for _ in 0..2 {
        engine.load_steps(steps.clone());
        assert_eq!(engine.state(), EngineState::Typing);
        assert_eq!(engine.position(), 0);
        assert!(!engine.is_gate_active());
        assert!(!engine.is_highlight_active());
        assert!(screen.is_open());

        engine.complete_typing();
        engine.request_advance();
        engine.complete_typing();
        assert!(engine.is_gate_active());
        assert!(engine.is_highlight_active());
    }

    engine.advance_clock(ms(1000));
    assert_eq!(engine.position(), 2);
    engine.complete_typing();
    engine.request_advance();
    assert_eq!(engine.state(), EngineState::Complete);

    engine.load_steps(steps);
    assert_eq!(engine.state(), EngineState::Typing);
    assert_eq!(engine.position(), 0);
}

#[test]
fn test_definitions_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("defs.json");
    std::fs::write(&path, THREE_STEPS).unwrap();

    let (mut engine, _, _) = setup();
    assert!(engine.load_definitions(&DefinitionSource::file(&path)));
    engine.load_sequence("demo");
    assert_eq!(engine.len(), 3);

    assert!(!engine.load_definitions(&DefinitionSource::file(dir.path().join("missing.json"))));
    engine.load_sequence("demo");
    assert_eq!(engine.len(), 3);
}

#[test]
fn test_terminal_surface_as_host() {
    let out = Arc::new(Mutex::new(Vec::<u8>::new()));
    let sink = out.clone();
    let surface = Arc::new(TerminalSurface::with_handler(Arc::new(move |data: &[u8]| {
        sink.lock().unwrap().extend_from_slice(data)
    })));
    let controls = Arc::new(VirtualControls::new());
    let mut engine = SequenceEngine::new(Host::with_surface(surface.clone(), controls));

    engine.load_steps(vec![Step::new("<b>Bold</b> move."), Step::new("Next")]);
    engine.advance_clock(ms(5000));
    engine.request_advance();
    engine.advance_clock(ms(5000));

    let printed = String::from_utf8_lossy(&out.lock().unwrap()).to_string();
    assert!(printed.contains("Bold"), "got: {printed:?}");
    assert!(!printed.contains("<b>"), "got: {printed:?}");
    assert!(printed.contains("[Step 2 of 2]"), "got: {printed:?}");
    assert_eq!(surface.content(), "Next");
}
