//! Single-slot highlight with guaranteed restoration.

use crate::host::{ControlHandle, OverlaySurface, Presentation};
use std::sync::Arc;
use tracing::debug;

/// Stacking layer a highlighted control is lifted to, above the overlay.
pub const HIGHLIGHT_LAYER: i32 = 10_001;

struct HighlightRecord {
    control: Arc<dyn ControlHandle>,
    snapshot: Presentation,
}

/// Owns the one highlighted control and the shared overlay.
#[derive(Default)]
pub(crate) struct HighlightManager {
    record: Option<HighlightRecord>,
    overlay_attached: bool,
}

impl HighlightManager {
    pub(crate) fn is_active(&self) -> bool {
        self.record.is_some()
    }

    /// Highlight `control`, replacing any current highlight.
    pub(crate) fn highlight(&mut self, control: Arc<dyn ControlHandle>, overlay: &dyn OverlaySurface) {
        if let Some(previous) = self.record.take() {
            previous.control.set_presentation(previous.snapshot);
        }

        let snapshot = control.presentation();
        control.set_presentation(Presentation {
            layer: Some(HIGHLIGHT_LAYER),
            positioning: Some("relative".to_string()),
            emphasized: true,
        });
        if !self.overlay_attached {
            overlay.attach();
            self.overlay_attached = true;
        }
        debug!(control = %control.describe(), "highlighted");
        self.record = Some(HighlightRecord { control, snapshot });
    }

    /// Restore the highlighted control and remove the overlay. No-op when
    /// nothing is highlighted.
    pub(crate) fn clear(&mut self, overlay: &dyn OverlaySurface) {
        if let Some(record) = self.record.take() {
            debug!(control = %record.control.describe(), "highlight cleared");
            record.control.set_presentation(record.snapshot);
        }
        if self.overlay_attached {
            overlay.detach();
            self.overlay_attached = false;
        }
    }
}
