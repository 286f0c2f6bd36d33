//! Timing configuration for the typewriter and advance handling.

use std::time::Duration;

/// Reveal and input timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// Delay after an ordinary character.
    pub typing_speed: Duration,
    /// Delay after `.`, `!` and `?`.
    pub punctuation_pause: Duration,
    /// Generic advance requests closer together than this are dropped.
    /// Zero disables the debounce.
    pub advance_debounce: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            typing_speed: Duration::from_millis(50),
            punctuation_pause: Duration::from_millis(300),
            advance_debounce: Duration::ZERO,
        }
    }
}

impl Timing {
    /// Delay to wait after revealing `ch`.
    pub fn delay_after(&self, ch: char) -> Duration {
        match ch {
            '.' | '!' | '?' => self.punctuation_pause,
            ',' => self.typing_speed * 2,
            _ => self.typing_speed,
        }
    }
}
