//! The walkthrough data model: [`Step`], [`ActionSpec`] and [`Expected`].
//!
//! Steps are decoded from JSON. Action objects carry a `type` tag; the older
//! names (`waitForButton`, `waitForInput`, `autoNext`, `showElement`,
//! `selector`, `delayAfter`, `duration`, `expectedValue`) are accepted as
//! aliases so existing tutorial files keep loading.

use crate::error::WalkthroughError;
use regex::Regex;
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// One unit of scripted text plus its optional gating actions.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Step {
    #[serde(default)]
    pub text: String,
    #[serde(default, rename = "action", deserialize_with = "one_or_many")]
    pub actions: Vec<ActionSpec>,
}

impl Step {
    /// A plain step that waits for a generic advance.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            actions: Vec::new(),
        }
    }

    /// Attach an action to this step.
    pub fn with_action(mut self, action: ActionSpec) -> Self {
        self.actions.push(action);
        self
    }

    /// Click-wait steps suppress the advance indicator: the gate, not a
    /// generic click, is how the user proceeds.
    pub fn has_click_gate(&self) -> bool {
        self.actions.iter().any(ActionSpec::is_click_wait)
    }
}

/// How a step gates progression.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ActionSpec {
    #[serde(alias = "waitForButton")]
    WaitForClick {
        #[serde(alias = "selector")]
        target: String,
        #[serde(default, rename = "postDelayMs", alias = "delayAfter", deserialize_with = "millis")]
        post_delay: Duration,
    },

    /// Reveals a previously hidden control before waiting for its click.
    WaitForClickAndReveal {
        #[serde(alias = "selector")]
        target: String,
        #[serde(default, rename = "postDelayMs", alias = "delayAfter", deserialize_with = "millis")]
        post_delay: Duration,
    },

    #[serde(alias = "waitForInput")]
    WaitForInputMatch {
        #[serde(alias = "selector")]
        target: String,
        #[serde(alias = "expectedValue")]
        expected: Expected,
        #[serde(default, rename = "postDelayMs", alias = "delayAfter", deserialize_with = "millis")]
        post_delay: Duration,
    },

    Delay {
        #[serde(default = "one_second", rename = "durationMs", alias = "duration", deserialize_with = "millis")]
        duration: Duration,
    },

    #[serde(alias = "autoNext")]
    AutoAdvance {
        #[serde(default = "one_second", rename = "durationMs", alias = "duration", deserialize_with = "millis")]
        duration: Duration,
    },

    /// A zero duration keeps the highlight until the next advance.
    Highlight {
        #[serde(alias = "selector")]
        target: String,
        #[serde(default, rename = "durationMs", alias = "duration", deserialize_with = "millis")]
        duration: Duration,
    },

    #[serde(alias = "showElement")]
    RevealAndWait {
        #[serde(alias = "selector")]
        target: String,
    },
}

impl ActionSpec {
    pub fn wait_for_click(target: impl Into<String>) -> Self {
        Self::WaitForClick {
            target: target.into(),
            post_delay: Duration::ZERO,
        }
    }

    pub fn wait_for_input(target: impl Into<String>, expected: Expected) -> Self {
        Self::WaitForInputMatch {
            target: target.into(),
            expected,
            post_delay: Duration::ZERO,
        }
    }

    /// The selector this action operates on, if any.
    pub fn target(&self) -> Option<&str> {
        match self {
            Self::WaitForClick { target, .. }
            | Self::WaitForClickAndReveal { target, .. }
            | Self::WaitForInputMatch { target, .. }
            | Self::Highlight { target, .. }
            | Self::RevealAndWait { target } => Some(target),
            Self::Delay { .. } | Self::AutoAdvance { .. } => None,
        }
    }

    /// Whether installing this action blocks generic advance requests.
    pub fn is_blocking(&self) -> bool {
        match self {
            Self::WaitForClick { .. }
            | Self::WaitForClickAndReveal { .. }
            | Self::WaitForInputMatch { .. }
            | Self::Delay { .. } => true,
            Self::Highlight { duration, .. } => !duration.is_zero(),
            Self::AutoAdvance { .. } | Self::RevealAndWait { .. } => false,
        }
    }

    pub fn is_click_wait(&self) -> bool {
        matches!(
            self,
            Self::WaitForClick { .. } | Self::WaitForClickAndReveal { .. }
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::WaitForClick { .. } => "waitForClick",
            Self::WaitForClickAndReveal { .. } => "waitForClickAndReveal",
            Self::WaitForInputMatch { .. } => "waitForInputMatch",
            Self::Delay { .. } => "delay",
            Self::AutoAdvance { .. } => "autoAdvance",
            Self::Highlight { .. } => "highlight",
            Self::RevealAndWait { .. } => "revealAndWait",
        }
    }
}

type MatchFn = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// The value an input gate waits for.
#[derive(Clone)]
pub enum Expected {
    /// Case-insensitive substring match.
    Text(String),
    Pattern(Regex),
    Predicate(MatchFn),
    /// Exact equality; produced for non-string JSON values.
    Exact(String),
}

impl Expected {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn pattern(pattern: &str) -> Result<Self, WalkthroughError> {
        Regex::new(pattern)
            .map(Self::Pattern)
            .map_err(|e| WalkthroughError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })
    }

    pub fn predicate(f: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        Self::Predicate(Arc::new(f))
    }

    /// Whether `value` satisfies this expectation.
    pub fn matches(&self, value: &str) -> bool {
        match self {
            Self::Text(expected) => value.to_lowercase().contains(&expected.to_lowercase()),
            Self::Pattern(re) => re.is_match(value),
            Self::Predicate(f) => f(value),
            Self::Exact(expected) => value == expected,
        }
    }
}

impl fmt::Debug for Expected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(t) => f.debug_tuple("Text").field(t).finish(),
            Self::Pattern(re) => f.debug_tuple("Pattern").field(&re.as_str()).finish(),
            Self::Predicate(_) => f.write_str("Predicate(..)"),
            Self::Exact(v) => f.debug_tuple("Exact").field(v).finish(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ExpectedRepr {
    Text(String),
    Pattern { pattern: String },
    Other(serde_json::Value),
}

impl<'de> Deserialize<'de> for Expected {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match ExpectedRepr::deserialize(deserializer)? {
            ExpectedRepr::Text(text) => Ok(Self::Text(text)),
            ExpectedRepr::Pattern { pattern } => {
                Self::pattern(&pattern).map_err(serde::de::Error::custom)
            }
            ExpectedRepr::Other(value) => Ok(Self::Exact(value.to_string())),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(ActionSpec),
    Many(Vec<ActionSpec>),
}

fn one_or_many<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<ActionSpec>, D::Error> {
    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(action)) => vec![action],
        Some(OneOrMany::Many(actions)) => actions,
    })
}

fn millis<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    u64::deserialize(deserializer).map(Duration::from_millis)
}

fn one_second() -> Duration {
    Duration::from_secs(1)
}
