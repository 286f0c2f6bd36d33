//! [`TypeText`] command: a user typing into an input control.
//!
//! Script syntax: `type "#email" "me@example.com"`

use crate::command::{Context, DriverCommand};
use crate::host::ControlHandle;
use crate::parser::{parse_quoted_string, take_quoted};
use anyhow::Result;
use async_trait::async_trait;
use rand::Rng;
use std::time::Duration;

/// Appends `text` to the control's value one character at a time with
/// random per-character delays. Every keystroke is a value change, so an
/// input gate sees each intermediate value.
pub struct TypeText {
    pub selector: String,
    pub text: String,
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl TypeText {
    pub const NAME: &'static str = "type";

    /// Create a `TypeText` command with default timing (50–150 ms per character).
    pub fn new(selector: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            text: text.into(),
            min_delay: Duration::from_millis(50),
            max_delay: Duration::from_millis(150),
        }
    }
}

#[async_trait(?Send)]
impl DriverCommand for TypeText {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(args: &str) -> Result<Self> {
        let (selector, rest) = take_quoted(args)?;
        Ok(Self::new(selector, parse_quoted_string(rest)?))
    }

    async fn execute(&self, ctx: &mut Context) -> Result<()> {
        let control = ctx.control(&self.selector)?;
        let mut value = control.value();
        for ch in self.text.chars() {
            value.push(ch);
            control.set_value(value.clone());
            ctx.sync();
            // Drop rng before the await so it does not cross the yield point.
            let delay_ms = {
                let mut rng = rand::thread_rng();
                rng.gen_range(self.min_delay.as_millis()..=self.max_delay.as_millis())
            };
            ctx.run_for(Duration::from_millis(delay_ms as u64)).await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        let cmd = TypeText::parse(r##""#name" "Ada \"L\"""##).unwrap();
        assert_eq!(cmd.selector, "#name");
        assert_eq!(cmd.text, r#"Ada "L""#);
        assert_eq!(cmd.min_delay, Duration::from_millis(50));
        assert_eq!(cmd.max_delay, Duration::from_millis(150));
    }

    #[test]
    fn test_parse_needs_two_strings() {
        assert!(TypeText::parse(r##""#name""##).is_err());
        assert!(TypeText::parse(r#""Ada""#).is_err());
    }
}
