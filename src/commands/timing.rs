//! Timing commands.
//!
//! Script syntax:
//! - `speed 30ms`: per-character typing delay
//! - `punctuation 200ms`: pause after `.`, `!` and `?`
//! - `debounce 100ms`: minimum gap between accepted advances

use crate::command::{Context, DriverCommand};
use crate::parser::parse_duration;
use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

pub struct SetTypingSpeed(pub Duration);

impl SetTypingSpeed {
    pub const NAME: &'static str = "speed";
}

#[async_trait(?Send)]
impl DriverCommand for SetTypingSpeed {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(args: &str) -> Result<Self> {
        Ok(Self(parse_duration(args)?))
    }

    async fn execute(&self, ctx: &mut Context) -> Result<()> {
        ctx.engine().set_typing_speed(self.0);
        Ok(())
    }
}

pub struct SetPunctuationPause(pub Duration);

impl SetPunctuationPause {
    pub const NAME: &'static str = "punctuation";
}

#[async_trait(?Send)]
impl DriverCommand for SetPunctuationPause {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(args: &str) -> Result<Self> {
        Ok(Self(parse_duration(args)?))
    }

    async fn execute(&self, ctx: &mut Context) -> Result<()> {
        ctx.engine().set_punctuation_pause(self.0);
        Ok(())
    }
}

pub struct SetDebounce(pub Duration);

impl SetDebounce {
    pub const NAME: &'static str = "debounce";
}

#[async_trait(?Send)]
impl DriverCommand for SetDebounce {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(args: &str) -> Result<Self> {
        Ok(Self(parse_duration(args)?))
    }

    async fn execute(&self, ctx: &mut Context) -> Result<()> {
        ctx.engine().set_advance_debounce(self.0);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!(SetTypingSpeed::parse("30ms").unwrap().0, Duration::from_millis(30));
        assert_eq!(
            SetPunctuationPause::parse("0.2s").unwrap().0,
            Duration::from_millis(200)
        );
        assert_eq!(SetDebounce::parse("0ms").unwrap().0, Duration::ZERO);
        assert!(SetTypingSpeed::parse("fast").is_err());
    }
}
