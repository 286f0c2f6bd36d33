//! [`Wait`] command: lets time pass.
//!
//! Script syntax: `wait 500ms` or `wait 1.5s`

use crate::command::{Context, DriverCommand};
use crate::parser::parse_duration;
use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Lets `duration` pass while the engine keeps running: typing continues
/// and timed gates and auto-advances fire.
pub struct Wait {
    pub duration: Duration,
}

impl Wait {
    pub const NAME: &'static str = "wait";
}

#[async_trait(?Send)]
impl DriverCommand for Wait {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(args: &str) -> Result<Self> {
        Ok(Self {
            duration: parse_duration(args)?,
        })
    }

    async fn execute(&self, ctx: &mut Context) -> Result<()> {
        ctx.run_for(self.duration).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!(Wait::parse("1s").unwrap().duration, Duration::from_secs(1));
        assert_eq!(
            Wait::parse("1.5s").unwrap().duration,
            Duration::from_secs_f64(1.5)
        );
        assert_eq!(
            Wait::parse("250ms").unwrap().duration,
            Duration::from_millis(250)
        );
    }

    #[test]
    fn test_parse_invalid() {
        assert!(Wait::parse("5minutes").is_err());
    }
}
