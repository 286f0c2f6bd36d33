//! [`Advance`] command: the user's generic "next" press.
//!
//! Script syntax: `advance`

use crate::command::{Context, DriverCommand};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use tracing::debug;

/// Requests an advance. Fast-forwards typing, moves on from a step that is
/// ready, and does nothing while a gate is waiting.
pub struct Advance;

impl Advance {
    pub const NAME: &'static str = "advance";
}

#[async_trait(?Send)]
impl DriverCommand for Advance {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(args: &str) -> Result<Self> {
        if !args.trim().is_empty() {
            return Err(anyhow!("'advance' takes no arguments"));
        }
        Ok(Self)
    }

    async fn execute(&self, ctx: &mut Context) -> Result<()> {
        let outcome = ctx.engine().request_advance();
        debug!(?outcome, "advance requested");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert!(Advance::parse("").is_ok());
        assert!(Advance::parse("  ").is_ok());
        assert!(Advance::parse("now").is_err());
    }
}
