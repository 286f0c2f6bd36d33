//! [`Load`] command: starts a sequence by key.
//!
//! Script syntax: `load "onboarding"`

use crate::command::{Context, DriverCommand};
use crate::parser::parse_quoted_string;
use anyhow::Result;
use async_trait::async_trait;

/// Loads the sequence stored under `key`, replacing whatever is running.
pub struct Load {
    pub key: String,
}

impl Load {
    pub const NAME: &'static str = "load";
}

#[async_trait(?Send)]
impl DriverCommand for Load {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(args: &str) -> Result<Self> {
        Ok(Self {
            key: parse_quoted_string(args)?,
        })
    }

    async fn execute(&self, ctx: &mut Context) -> Result<()> {
        ctx.engine().load_sequence(&self.key);
        Ok(())
    }
}
