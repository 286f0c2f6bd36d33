//! [`Expect`] command: blocks until the walkthrough shows some text.
//!
//! Script syntax:
//! - `expect "Welcome"`: 5-second default timeout
//! - `expect "Step two" 10s`: custom timeout

use crate::command::{Context, DriverCommand};
use crate::parser::{parse_duration, take_quoted};
use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Runs the engine until the displayed content (markup included) contains
/// `text`, or fails once `timeout` of engine time has passed.
pub struct Expect {
    pub text: String,
    pub timeout: Duration,
}

impl Expect {
    pub const NAME: &'static str = "expect";

    /// Create an `Expect` command with the default 5-second timeout.
    pub fn new(text: impl Into<String>) -> Self {
        Self::with_timeout(text, Duration::from_secs(5))
    }

    pub fn with_timeout(text: impl Into<String>, timeout: Duration) -> Self {
        Self {
            text: text.into(),
            timeout,
        }
    }
}

#[async_trait(?Send)]
impl DriverCommand for Expect {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(args: &str) -> Result<Self> {
        let (text, rest) = take_quoted(args)?;
        if rest.is_empty() {
            Ok(Self::new(text))
        } else {
            Ok(Self::with_timeout(text, parse_duration(rest)?))
        }
    }

    async fn execute(&self, ctx: &mut Context) -> Result<()> {
        ctx.wait_for_content(&self.text, self.timeout).await
    }
}
