//! [`DeclareControl`] command: makes a control exist on the simulated page.
//!
//! Script syntax:
//! - `control "#submit"`: a visible control
//! - `control "#secret" hidden`: starts hidden (e.g. for reveal actions)

use crate::command::{Context, DriverCommand};
use crate::parser::take_quoted;
use anyhow::{Result, anyhow};
use async_trait::async_trait;

pub struct DeclareControl {
    pub selector: String,
    pub visible: bool,
}

impl DeclareControl {
    pub const NAME: &'static str = "control";
}

#[async_trait(?Send)]
impl DriverCommand for DeclareControl {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(args: &str) -> Result<Self> {
        let (selector, rest) = take_quoted(args)?;
        let visible = match rest {
            "" | "visible" => true,
            "hidden" => false,
            other => return Err(anyhow!("Expected 'hidden' or 'visible', got: {}", other)),
        };
        Ok(Self { selector, visible })
    }

    async fn execute(&self, ctx: &mut Context) -> Result<()> {
        ctx.controls().declare(&self.selector, self.visible);
        Ok(())
    }
}
