//! [`Click`] command: the user clicks a control.
//!
//! Script syntax: `click "#submit"`

use crate::command::{Context, DriverCommand};
use crate::parser::parse_quoted_string;
use anyhow::{Result, anyhow};
use async_trait::async_trait;

/// Clicks a declared control. If a click gate is intercepting the control
/// the engine sees the click first; otherwise the control just activates.
pub struct Click {
    pub selector: String,
}

impl Click {
    pub const NAME: &'static str = "click";
}

#[async_trait(?Send)]
impl DriverCommand for Click {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(args: &str) -> Result<Self> {
        Ok(Self {
            selector: parse_quoted_string(args)?,
        })
    }

    async fn execute(&self, ctx: &mut Context) -> Result<()> {
        let control = ctx.control(&self.selector)?;
        if !control.click() {
            return Err(anyhow!("Control '{}' is hidden", self.selector));
        }
        ctx.sync();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!(Click::parse(r##""#btn""##).unwrap().selector, "#btn");
    }

    #[test]
    fn test_parse_requires_quotes() {
        assert!(Click::parse("#btn").is_err());
    }
}
