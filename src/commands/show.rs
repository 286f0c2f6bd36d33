//! [`Show`] command: prints a narrator note between walkthrough output.
//!
//! Script syntax: `show "Now the user gets distracted"`

use crate::command::{Context, DriverCommand};
use crate::parser::parse_quoted_string;
use anyhow::Result;
use async_trait::async_trait;

/// Writes a dimmed note on its own line. The walkthrough surface is not
/// touched.
pub struct Show {
    pub note: String,
}

impl Show {
    pub const NAME: &'static str = "show";

    fn render(&self) -> String {
        format!("\n\x1b[2m-- {}\x1b[0m", self.note)
    }
}

#[async_trait(?Send)]
impl DriverCommand for Show {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(args: &str) -> Result<Self> {
        Ok(Self {
            note: parse_quoted_string(args)?,
        })
    }

    async fn execute(&self, ctx: &mut Context) -> Result<()> {
        ctx.emit(self.render().as_bytes());
        Ok(())
    }
}
