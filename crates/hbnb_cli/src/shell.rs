//! Line-reading loop around the command router.

use anyhow::{Context, Result};
use hbnb_core::{CommandRouter, Reply};
use std::io::{BufRead, Write};

pub const PROMPT: &str = "(hbnb) ";

/// Feeds `input` line by line to `router` until `quit`, `EOF` or end of input.
///
/// `prompt` is written before each read when set.
pub fn run<R: BufRead, W: Write>(
    router: &mut CommandRouter<'_>,
    mut input: R,
    output: &mut W,
    prompt: Option<&str>,
) -> Result<()> {
    let mut line = String::new();
    loop {
        if let Some(prompt) = prompt {
            write!(output, "{prompt}")?;
            output.flush()?;
        }

        line.clear();
        let reply = if input.read_line(&mut line).context("failed to read input")? == 0 {
            router.handle_line("EOF")?
        } else {
            router.handle_line(&line)?
        };

        match reply {
            Reply::Silent => {}
            Reply::Line(text) => writeln!(output, "{text}")?,
            Reply::Exit { newline } => {
                if newline {
                    writeln!(output)?;
                }
                output.flush()?;
                return Ok(());
            }
        }
    }
}
