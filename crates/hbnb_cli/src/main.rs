//! hbnb console entry point.
//!
//! # Responsibility
//! - Resolve configuration from flags and environment.
//! - Start optional file logging, open the store and run the line loop.

mod cli;
mod shell;

use anyhow::{Context, Result};
use clap::Parser;
use cli::Cli;
use hbnb_core::{
    core_version, default_log_level, init_logging, CommandRouter, FileStore, LogSettings,
};
use log::info;
use std::io::{self, IsTerminal};

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(log_dir) = &cli.log_dir {
        let log_dir = if log_dir.is_absolute() {
            log_dir.clone()
        } else {
            std::env::current_dir()
                .context("cannot resolve current directory")?
                .join(log_dir)
        };
        let level = cli.log_level.as_deref().unwrap_or(default_log_level());
        let settings = LogSettings::new(level, &log_dir)?;
        init_logging(&settings)?;
    }

    let mut store = FileStore::open(&cli.file)
        .with_context(|| format!("cannot load store `{}`", cli.file.display()))?;
    info!(
        "event=console_start module=cli status=ok version={} file={} records={}",
        core_version(),
        store.path().display(),
        store.len()
    );

    let stdin = io::stdin();
    let prompt = stdin.is_terminal().then_some(shell::PROMPT);
    let mut router = CommandRouter::new(&mut store);
    shell::run(&mut router, stdin.lock(), &mut io::stdout().lock(), prompt)?;

    info!("event=console_exit module=cli status=ok");
    Ok(())
}
