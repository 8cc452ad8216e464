mod cli;
mod config;
mod handlers;
mod shell;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use config::load_config;
use handlers::{command, interactive};
use std::io::Write;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::new().filter("PASH_LOG")).init();
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    let code = match cli.command {
        Some(line) => command::handle_command(&line, &config),
        None => interactive::handle_session(&config, cli.no_history)?,
    };

    let _ = std::io::stdout().flush();
    std::process::exit(code);
}
