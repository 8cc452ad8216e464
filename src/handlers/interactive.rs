use crate::config::ShellConfig;
use crate::handlers::completion::ShellHelper;
use crate::handlers::session::Session;
use anyhow::{Context, Result};
use log::debug;
use rustyline::config::{BellStyle, CompletionType, Config};
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;
use std::io::{self, IsTerminal};

/// Runs the read-eval loop until `exit` or end of input and returns the
/// process exit code.
pub fn handle_session(config: &ShellConfig, no_history: bool) -> Result<i32> {
    // The shell itself survives Ctrl-C; foreground children still receive it.
    if let Err(e) = ctrlc::set_handler(|| {}) {
        debug!("could not install interrupt handler: {}", e);
    }

    let mut session = Session::start(config, !no_history);
    let code = if io::stdin().is_terminal() {
        run_editor(&mut session, &config.prompt)?
    } else {
        run_batch(&mut session)?
    };
    Ok(session.shutdown(code))
}

fn run_editor(session: &mut Session, prompt: &str) -> Result<i32> {
    let editor_config = Config::builder()
        .completion_type(CompletionType::List)
        .bell_style(BellStyle::Audible)
        .auto_add_history(false)
        .build();
    let mut editor: Editor<ShellHelper, DefaultHistory> =
        Editor::with_config(editor_config).context("Failed to initialise line editor")?;
    editor.set_helper(Some(ShellHelper::new(session.context())));

    for entry in session.context().history.entries() {
        let _ = editor.add_history_entry(entry.as_str());
    }

    loop {
        match editor.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = editor.add_history_entry(line.as_str());
                }
                if let Some(code) = session.accept(&line) {
                    return Ok(code);
                }
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => return Ok(session.last_status()),
            Err(e) => return Err(e).context("Failed to read input"),
        }
    }
}

/// Input that is not a terminal: one command per line, no prompt.
fn run_batch(session: &mut Session) -> Result<i32> {
    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        line.clear();
        if stdin.read_line(&mut line).context("Failed to read input")? == 0 {
            return Ok(session.last_status());
        }
        if let Some(code) = session.accept(line.trim_end_matches(['\n', '\r'])) {
            return Ok(code);
        }
    }
}
