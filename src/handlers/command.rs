use crate::config::ShellConfig;
use crate::handlers::session::Session;

/// `pash -c LINE`: runs one line without touching the history file.
pub fn handle_command(line: &str, config: &ShellConfig) -> i32 {
    let mut session = Session::start(config, false);
    let code = session
        .accept(line)
        .unwrap_or_else(|| session.last_status());
    session.shutdown(code)
}
