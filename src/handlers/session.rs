use crate::config::ShellConfig;
use crate::shell::commands::Flow;
use crate::shell::context::ShellContext;
use crate::shell::history::History;
use crate::shell::run_command_line;
use colored::*;
use log::debug;

/// One shell session: the context plus history persistence around it.
pub struct Session {
    ctx: ShellContext,
    persist: bool,
}

impl Session {
    /// `$HISTFILE` wins over the configured `history-file`. With `persist`
    /// the file is loaded now and rewritten by [`Session::shutdown`].
    pub fn start(config: &ShellConfig, persist: bool) -> Self {
        let mut ctx = ShellContext::with_settings(config.pipeline);
        if ctx.history_file.is_none() {
            ctx.history_file = config.history_file.clone();
        }

        if persist {
            if let Some(path) = ctx.history_file.as_deref().filter(|p| p.exists()) {
                match History::load(path) {
                    Ok(history) if history.is_empty() => {}
                    Ok(history) => {
                        debug!("loaded {} history entries from {}", history.len(), path.display());
                        ctx.history = history;
                    }
                    Err(e) => eprintln!("{} {:#}", "⚠️".yellow(), e),
                }
            }
        }

        Self { ctx, persist }
    }

    pub fn context(&self) -> &ShellContext {
        &self.ctx
    }

    pub fn last_status(&self) -> i32 {
        self.ctx.exit_code
    }

    /// Records and runs one input line. Returns the exit code once `exit` ran.
    pub fn accept(&mut self, line: &str) -> Option<i32> {
        self.ctx.history.add(line);
        match run_command_line(line, &mut self.ctx) {
            Flow::Continue(_) => None,
            Flow::Exit(code) => Some(code),
        }
    }

    /// Saves history if this session persists it and hands back `code`.
    pub fn shutdown(mut self, code: i32) -> i32 {
        if !self.persist {
            return code;
        }
        if let Some(path) = self.ctx.history_file.clone() {
            if let Err(e) = self.ctx.history.write_to(&path) {
                eprintln!("{} Failed to save history: {:#}", "⚠️".yellow(), e);
            }
        }
        code
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn config_with_history(path: &std::path::Path) -> ShellConfig {
        ShellConfig {
            history_file: Some(path.to_path_buf()),
            ..ShellConfig::default()
        }
    }

    #[test]
    fn test_accept_records_history_and_exit() {
        let mut session = Session::start(&ShellConfig::default(), false);
        session.ctx.history = History::new();

        assert_eq!(session.accept("   "), None);
        assert_eq!(session.accept("exit 9"), Some(9));
        assert_eq!(session.context().history.entries(), ["exit 9"]);
    }

    #[test]
    fn test_history_persists_between_sessions() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hist");
        fs::write(&path, "echo earlier\n").unwrap();
        let config = config_with_history(&path);

        let mut session = Session::start(&config, true);
        session.ctx.history_file = Some(path.clone());
        session.ctx.history = History::load(&path).unwrap();
        session.ctx.cwd = dir.path().to_path_buf();
        session.accept("echo later > out.txt");
        assert_eq!(session.shutdown(0), 0);

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "echo earlier\necho later > out.txt\n"
        );
    }

    #[test]
    fn test_no_persist_leaves_file_alone() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hist");
        fs::write(&path, "echo earlier\n").unwrap();

        let mut session = Session::start(&config_with_history(&path), false);
        session.ctx.history_file = Some(path.clone());
        session.ctx.cwd = dir.path().to_path_buf();
        session.accept("echo later > out.txt");
        session.shutdown(0);

        assert_eq!(fs::read_to_string(&path).unwrap(), "echo earlier\n");
    }
}
