use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use crate::config::PipelineSettings;
use crate::shell::commands::Registry;
use crate::shell::commands::builtins::builtin_registry;
use crate::shell::history::History;

pub const HISTFILE_ENV: &str = "HISTFILE";

/// Keeps the variables whose name and value are valid UTF-8; the rest are
/// left out of the shell's environment.
fn env_snapshot(vars: impl Iterator<Item = (OsString, OsString)>) -> HashMap<String, String> {
    vars.filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
        .collect()
}

/// Everything a command can observe or change about the running shell.
pub struct ShellContext {
    pub cwd: PathBuf,
    pub env: HashMap<String, String>,
    pub exit_code: i32,
    pub history: History,
    /// Default target of `history -r/-w/-a` and of session load/save.
    pub history_file: Option<PathBuf>,
    pub settings: PipelineSettings,
    pub registry: Arc<Registry>,
}

impl ShellContext {
    pub fn new() -> Self {
        Self::with_settings(PipelineSettings::default())
    }

    pub fn with_settings(settings: PipelineSettings) -> Self {
        let env = env_snapshot(std::env::vars_os());
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let history_file = env.get(HISTFILE_ENV).map(PathBuf::from);
        Self {
            cwd,
            env,
            exit_code: 0,
            history: History::new(),
            history_file,
            settings,
            registry: Arc::new(builtin_registry()),
        }
    }

    pub fn var(&self, key: &str) -> Option<&str> {
        self.env.get(key).map(String::as_str)
    }

    pub fn is_builtin(&self, name: &str) -> bool {
        self.registry.contains(name)
    }

    /// Resolves a user-supplied path against the shell's working directory.
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        let p = Path::new(path);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.cwd.join(p)
        }
    }
}

impl Default for ShellContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_snapshot_keeps_utf8_pairs() {
        let vars = vec![
            (OsString::from("HOME"), OsString::from("/home/me")),
            (OsString::from("EMPTY"), OsString::new()),
        ];
        let env = env_snapshot(vars.into_iter());
        assert_eq!(env.len(), 2);
        assert_eq!(env["HOME"], "/home/me");
        assert_eq!(env["EMPTY"], "");
    }

    #[cfg(unix)]
    #[test]
    fn test_env_snapshot_skips_invalid_utf8() {
        use std::os::unix::ffi::OsStringExt;

        let vars = vec![
            (OsString::from("GOOD"), OsString::from("yes")),
            (OsString::from("BAD_VALUE"), OsString::from_vec(vec![b'a', 0xff])),
            (OsString::from_vec(vec![0xfe, b'K']), OsString::from("v")),
        ];
        let env = env_snapshot(vars.into_iter());
        assert_eq!(env.len(), 1);
        assert_eq!(env["GOOD"], "yes");
    }
}
