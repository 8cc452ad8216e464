use crate::shell::commands::Registry;
use crate::shell::context::ShellContext;
use crate::shell::parser::{split_pipes, tokenize};
use crate::shell::path::search_executables;
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Helper};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Tab completion for the command word of the stage under the cursor.
pub struct ShellHelper {
    registry: Arc<Registry>,
    search_path: Option<String>,
}

impl ShellHelper {
    pub fn new(ctx: &ShellContext) -> Self {
        Self {
            registry: Arc::clone(&ctx.registry),
            search_path: ctx.var("PATH").map(str::to_string),
        }
    }

    /// Start of the word being completed and the matching command names,
    /// or nothing when the cursor is past the stage's first word.
    pub fn candidates(&self, line: &str, pos: usize) -> Option<(usize, Vec<String>)> {
        let stage = split_pipes(&line[..pos]).pop().unwrap_or_default();
        if stage.ends_with([' ', '\t']) || tokenize(&stage).len() != 1 {
            return None;
        }
        let word = stage.trim_start();

        let mut names: BTreeSet<String> = self
            .registry
            .names()
            .into_iter()
            .filter(|name| name.starts_with(word))
            .map(str::to_string)
            .collect();
        names.extend(search_executables(word, self.search_path.as_deref()));

        Some((pos - word.len(), names.into_iter().collect()))
    }
}

impl Completer for ShellHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let Some((start, names)) = self.candidates(line, pos) else {
            return Ok((pos, Vec::new()));
        };

        // A single match is finished off so the next word can follow.
        let unique = names.len() == 1;
        let pairs = names
            .into_iter()
            .map(|name| Pair {
                replacement: if unique { format!("{} ", name) } else { name.clone() },
                display: name,
            })
            .collect();
        Ok((start, pairs))
    }
}

impl Hinter for ShellHelper {
    type Hint = String;
}

impl Highlighter for ShellHelper {}

impl Validator for ShellHelper {}

impl Helper for ShellHelper {}

#[cfg(test)]
mod tests {
    use super::*;

    fn helper(path: Option<&str>) -> ShellHelper {
        let mut ctx = ShellContext::new();
        match path {
            Some(path) => ctx.env.insert("PATH".to_string(), path.to_string()),
            None => ctx.env.remove("PATH"),
        };
        ShellHelper::new(&ctx)
    }

    #[test]
    fn test_builtin_names_complete() {
        let helper = helper(None);
        assert_eq!(
            helper.candidates("ec", 2),
            Some((0, vec!["echo".to_string()]))
        );
        assert_eq!(
            helper.candidates("h", 1),
            Some((0, vec!["history".to_string()]))
        );
    }

    #[test]
    fn test_only_command_word_completes() {
        let helper = helper(None);
        assert_eq!(helper.candidates("echo ec", 7), None);
        assert_eq!(helper.candidates("", 0), None);
        assert_eq!(
            helper.candidates("echo hi | ca", 12),
            Some((10, vec!["cat".to_string()]))
        );
    }

    #[test]
    fn test_quoted_pipe_does_not_start_a_stage() {
        let helper = helper(None);
        assert_eq!(helper.candidates("echo 'a|b", 9), None);
        assert_eq!(helper.candidates("echo \"x|\" | ec", 14), Some((12, vec!["echo".to_string()])));
    }

    #[cfg(unix)]
    #[test]
    fn test_executables_on_path_complete() {
        use std::fs;
        use std::os::unix::fs::PermissionsExt;
        use tempfile::TempDir;

        let dir = TempDir::new().unwrap();
        for name in ["pash-alpha", "pash-beta"] {
            let file = dir.path().join(name);
            fs::write(&file, "#!/bin/sh\n").unwrap();
            fs::set_permissions(&file, fs::Permissions::from_mode(0o755)).unwrap();
        }
        fs::write(dir.path().join("pash-plain"), "").unwrap();

        let helper = helper(dir.path().to_str());
        assert_eq!(
            helper.candidates("  pash-", 7),
            Some((2, vec!["pash-alpha".to_string(), "pash-beta".to_string()]))
        );
    }
}
