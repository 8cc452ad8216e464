pub mod builtins;
pub mod system;

use crate::shell::context::ShellContext;
use anyhow::Result;
use std::collections::HashMap;
use std::io::{BufRead, Write};

/// What the foreground loop should do after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep reading input; carries the command's exit status.
    Continue(i32),
    /// `exit` was requested with this code.
    Exit(i32),
}

impl Flow {
    pub fn status(self) -> i32 {
        match self {
            Flow::Continue(code) | Flow::Exit(code) => code,
        }
    }
}

/// A command implemented inside the shell.
///
/// `args[0]` is the command name. Streams are passed in explicitly so the
/// same builtin can write to the terminal, a file, or a pipeline buffer.
pub trait Builtin: Send + Sync {
    fn execute(
        &self,
        args: &[String],
        ctx: &mut ShellContext,
        stdin: &mut dyn BufRead,
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
    ) -> Result<Flow>;

    /// Whether `>`/`2>` targets are opened around this builtin.
    fn uses_redirection(&self) -> bool {
        true
    }
}

/// Name → builtin table, built once per shell.
#[derive(Default)]
pub struct Registry {
    commands: HashMap<&'static str, Box<dyn Builtin>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &'static str, command: Box<dyn Builtin>) {
        self.commands.insert(name, command);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Builtin> {
        self.commands.get(name).map(|command| command.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    /// Sorted builtin names, for completion.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.commands.keys().copied().collect();
        names.sort_unstable();
        names
    }
}
