/// A word produced by the tokenizer.
///
/// `bare_prefix` counts the leading bytes of `text` that were written without
/// quotes or escapes. Only those bytes can form a redirection operator, so
/// `'>' x` stays a literal argument while `>'my file'` still redirects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Word {
    pub text: String,
    pub bare_prefix: usize,
}

impl Word {
    #[cfg(test)]
    pub fn bare(text: &str) -> Self {
        Self {
            text: text.to_string(),
            bare_prefix: text.len(),
        }
    }

    /// The part of the word an operator may be read from.
    pub fn bare_head(&self) -> &str {
        &self.text[..self.bare_prefix]
    }
}

/// Output/error destinations attached to one stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Redirections {
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    /// One flag per stage: the last operator seen decides append vs truncate.
    pub append: bool,
}

/// One stage of a pipeline: `grep -n foo 2> err.txt`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    name: String,
    args: Vec<String>,
    redirections: Redirections,
    raw: String,
}

impl Command {
    /// Builds a command from the residual words of a stage.
    /// Returns `None` when no words are left, so a command never has an empty name.
    pub fn new(mut words: Vec<String>, redirections: Redirections, raw: &str) -> Option<Self> {
        if words.is_empty() {
            return None;
        }
        let name = words.remove(0);
        Some(Self {
            name,
            args: words,
            redirections,
            raw: raw.to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Name followed by arguments, the shape builtins receive.
    pub fn argv(&self) -> Vec<String> {
        let mut argv = Vec::with_capacity(self.args.len() + 1);
        argv.push(self.name.clone());
        argv.extend(self.args.iter().cloned());
        argv
    }

    pub fn output_target(&self) -> Option<&str> {
        self.redirections.stdout.as_deref()
    }

    pub fn error_target(&self) -> Option<&str> {
        self.redirections.stderr.as_deref()
    }

    pub fn append(&self) -> bool {
        self.redirections.append
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }
}

/// Stages connected by `|`, never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    stages: Vec<Command>,
}

impl Pipeline {
    pub fn new(stages: Vec<Command>) -> Option<Self> {
        if stages.is_empty() {
            None
        } else {
            Some(Self { stages })
        }
    }

    pub fn stages(&self) -> &[Command] {
        &self.stages
    }

    pub fn first(&self) -> &Command {
        &self.stages[0]
    }

    pub fn is_multi_stage(&self) -> bool {
        self.stages.len() > 1
    }
}
