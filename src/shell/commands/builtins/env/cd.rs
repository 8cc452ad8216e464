// Cd command

use crate::shell::commands::builtins::common::expand_home;
use crate::shell::commands::{Builtin, Flow};
use crate::shell::context::ShellContext;
use anyhow::{Result, bail};
use std::io::{BufRead, Write};

pub struct CdCommand;
impl Builtin for CdCommand {
    fn execute(
        &self,
        args: &[String],
        ctx: &mut ShellContext,
        _stdin: &mut dyn BufRead,
        _stdout: &mut dyn Write,
        _stderr: &mut dyn Write,
    ) -> Result<Flow> {
        // No argument means home, same as `cd ~`
        let requested = args.get(1).map(String::as_str).unwrap_or("~");
        let Some(path_str) = expand_home(ctx, requested) else {
            bail!("cd: HOME not set");
        };

        let new_path = ctx.resolve_path(&path_str);
        if new_path.is_dir() {
            // Canonicalize to remove .. and .
            ctx.cwd = new_path.canonicalize().unwrap_or(new_path);
            ctx.env
                .insert("PWD".to_string(), ctx.cwd.to_string_lossy().into_owned());
            Ok(Flow::Continue(0))
        } else if new_path.exists() {
            bail!("cd: {}: Not a directory", path_str);
        } else {
            bail!("cd: {}: No such file or directory", path_str);
        }
    }

    fn uses_redirection(&self) -> bool {
        false
    }
}
