use crate::shell::commands::{Builtin, Flow};
use crate::shell::context::ShellContext;
use anyhow::Result;
use std::io::{BufRead, Write};

pub struct PwdCommand;
impl Builtin for PwdCommand {
    fn execute(
        &self,
        _args: &[String],
        ctx: &mut ShellContext,
        _stdin: &mut dyn BufRead,
        stdout: &mut dyn Write,
        _stderr: &mut dyn Write,
    ) -> Result<Flow> {
        writeln!(stdout, "{}", ctx.cwd.display())?;
        Ok(Flow::Continue(0))
    }
}
