use crate::shell::commands::system::resolve_program;
use crate::shell::commands::{Builtin, Flow};
use crate::shell::context::ShellContext;
use anyhow::Result;
use std::io::{BufRead, Write};

/// Tells whether each name is a builtin, a program on the search path, or unknown.
pub struct TypeCommand;
impl Builtin for TypeCommand {
    fn execute(
        &self,
        args: &[String],
        ctx: &mut ShellContext,
        _stdin: &mut dyn BufRead,
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
    ) -> Result<Flow> {
        if args.len() < 2 {
            writeln!(stderr, "type: missing operand")?;
            return Ok(Flow::Continue(1));
        }

        let mut status = 0;
        for name in &args[1..] {
            if ctx.is_builtin(name) {
                writeln!(stdout, "{} is a shell builtin", name)?;
            } else if let Some(path) = resolve_program(name, ctx) {
                writeln!(stdout, "{} is {}", name, path.display())?;
            } else {
                writeln!(stdout, "{}: not found", name)?;
                status = 1;
            }
        }
        Ok(Flow::Continue(status))
    }
}
