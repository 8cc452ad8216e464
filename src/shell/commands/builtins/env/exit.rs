// Exit command

use crate::shell::commands::{Builtin, Flow};
use crate::shell::context::ShellContext;
use anyhow::Result;
use std::io::{BufRead, Write};

/// Asks the foreground loop to stop; the loop saves history before exiting.
pub struct ExitCommand;
impl Builtin for ExitCommand {
    fn execute(
        &self,
        args: &[String],
        _ctx: &mut ShellContext,
        _stdin: &mut dyn BufRead,
        _stdout: &mut dyn Write,
        _stderr: &mut dyn Write,
    ) -> Result<Flow> {
        let exit_code = if args.len() > 1 {
            args[1].parse::<i32>().unwrap_or(0)
        } else {
            0
        };
        Ok(Flow::Exit(exit_code))
    }
}
