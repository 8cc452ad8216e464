// Echo command

use crate::shell::commands::{Builtin, Flow};
use crate::shell::context::ShellContext;
use anyhow::Result;
use std::io::{BufRead, Write};

pub struct EchoCommand;

impl Builtin for EchoCommand {
    fn execute(
        &self,
        args: &[String],
        _ctx: &mut ShellContext,
        _stdin: &mut dyn BufRead,
        stdout: &mut dyn Write,
        _stderr: &mut dyn Write,
    ) -> Result<Flow> {
        // Skip "echo" in args[0]
        let output = args[1..].join(" ");
        writeln!(stdout, "{}", output)?;
        Ok(Flow::Continue(0))
    }
}
