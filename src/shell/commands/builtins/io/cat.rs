// Cat command

use crate::shell::commands::{Builtin, Flow};
use crate::shell::context::ShellContext;
use anyhow::Result;
use std::fs;
use std::io::{BufRead, ErrorKind, Write};

pub struct CatCommand;

impl CatCommand {
    /// Copies stdin to stdout one line at a time until end of input.
    fn copy_lines(stdin: &mut dyn BufRead, stdout: &mut dyn Write) -> Result<()> {
        let mut line = Vec::new();
        loop {
            line.clear();
            if stdin.read_until(b'\n', &mut line)? == 0 {
                return Ok(());
            }
            if !line.ends_with(b"\n") {
                line.push(b'\n');
            }
            stdout.write_all(&line)?;
        }
    }
}

impl Builtin for CatCommand {
    fn execute(
        &self,
        args: &[String],
        ctx: &mut ShellContext,
        stdin: &mut dyn BufRead,
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
    ) -> Result<Flow> {
        if args.len() < 2 {
            Self::copy_lines(stdin, stdout)?;
            return Ok(Flow::Continue(0));
        }

        // A bad file is reported and skipped, the rest still print.
        let mut status = 0;
        for filename in &args[1..] {
            match fs::read(ctx.resolve_path(filename)) {
                Ok(content) => stdout.write_all(&content)?,
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    writeln!(stderr, "cat: {}: No such file or directory", filename)?;
                    status = 1;
                }
                Err(e) => {
                    writeln!(stderr, "cat: {}: {}", filename, e)?;
                    status = 1;
                }
            }
        }

        Ok(Flow::Continue(status))
    }
}
