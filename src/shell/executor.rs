use crate::shell::ast::{Command, Pipeline};
use crate::shell::commands::system::{SPAWN_FAILED_STATUS, run_external};
use crate::shell::commands::{Builtin, Flow};
use crate::shell::context::ShellContext;
use crate::shell::pipeline::PipelineRunner;
use crate::shell::redirect::{report_failure, with_redirection};
use std::io::{self, BufRead, Write};
use std::sync::Arc;

/// Runs a parsed line and records its status in the context.
pub fn execute_pipeline(pipeline: &Pipeline, ctx: &mut ShellContext) -> Flow {
    let flow = if pipeline.is_multi_stage() {
        PipelineRunner::new(ctx).run(pipeline)
    } else {
        dispatch_single(pipeline.first(), ctx)
    };
    ctx.exit_code = flow.status();
    flow
}

fn dispatch_single(cmd: &Command, ctx: &mut ShellContext) -> Flow {
    let registry = Arc::clone(&ctx.registry);
    let mut stderr = io::stderr().lock();

    match registry.get(cmd.name()) {
        Some(builtin) => {
            let mut stdin = io::stdin().lock();
            let mut stdout = io::stdout().lock();
            run_builtin(builtin, cmd, ctx, &mut stdin, &mut stdout, &mut stderr)
        }
        None => match run_external(cmd, ctx, &mut stderr) {
            Ok(code) => Flow::Continue(code),
            Err(e) => {
                let _ = writeln!(stderr, "{:#}", e);
                Flow::Continue(SPAWN_FAILED_STATUS)
            }
        },
    }
}

/// Runs one builtin with the given streams, applying its redirections unless
/// the builtin opts out. Failures are reported on the active error stream.
pub(crate) fn run_builtin(
    builtin: &dyn Builtin,
    cmd: &Command,
    ctx: &mut ShellContext,
    stdin: &mut dyn BufRead,
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
) -> Flow {
    let args = cmd.argv();

    let flow = if builtin.uses_redirection() {
        let result = with_redirection(cmd, ctx, stdout, stderr, |ctx, out, err| {
            builtin.execute(&args, ctx, stdin, out, err)
        });
        result.unwrap_or_else(|e| {
            let _ = writeln!(stderr, "pash: {:#}", e);
            Flow::Continue(1)
        })
    } else {
        builtin
            .execute(&args, ctx, stdin, stdout, stderr)
            .unwrap_or_else(|e| report_failure(&e, stderr))
    };

    let _ = stdout.flush();
    flow
}
