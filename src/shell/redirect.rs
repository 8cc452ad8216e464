use crate::shell::ast::Command;
use crate::shell::commands::Flow;
use crate::shell::context::ShellContext;
use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::Path;

/// Status of a builtin whose reader went away, as for a process killed by SIGPIPE.
pub const BROKEN_PIPE_STATUS: i32 = 141;

/// Files opened for a command's `>`/`2>` targets.
///
/// When both targets name the same path the file is opened once and the
/// handle duplicated, so the two streams share one offset.
#[derive(Debug, Default)]
pub struct RedirectFiles {
    pub stdout: Option<File>,
    pub stderr: Option<File>,
}

fn open_target(path: &Path, append: bool) -> Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create(true);
    if append {
        options.append(true);
    } else {
        options.truncate(true);
    }
    options
        .open(path)
        .with_context(|| format!("{}", path.display()))
}

impl RedirectFiles {
    pub fn open(cmd: &Command, ctx: &ShellContext) -> Result<Self> {
        let stdout_path = cmd.output_target().map(|t| ctx.resolve_path(t));
        let stderr_path = cmd.error_target().map(|t| ctx.resolve_path(t));

        let stdout = stdout_path
            .as_deref()
            .map(|path| open_target(path, cmd.append()))
            .transpose()?;

        let stderr = match (&stderr_path, &stdout) {
            (Some(err_path), Some(out_file)) if stdout_path.as_ref() == Some(err_path) => Some(
                out_file
                    .try_clone()
                    .with_context(|| format!("{}", err_path.display()))?,
            ),
            (Some(err_path), _) => Some(open_target(err_path, cmd.append())?),
            (None, _) => None,
        };

        Ok(Self { stdout, stderr })
    }
}

/// Runs `action` with the command's redirect targets as its output and error
/// streams, falling back to `stdout`/`stderr` for streams without a target.
/// The context is handed back to `action` once the targets are open.
///
/// Errors raised by `action` are written to the active error stream and turn
/// into status 1. Only a failure to open a target is returned as `Err`, in
/// which case `action` never runs. Opened files are flushed and closed before
/// returning, whatever the outcome.
pub fn with_redirection<F>(
    cmd: &Command,
    ctx: &mut ShellContext,
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
    action: F,
) -> Result<Flow>
where
    F: FnOnce(&mut ShellContext, &mut dyn Write, &mut dyn Write) -> Result<Flow>,
{
    let mut files = RedirectFiles::open(cmd, ctx)?;

    let out: &mut dyn Write = match files.stdout.as_mut() {
        Some(file) => file,
        None => stdout,
    };
    let err: &mut dyn Write = match files.stderr.as_mut() {
        Some(file) => file,
        None => stderr,
    };

    let flow = action(ctx, &mut *out, &mut *err).unwrap_or_else(|e| report_failure(&e, err));

    let _ = out.flush();
    let _ = err.flush();
    Ok(flow)
}

/// Writes a builtin's error to `err` and turns it into a status. A write into
/// a closed pipe is not reported.
pub(crate) fn report_failure(e: &anyhow::Error, err: &mut dyn Write) -> Flow {
    let broken_pipe = e
        .chain()
        .filter_map(|cause| cause.downcast_ref::<io::Error>())
        .any(|io_err| io_err.kind() == ErrorKind::BrokenPipe);
    if broken_pipe {
        return Flow::Continue(BROKEN_PIPE_STATUS);
    }
    let _ = writeln!(err, "{:#}", e);
    Flow::Continue(1)
}
