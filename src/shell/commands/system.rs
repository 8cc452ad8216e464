// External programs
use crate::shell::ast::Command;
use crate::shell::context::ShellContext;
use crate::shell::path::{find_in_path, is_executable};
use crate::shell::redirect::RedirectFiles;
use anyhow::{Context, Result};
use log::debug;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{self, ExitStatus, Stdio};

/// Status reported for a command that could not be found.
pub const NOT_FOUND_STATUS: i32 = 127;
/// Status reported for a program that was found but could not be started.
pub const SPAWN_FAILED_STATUS: i32 = 126;

/// Finds the program for `name`. Names with a slash are taken as paths,
/// everything else is searched for in `PATH`.
pub fn resolve_program(name: &str, ctx: &ShellContext) -> Option<PathBuf> {
    if name.contains('/') {
        let path = ctx.resolve_path(name);
        return is_executable(&path).then_some(path);
    }
    find_in_path(name, ctx.var("PATH"))
}

/// Prepares a process for `cmd`: argv[0] is the name the user typed,
/// the working directory and environment come from the shell context.
pub fn build_command(program: &Path, cmd: &Command, ctx: &ShellContext) -> process::Command {
    let mut command = process::Command::new(program);

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.arg0(cmd.name());
    }

    command
        .args(cmd.args())
        .current_dir(&ctx.cwd)
        .env_clear()
        .envs(&ctx.env);

    debug!(
        "prepared {} as {}",
        shell_words::join(cmd.argv()),
        program.display()
    );
    command
}

pub fn status_code(status: ExitStatus) -> i32 {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    status.code().unwrap_or(1)
}

/// Runs a single external command in the foreground and waits for it.
///
/// Redirect targets become the child's own stdout/stderr. A missing program or
/// an unopenable target is reported on `stderr` and is not an error for the
/// caller; only failing to start or wait for the process is.
pub fn run_external(cmd: &Command, ctx: &ShellContext, stderr: &mut dyn Write) -> Result<i32> {
    let Some(program) = resolve_program(cmd.name(), ctx) else {
        writeln!(stderr, "{}: command not found", cmd.name())?;
        return Ok(NOT_FOUND_STATUS);
    };

    let files = match RedirectFiles::open(cmd, ctx) {
        Ok(files) => files,
        Err(e) => {
            writeln!(stderr, "pash: {:#}", e)?;
            return Ok(1);
        }
    };
    let mut command = build_command(&program, cmd, ctx);
    command.stdin(Stdio::inherit());
    command.stdout(files.stdout.map(Stdio::from).unwrap_or_else(Stdio::inherit));
    command.stderr(files.stderr.map(Stdio::from).unwrap_or_else(Stdio::inherit));

    let mut child = command
        .spawn()
        .with_context(|| format!("{}: failed to start", cmd.name()))?;
    let status = child
        .wait()
        .with_context(|| format!("{}: failed to wait", cmd.name()))?;

    debug!("{} exited with {}", cmd.name(), status);
    Ok(status_code(status))
}
