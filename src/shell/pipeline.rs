use crate::shell::ast::{Command, Pipeline};
use crate::shell::commands::system::{
    NOT_FOUND_STATUS, SPAWN_FAILED_STATUS, build_command, resolve_program, status_code,
};
use crate::shell::commands::{Builtin, Flow};
use crate::shell::context::ShellContext;
use crate::shell::executor::run_builtin;
use crate::shell::redirect::RedirectFiles;
use crate::shell::relay::Relays;
use log::{debug, warn};
use std::io::{self, BufRead, BufReader, BufWriter, Cursor, ErrorKind, Read, Write};
use std::process::{Child, ChildStdin, ChildStdout, Stdio};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;
use wait_timeout::ChildExt;

/// Where the next stage takes its input from.
enum Upstream {
    /// The shell's own stdin (first stage only).
    Terminal,
    /// Captured builtin output, or nothing after a failed stage.
    Buffer(Vec<u8>),
    /// Live stdout of the previous process.
    Pipe(ChildStdout),
    /// Process output collected in the background while a builtin further
    /// up the chain is still running.
    Draining(JoinHandle<Vec<u8>>),
    /// Written by the builtin that runs once this stage has started.
    Feed,
}

impl Upstream {
    fn empty() -> Self {
        Upstream::Buffer(Vec::new())
    }

    fn into_reader(self) -> Box<dyn BufRead> {
        match self {
            Upstream::Terminal => Box::new(io::stdin().lock()),
            Upstream::Buffer(bytes) => Box::new(Cursor::new(bytes)),
            Upstream::Pipe(pipe) => Box::new(BufReader::new(pipe)),
            Upstream::Draining(handle) => Box::new(Cursor::new(handle.join().unwrap_or_default())),
            Upstream::Feed => Box::new(io::empty()),
        }
    }
}

/// Output of a builtin whose downstream process never started.
struct ClosedPipe;

impl Write for ClosedPipe {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::from(ErrorKind::BrokenPipe))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Reads a process's stdout to the end on a background thread.
fn drain(mut pipe: ChildStdout, label: &str) -> Upstream {
    let spawned = thread::Builder::new()
        .name(format!("drain:{}", label))
        .spawn(move || {
            let mut bytes = Vec::new();
            if let Err(e) = pipe.read_to_end(&mut bytes) {
                debug!("drain stopped: {}", e);
            }
            bytes
        });
    match spawned {
        Ok(handle) => Upstream::Draining(handle),
        Err(e) => {
            warn!("{}: failed to start output drain: {}", label, e);
            Upstream::empty()
        }
    }
}

struct RunningStage {
    name: String,
    child: Child,
}

/// Result of setting up one stage.
struct StageOutcome {
    flow: Flow,
    output: Upstream,
    /// A process was started and pushed onto the running list.
    spawned: bool,
    /// The stage's stdin, when its input is fed by a builtin.
    feed: Option<ChildStdin>,
}

impl StageOutcome {
    fn failed(status: i32) -> Self {
        Self {
            flow: Flow::Continue(status),
            output: Upstream::empty(),
            spawned: false,
            feed: None,
        }
    }
}

/// Runs a pipeline of two or more stages.
///
/// Builtins run in order on the calling thread; every external stage is its
/// own process. A builtin followed by processes starts them first and writes
/// straight into the next one's stdin, so it stops as soon as that reader
/// goes away. Between two builtins the output is buffered. A process's output
/// is read directly by a following builtin or relayed into a following
/// process's stdin. The pipeline finishes when its last stage does; earlier
/// processes then get a grace period before they are killed.
pub struct PipelineRunner<'a> {
    ctx: &'a mut ShellContext,
    stages: Vec<RunningStage>,
    relays: Relays,
}

impl<'a> PipelineRunner<'a> {
    pub fn new(ctx: &'a mut ShellContext) -> Self {
        let relays = Relays::new(ctx.settings.relay_chunk_size);
        Self {
            ctx,
            stages: Vec::new(),
            relays,
        }
    }

    pub fn run(mut self, pipeline: &Pipeline) -> Flow {
        let registry = Arc::clone(&self.ctx.registry);
        let stages = pipeline.stages();
        let count = stages.len();
        let mut upstream = Upstream::Terminal;
        let mut flow = Flow::Continue(0);
        let mut wait_for_last = false;
        let mut index = 0;

        while index < count {
            let cmd = &stages[index];
            let is_last = index + 1 == count;
            let input = std::mem::replace(&mut upstream, Upstream::Terminal);
            debug!("stage {}/{}: {}", index + 1, count, cmd.raw().trim());

            let Some(builtin) = registry.get(cmd.name()) else {
                let outcome = self.start_external(cmd, input, is_last);
                flow = outcome.flow;
                upstream = outcome.output;
                wait_for_last = is_last && outcome.spawned;
                index += 1;
                continue;
            };

            let feeds_process = stages
                .get(index + 1)
                .is_some_and(|next| !registry.contains(next.name()));
            if !feeds_process {
                let outcome = self.run_builtin_stage(builtin, cmd, input, is_last);
                flow = outcome.flow;
                upstream = outcome.output;
                wait_for_last = false;
                index += 1;
            } else {
                // Start the run of processes after the builtin, up to the next
                // builtin or the end of the line.
                let chain_end = stages[index + 1..]
                    .iter()
                    .position(|next| registry.contains(next.name()))
                    .map_or(count, |offset| index + 1 + offset);

                let mut chain_input = Upstream::Feed;
                let mut feed = None;
                for (position, next) in stages.iter().enumerate().take(chain_end).skip(index + 1) {
                    let next_is_last = position + 1 == count;
                    let outcome = self.start_external(next, chain_input, next_is_last);
                    if position == index + 1 {
                        feed = outcome.feed;
                    }
                    flow = outcome.flow;
                    chain_input = outcome.output;
                    wait_for_last = next_is_last && outcome.spawned;
                }
                upstream = match chain_input {
                    Upstream::Pipe(pipe) if chain_end < count => drain(pipe, stages[chain_end - 1].name()),
                    other => other,
                };

                let builtin_flow = self.feed_builtin(builtin, cmd, input, feed);
                if let Flow::Exit(_) = builtin_flow {
                    flow = builtin_flow;
                    wait_for_last = false;
                }
                index = chain_end;
            }

            if let Flow::Exit(_) = flow {
                debug!("exit requested inside pipeline at stage {}", index);
                break;
            }
        }
        drop(upstream);

        if wait_for_last {
            if let Some(mut last) = self.stages.pop() {
                flow = match last.child.wait() {
                    Ok(status) => {
                        debug!("{} exited with {}", last.name, status);
                        Flow::Continue(status_code(status))
                    }
                    Err(e) => {
                        eprintln!("{}: failed to wait: {}", last.name, e);
                        Flow::Continue(1)
                    }
                };
            }
        }

        self.finish();
        flow
    }

    fn run_builtin_stage(
        &mut self,
        builtin: &dyn Builtin,
        cmd: &Command,
        input: Upstream,
        is_last: bool,
    ) -> StageOutcome {
        let mut stdin = input.into_reader();
        let mut stderr = io::stderr().lock();

        if is_last {
            let mut stdout = io::stdout().lock();
            let flow = run_builtin(builtin, cmd, self.ctx, &mut *stdin, &mut stdout, &mut stderr);
            return StageOutcome {
                flow,
                output: Upstream::Terminal,
                spawned: false,
                feed: None,
            };
        }

        let mut captured = Vec::new();
        let flow = run_builtin(builtin, cmd, self.ctx, &mut *stdin, &mut captured, &mut stderr);
        debug!("{} produced {} bytes for the next stage", cmd.name(), captured.len());
        StageOutcome {
            flow,
            output: Upstream::Buffer(captured),
            spawned: false,
            feed: None,
        }
    }

    /// Runs a builtin whose output goes into an already running process.
    /// Dropping the writer afterwards closes that process's stdin.
    fn feed_builtin(
        &mut self,
        builtin: &dyn Builtin,
        cmd: &Command,
        input: Upstream,
        feed: Option<ChildStdin>,
    ) -> Flow {
        let mut stdin = input.into_reader();
        let mut stderr = io::stderr().lock();
        match feed {
            Some(pipe) => {
                let mut stdout = BufWriter::new(pipe);
                run_builtin(builtin, cmd, self.ctx, &mut *stdin, &mut stdout, &mut stderr)
            }
            None => run_builtin(builtin, cmd, self.ctx, &mut *stdin, &mut ClosedPipe, &mut stderr),
        }
    }

    fn start_external(&mut self, cmd: &Command, input: Upstream, is_last: bool) -> StageOutcome {
        let Some(program) = resolve_program(cmd.name(), self.ctx) else {
            eprintln!("{}: command not found", cmd.name());
            return StageOutcome::failed(NOT_FOUND_STATUS);
        };

        let files = match RedirectFiles::open(cmd, self.ctx) {
            Ok(files) => files,
            Err(e) => {
                eprintln!("pash: {:#}", e);
                return StageOutcome::failed(1);
            }
        };

        let mut command = build_command(&program, cmd, self.ctx);
        command.stdin(match input {
            Upstream::Terminal => Stdio::inherit(),
            _ => Stdio::piped(),
        });
        command.stdout(match files.stdout {
            Some(file) => Stdio::from(file),
            None if is_last => Stdio::inherit(),
            None => Stdio::piped(),
        });
        command.stderr(files.stderr.map(Stdio::from).unwrap_or_else(Stdio::inherit));

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                eprintln!("{}: failed to start: {}", cmd.name(), e);
                return StageOutcome::failed(SPAWN_FAILED_STATUS);
            }
        };
        debug!("started {} (pid {})", cmd.name(), child.id());

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        self.stages.push(RunningStage {
            name: cmd.name().to_string(),
            child,
        });

        let mut feed = None;
        if let Some(stdin) = stdin {
            let relayed = match input {
                Upstream::Buffer(bytes) => self.relays.spawn(cmd.name(), Cursor::new(bytes), stdin),
                Upstream::Pipe(pipe) => self.relays.spawn(cmd.name(), pipe, stdin),
                Upstream::Draining(handle) => {
                    let bytes = handle.join().unwrap_or_default();
                    self.relays.spawn(cmd.name(), Cursor::new(bytes), stdin)
                }
                Upstream::Feed => {
                    feed = Some(stdin);
                    Ok(())
                }
                Upstream::Terminal => Ok(()),
            };
            if let Err(e) = relayed {
                warn!("{:#}", e);
            }
        }

        StageOutcome {
            flow: Flow::Continue(0),
            output: stdout.map(Upstream::Pipe).unwrap_or_else(Upstream::empty),
            spawned: true,
            feed,
        }
    }

    /// Reaps the earlier stages within one shared grace period, then joins
    /// the relays with a bounded wait.
    fn finish(self) {
        let PipelineRunner {
            ctx,
            stages,
            relays,
        } = self;

        let deadline = Instant::now() + ctx.settings.grace_period();
        for mut stage in stages {
            reap(&mut stage, deadline);
        }

        let abandoned = relays.join(ctx.settings.relay_timeout());
        if abandoned > 0 {
            debug!("{} relay(s) left behind", abandoned);
        }
    }
}

fn reap(stage: &mut RunningStage, deadline: Instant) {
    let remaining = deadline.saturating_duration_since(Instant::now());
    match stage.child.wait_timeout(remaining) {
        Ok(Some(status)) => debug!("{} exited with {}", stage.name, status),
        Ok(None) => {
            warn!("{} still running after grace period, killing it", stage.name);
            let _ = stage.child.kill();
            let _ = stage.child.wait();
        }
        Err(e) => debug!("{}: wait failed: {}", stage.name, e),
    }
}
