use crate::shell::commands::{Builtin, Flow};
use crate::shell::context::ShellContext;
use anyhow::{Context, Result, bail};
use std::io::{BufRead, Write};
use std::path::PathBuf;

/// What a `history` invocation asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryRequest {
    /// Print everything, or only the last `n` entries.
    Show(Option<usize>),
    Read(Option<String>),
    Write(Option<String>),
    Append(Option<String>),
}

impl HistoryRequest {
    /// Separates the `-r/-w/-a [path]` file forms from the numeric form.
    pub fn parse(args: &[String]) -> Result<Self> {
        let mut rest = args.iter().skip(1);
        let first = rest.next();
        let path = rest.next().cloned();
        let file_form = matches!(first.map(String::as_str), Some("-r" | "-w" | "-a"));
        if rest.next().is_some() || (!file_form && path.is_some()) {
            bail!("history: too many arguments");
        }

        let request = match first.map(String::as_str) {
            None => Self::Show(None),
            Some("-r") => Self::Read(path),
            Some("-w") => Self::Write(path),
            Some("-a") => Self::Append(path),
            Some(count) => match count.parse::<usize>() {
                Ok(n) => Self::Show(Some(n)),
                Err(_) => bail!("history: {}: numeric argument required", count),
            },
        };
        Ok(request)
    }
}

fn history_file(ctx: &ShellContext, explicit: Option<String>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(ctx.resolve_path(&path)),
        None => ctx.history_file.clone().context("history: no history file"),
    }
}

pub struct HistoryCommand;
impl Builtin for HistoryCommand {
    fn execute(
        &self,
        args: &[String],
        ctx: &mut ShellContext,
        _stdin: &mut dyn BufRead,
        stdout: &mut dyn Write,
        _stderr: &mut dyn Write,
    ) -> Result<Flow> {
        match HistoryRequest::parse(args)? {
            HistoryRequest::Show(limit) => {
                let n = limit.unwrap_or(ctx.history.len());
                for (index, entry) in ctx.history.last(n) {
                    writeln!(stdout, "{:>5}  {}", index, entry)?;
                }
            }
            HistoryRequest::Read(path) => {
                let path = history_file(ctx, path)?;
                ctx.history.read_from(&path).context("history")?;
            }
            HistoryRequest::Write(path) => {
                let path = history_file(ctx, path)?;
                ctx.history.write_to(&path).context("history")?;
            }
            HistoryRequest::Append(path) => {
                let path = history_file(ctx, path)?;
                ctx.history.append_to(&path).context("history")?;
            }
        }
        Ok(Flow::Continue(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Result<HistoryRequest> {
        let args: Vec<String> = line.split_whitespace().map(str::to_string).collect();
        HistoryRequest::parse(&args)
    }

    #[test]
    fn test_parse_forms() {
        assert_eq!(parse("history").unwrap(), HistoryRequest::Show(None));
        assert_eq!(parse("history 3").unwrap(), HistoryRequest::Show(Some(3)));
        assert_eq!(parse("history -r").unwrap(), HistoryRequest::Read(None));
        assert_eq!(
            parse("history -a hist.txt").unwrap(),
            HistoryRequest::Append(Some("hist.txt".to_string()))
        );
    }

    #[test]
    fn test_parse_rejects_extra_arguments() {
        for line in ["history 3 4", "history -w a b", "history abc def"] {
            let err = parse(line).unwrap_err();
            assert_eq!(err.to_string(), "history: too many arguments", "{}", line);
        }
    }
}
