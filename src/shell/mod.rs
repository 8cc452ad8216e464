pub mod ast;
pub mod commands;
pub mod context;
pub mod executor;
pub mod history;
pub mod parser;
pub mod path;
pub mod pipeline;
pub mod redirect;
pub mod relay;

use commands::Flow;
use context::ShellContext;
use executor::execute_pipeline;


/// Parses and runs one input line. Blank lines leave the last status as is.
pub fn run_command_line(line: &str, ctx: &mut ShellContext) -> Flow {
    match parser::parse_command_line(line) {
        Some(pipeline) => execute_pipeline(&pipeline, ctx),
        None => Flow::Continue(ctx.exit_code),
    }
}
