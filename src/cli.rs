use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pash", version, about = "pash: a small POSIX-style shell")]
pub struct Cli {
    /// Run a single command line and exit with its status
    #[arg(short = 'c', long = "command", value_name = "LINE")]
    pub command: Option<String>,

    /// Read configuration from this file instead of ~/.pash.toml
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Neither load nor save the history file
    #[arg(long = "no-history")]
    pub no_history: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_flag() {
        let cli = Cli::try_parse_from(["pash", "-c", "echo hi | cat"]).unwrap();
        assert_eq!(cli.command.as_deref(), Some("echo hi | cat"));
        assert!(!cli.no_history);
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_session_flags() {
        let cli = Cli::try_parse_from(["pash", "--no-history", "--config", "/tmp/p.toml"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.no_history);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/p.toml")));
    }
}
