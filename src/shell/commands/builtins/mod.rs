pub mod env;
pub mod io;
pub mod info;
pub mod common; // Private helpers

use crate::shell::commands::Registry;

/// Builds the dispatch table with every shell builtin.
pub fn builtin_registry() -> Registry {
    let mut registry = Registry::new();

    // Env/Navigation
    registry.register("cd", Box::new(env::cd::CdCommand));
    registry.register("pwd", Box::new(env::pwd::PwdCommand));
    registry.register("exit", Box::new(env::exit::ExitCommand));

    // IO
    registry.register("echo", Box::new(io::echo::EchoCommand));
    registry.register("cat", Box::new(io::cat::CatCommand));

    // Introspection
    registry.register("type", Box::new(info::type_cmd::TypeCommand));
    registry.register("history", Box::new(info::history::HistoryCommand));

    registry
}
