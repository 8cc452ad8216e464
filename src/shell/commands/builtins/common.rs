use crate::shell::context::ShellContext;

/// Expands a leading `~` (alone or before a `/`) to `$HOME`.
/// Returns `None` when the path needs `$HOME` and it is not set.
pub fn expand_home(ctx: &ShellContext, path: &str) -> Option<String> {
    match path.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => {
            ctx.var("HOME").map(|home| format!("{}{}", home, rest))
        }
        _ => Some(path.to_string()),
    }
}
