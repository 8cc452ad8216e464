use crate::shell::ast::{Command, Pipeline, Redirections, Word};
use std::mem;

/// Characters a backslash escapes inside double quotes.
const DOUBLE_QUOTE_ESCAPES: [char; 4] = ['"', '\\', '$', '`'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QuoteState {
    None,
    Single,
    Double,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stream {
    Stdout,
    Stderr,
}

// Longest operators first so `>` never matches the start of `>>`.
const OPERATORS: [(&str, Stream, bool); 6] = [
    ("1>>", Stream::Stdout, true),
    (">>", Stream::Stdout, true),
    ("2>>", Stream::Stderr, true),
    ("1>", Stream::Stdout, false),
    (">", Stream::Stdout, false),
    ("2>", Stream::Stderr, false),
];

/// Splits a line into words, honouring quotes and backslash escapes.
pub fn tokenize(line: &str) -> Vec<String> {
    lex(line).into_iter().map(|word| word.text).collect()
}

/// Same scan as [`tokenize`], keeping track of which leading bytes were bare.
pub fn lex(line: &str) -> Vec<Word> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut bare_prefix = 0;
    let mut state = QuoteState::None;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match state {
            QuoteState::Single => {
                // Everything is literal until the closing quote, backslashes included.
                if c == '\'' {
                    state = QuoteState::None;
                } else {
                    current.push(c);
                }
            }
            QuoteState::Double => match c {
                '"' => state = QuoteState::None,
                '\\' => match chars.peek() {
                    Some(&next) if DOUBLE_QUOTE_ESCAPES.contains(&next) => {
                        current.push(next);
                        chars.next();
                    }
                    _ => current.push('\\'),
                },
                _ => current.push(c),
            },
            QuoteState::None => match c {
                ' ' | '\t' => {
                    if !current.is_empty() {
                        words.push(Word {
                            text: mem::take(&mut current),
                            bare_prefix,
                        });
                    }
                    bare_prefix = 0;
                }
                '\'' => state = QuoteState::Single,
                '"' => state = QuoteState::Double,
                '\\' => match chars.next() {
                    Some(next) => current.push(next),
                    // Trailing backslash has nothing to escape
                    None => current.push('\\'),
                },
                _ => {
                    if current.len() == bare_prefix {
                        bare_prefix += c.len_utf8();
                    }
                    current.push(c);
                }
            },
        }
    }

    // An unterminated quote simply ends with the input.
    if !current.is_empty() {
        words.push(Word {
            text: current,
            bare_prefix,
        });
    }

    words
}

/// Splits a raw line on unquoted `|`, keeping each stage's text untouched.
pub fn split_pipes(line: &str) -> Vec<String> {
    let mut stages = Vec::new();
    let mut current = String::new();
    let mut state = QuoteState::None;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match (state, c) {
            (QuoteState::None, '|') => {
                stages.push(mem::take(&mut current));
                continue;
            }
            (QuoteState::None, '\'') => state = QuoteState::Single,
            (QuoteState::Single, '\'') => state = QuoteState::None,
            (QuoteState::None, '"') => state = QuoteState::Double,
            (QuoteState::Double, '"') => state = QuoteState::None,
            (QuoteState::None | QuoteState::Double, '\\') => {
                // The escaped character can't close a quote or split a stage.
                current.push(c);
                if let Some(next) = chars.next() {
                    current.push(next);
                }
                continue;
            }
            _ => {}
        }
        current.push(c);
    }

    stages.push(current);
    stages
}

fn match_operator(word: &Word) -> Option<(Stream, bool, String)> {
    let head = word.bare_head();
    OPERATORS.iter().find_map(|&(op, stream, append)| {
        head.starts_with(op)
            .then(|| (stream, append, word.text[op.len()..].to_string()))
    })
}

/// Pulls `>`, `1>`, `>>`, `1>>`, `2>`, `2>>` (bare or fused with their target)
/// out of a stage's words. Returns the residual words and the redirections.
pub fn extract_redirections(words: Vec<Word>) -> (Vec<String>, Redirections) {
    let mut residual = Vec::new();
    let mut redirections = Redirections::default();
    let mut words = words.into_iter();

    while let Some(word) = words.next() {
        let Some((stream, append, fused)) = match_operator(&word) else {
            residual.push(word.text);
            continue;
        };

        let target = if fused.is_empty() {
            words.next().map(|next| next.text)
        } else {
            Some(fused)
        };

        redirections.append = append;
        // A dangling operator leaves the target as it was.
        if let Some(target) = target {
            match stream {
                Stream::Stdout => redirections.stdout = Some(target),
                Stream::Stderr => redirections.stderr = Some(target),
            }
        }
    }

    (residual, redirections)
}

/// Parses one stage's raw text. Whitespace-only stages yield nothing.
pub fn parse_stage(raw: &str) -> Option<Command> {
    let (words, redirections) = extract_redirections(lex(raw));
    Command::new(words, redirections, raw)
}

pub fn parse_command_line(line: &str) -> Option<Pipeline> {
    let stages = split_pipes(line)
        .iter()
        .filter_map(|raw| parse_stage(raw))
        .collect();
    Pipeline::new(stages)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare(words: &[&str]) -> Vec<Word> {
        words.iter().map(|w| Word::bare(w)).collect()
    }

    #[test]
    fn test_tokenize_quotes_and_escapes() {
        assert_eq!(
            tokenize(r#"echo 'a  b' "c\"d""#),
            vec!["echo", "a  b", "c\"d"]
        );
    }

    #[test]
    fn test_tokenize_collapses_spaces() {
        assert_eq!(tokenize("  ls   -la    /tmp "), vec!["ls", "-la", "/tmp"]);
        assert!(tokenize("    ").is_empty());
    }

    #[test]
    fn test_tokenize_single_quotes_keep_backslash() {
        assert_eq!(tokenize(r"echo 'a\nb'"), vec!["echo", r"a\nb"]);
    }

    #[test]
    fn test_tokenize_backslash_outside_quotes() {
        assert_eq!(tokenize(r"echo a\ b \'x\'"), vec!["echo", "a b", "'x'"]);
        assert_eq!(tokenize(r"echo trailing\"), vec!["echo", r"trailing\"]);
    }

    #[test]
    fn test_tokenize_backslash_in_double_quotes() {
        assert_eq!(tokenize(r#"echo "a\\b\$c\`d""#), vec!["echo", r"a\b$c`d"]);
        // Other characters keep their backslash
        assert_eq!(tokenize(r#"echo "a\nb""#), vec!["echo", r"a\nb"]);
    }

    #[test]
    fn test_tokenize_adjacent_quotes_join() {
        assert_eq!(tokenize(r#"echo "hello"'world'x"#), vec!["echo", "helloworldx"]);
        assert_eq!(tokenize(r#"echo "it's""#), vec!["echo", "it's"]);
    }

    #[test]
    fn test_tokenize_unterminated_quote_is_accepted() {
        assert_eq!(tokenize("echo 'never closed"), vec!["echo", "never closed"]);
        assert_eq!(tokenize("echo \"half"), vec!["echo", "half"]);
    }

    #[test]
    fn test_tokenize_single_word_is_stable() {
        for input in ["hello", "path/to/file.txt", "a-b_c"] {
            let first = tokenize(input)[0].clone();
            assert_eq!(tokenize(&first), vec![first.clone()]);
        }
    }

    #[test]
    fn test_split_pipes_respects_quotes() {
        assert_eq!(split_pipes("echo 'a|b' | cat"), vec!["echo 'a|b' ", " cat"]);
        assert_eq!(split_pipes(r#"echo "x|y" | wc"#), vec![r#"echo "x|y" "#, " wc"]);
    }

    #[test]
    fn test_split_pipes_escaped_quote_does_not_toggle() {
        assert_eq!(
            split_pipes(r#"echo "a\"|b" | cat"#),
            vec![r#"echo "a\"|b" "#, " cat"]
        );
        assert_eq!(split_pipes(r"echo a\|b"), vec![r"echo a\|b"]);
    }

    #[test]
    fn test_split_pipes_multi_stage() {
        assert_eq!(split_pipes("a|b|c"), vec!["a", "b", "c"]);
        assert_eq!(split_pipes("no pipes"), vec!["no pipes"]);
    }

    #[test]
    fn test_redirect_truncate() {
        let (words, redir) = extract_redirections(bare(&["echo", "hi", ">", "out.txt"]));
        assert_eq!(words, vec!["echo", "hi"]);
        assert_eq!(redir.stdout.as_deref(), Some("out.txt"));
        assert_eq!(redir.stderr, None);
        assert!(!redir.append);
    }

    #[test]
    fn test_redirect_append_forms() {
        for op in [">>", "1>>"] {
            let (words, redir) = extract_redirections(bare(&["echo", "hi", op, "log.txt"]));
            assert_eq!(words, vec!["echo", "hi"]);
            assert_eq!(redir.stdout.as_deref(), Some("log.txt"));
            assert!(redir.append);
        }
    }

    #[test]
    fn test_redirect_fused_forms() {
        let (words, redir) = extract_redirections(bare(&["echo", "hi", ">out.txt", "more"]));
        assert_eq!(words, vec!["echo", "hi", "more"]);
        assert_eq!(redir.stdout.as_deref(), Some("out.txt"));
        assert!(!redir.append);

        let (_, redir) = extract_redirections(bare(&["ls", "1>>all.log"]));
        assert_eq!(redir.stdout.as_deref(), Some("all.log"));
        assert!(redir.append);

        let (_, redir) = extract_redirections(bare(&["ls", "2>err.log"]));
        assert_eq!(redir.stderr.as_deref(), Some("err.log"));
        assert!(!redir.append);
    }

    #[test]
    fn test_redirect_stderr_append() {
        let (words, redir) = extract_redirections(bare(&["ls", "nope", "2>>", "err.log"]));
        assert_eq!(words, vec!["ls", "nope"]);
        assert_eq!(redir.stderr.as_deref(), Some("err.log"));
        assert_eq!(redir.stdout, None);
        assert!(redir.append);
    }

    #[test]
    fn test_redirect_both_streams() {
        let (words, redir) =
            extract_redirections(bare(&["cmd", "1>", "out", "2>", "err", "arg"]));
        assert_eq!(words, vec!["cmd", "arg"]);
        assert_eq!(redir.stdout.as_deref(), Some("out"));
        assert_eq!(redir.stderr.as_deref(), Some("err"));
    }

    #[test]
    fn test_redirect_last_operator_sets_append() {
        let (_, redir) = extract_redirections(bare(&["cmd", ">>", "a", "2>", "b"]));
        assert!(!redir.append);
        let (_, redir) = extract_redirections(bare(&["cmd", ">", "a", "2>>", "b"]));
        assert!(redir.append);
    }

    #[test]
    fn test_redirect_dangling_operator_is_ignored() {
        let (words, redir) = extract_redirections(bare(&["echo", "hi", ">"]));
        assert_eq!(words, vec!["echo", "hi"]);
        assert_eq!(redir.stdout, None);
    }

    #[test]
    fn test_quoted_operator_is_literal() {
        let (words, redir) = extract_redirections(lex("echo '>' x"));
        assert_eq!(words, vec!["echo", ">", "x"]);
        assert_eq!(redir, Redirections::default());

        let (words, redir) = extract_redirections(lex("echo hi >'my file'"));
        assert_eq!(words, vec!["echo", "hi"]);
        assert_eq!(redir.stdout.as_deref(), Some("my file"));
    }

    #[test]
    fn test_parse_stage_name_is_first_residual_word() {
        let cmd = parse_stage("> out.txt echo hi").unwrap();
        assert_eq!(cmd.name(), "echo");
        assert_eq!(cmd.args(), ["hi"]);
        assert_eq!(cmd.output_target(), Some("out.txt"));
        assert_eq!(cmd.raw(), "> out.txt echo hi");
    }

    #[test]
    fn test_parse_stage_only_redirection_is_empty() {
        assert!(parse_stage("> out.txt").is_none());
        assert!(parse_stage("   ").is_none());
    }

    #[test]
    fn test_parse_command_line_pipeline() {
        let pipeline = parse_command_line("cat file.txt | grep 'a b' | wc -l > n.txt").unwrap();
        assert!(pipeline.is_multi_stage());
        let names: Vec<_> = pipeline.stages().iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["cat", "grep", "wc"]);
        assert_eq!(pipeline.stages()[1].args(), ["a b"]);
        assert_eq!(pipeline.stages()[2].output_target(), Some("n.txt"));
    }

    #[test]
    fn test_parse_command_line_nothing_to_do() {
        assert!(parse_command_line("").is_none());
        assert!(parse_command_line("   |  | ").is_none());
    }

    #[test]
    fn test_parse_command_line_drops_empty_stages() {
        let pipeline = parse_command_line("echo hi | | cat").unwrap();
        assert_eq!(pipeline.stages().len(), 2);
    }
}
