//! Splitting a command line into space-delimited tokens.

use std::ffi::OsStr;
use std::os::unix::ffi::OsStrExt;

/// Tokens of one command line, borrowed from the line buffer.
///
/// Tokens are raw bytes, so names that are not valid UTF-8 reach `chdir` and
/// `execve` untouched. Holds at most `max_args - 1` entries; the remaining
/// slot is the null terminator that the launcher appends when it builds the
/// argument vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tokens<'a> {
    words: Vec<&'a OsStr>,
}

impl<'a> Tokens<'a> {
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// The command name, i.e. the first token.
    pub fn program(&self) -> Option<&'a OsStr> {
        self.words.first().copied()
    }

    /// Everything after the command name.
    pub fn args(&self) -> &[&'a OsStr] {
        self.words.get(1..).unwrap_or_default()
    }

    pub fn as_slice(&self) -> &[&'a OsStr] {
        &self.words
    }
}

/// Split `line` on the space byte.
///
/// Runs of spaces never produce empty tokens. Other whitespace, tabs
/// included, is part of a token. Tokens beyond `max_args - 1` are dropped
/// without notice.
pub fn tokenize(line: &[u8], max_args: usize) -> Tokens<'_> {
    let limit = max_args.saturating_sub(1);
    let mut words = Vec::with_capacity(limit.min(16));
    words.extend(
        line.split(|&b| b == b' ')
            .filter(|w| !w.is_empty())
            .map(OsStr::from_bytes)
            .take(limit),
    );
    Tokens { words }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MAX_ARGS;

    fn words(tokens: &Tokens<'_>) -> Vec<String> {
        tokens
            .as_slice()
            .iter()
            .map(|w| w.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_simple_command() {
        let tokens = tokenize(b"echo hello world", MAX_ARGS);
        assert_eq!(words(&tokens), ["echo", "hello", "world"]);
        assert_eq!(tokens.program(), Some(OsStr::new("echo")));
        assert_eq!(tokens.args(), [OsStr::new("hello"), OsStr::new("world")]);
    }

    #[test]
    fn test_repeated_leading_and_trailing_spaces() {
        let tokens = tokenize(b"   cd    /tmp   ", MAX_ARGS);
        assert_eq!(words(&tokens), ["cd", "/tmp"]);
    }

    #[test]
    fn test_blank_lines_yield_nothing() {
        assert!(tokenize(b"", MAX_ARGS).is_empty());
        assert!(tokenize(b"     ", MAX_ARGS).is_empty());
        assert_eq!(tokenize(b"", MAX_ARGS).program(), None);
        assert!(tokenize(b"", MAX_ARGS).args().is_empty());
    }

    #[test]
    fn test_only_space_separates() {
        let tokens = tokenize(b"a\tb c", MAX_ARGS);
        assert_eq!(words(&tokens), ["a\tb", "c"]);
    }

    #[test]
    fn test_quotes_are_not_special() {
        let tokens = tokenize(b"echo \"two words\"", MAX_ARGS);
        assert_eq!(words(&tokens), ["echo", "\"two", "words\""]);
    }

    #[test]
    fn test_non_utf8_bytes_pass_through() {
        let tokens = tokenize(b"ls caf\xe9", MAX_ARGS);
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens.as_slice()[1].as_bytes(), b"caf\xe9");
    }

    #[test]
    fn test_truncates_at_max_args_minus_one() {
        let line = (0..150).map(|i| i.to_string()).collect::<Vec<_>>().join(" ");
        let tokens = tokenize(line.as_bytes(), MAX_ARGS);

        assert_eq!(tokens.len(), MAX_ARGS - 1);
        assert_eq!(tokens.program(), Some(OsStr::new("0")));
        assert_eq!(tokens.as_slice().last(), Some(&OsStr::new("98")));
    }

    #[test]
    fn test_custom_bound() {
        let tokens = tokenize(b"a b c d", 3);
        assert_eq!(words(&tokens), ["a", "b"]);
    }
}
