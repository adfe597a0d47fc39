//! Session-wide settings for the interpreter.

use thiserror::Error;

/// Initial size of the line buffer, in bytes.
pub const DEFAULT_INITIAL_CAPACITY: usize = 10;

/// Upper bound on the argument vector, counting the terminating null slot.
///
/// A line therefore yields at most `MAX_ARGS - 1` tokens.
pub const MAX_ARGS: usize = 100;

/// Stack reserved for every launched child.
pub const DEFAULT_STACK_SIZE: usize = 1024 * 1024;

/// Smallest stack a child is allowed to start on.
pub const MIN_STACK_SIZE: usize = 64 * 1024;

pub const DEFAULT_TERM: &str = "xterm";

pub const DEFAULT_PROMPT: &str = "$";

/// Settings fixed for the lifetime of one [`Interpreter`](crate::Interpreter).
///
/// `Default` reproduces the classic behaviour: a 10 byte buffer that doubles on
/// demand, 99 tokens per line, a 1 MiB child stack and `TERM=xterm` as the
/// only variable handed to launched programs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellConfig {
    pub initial_capacity: usize,
    pub max_args: usize,
    pub stack_size: usize,
    /// Value of the `TERM` entry in the environment of launched programs.
    pub term: String,
    pub prompt: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("initial buffer capacity must be at least 1 byte")]
    ZeroCapacity,

    #[error("max_args must leave room for at least one token, got {0}")]
    TooFewArgs(usize),

    #[error("child stack of {requested} bytes is below the {minimum} byte minimum")]
    StackTooSmall { requested: usize, minimum: usize },
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            max_args: MAX_ARGS,
            stack_size: DEFAULT_STACK_SIZE,
            term: DEFAULT_TERM.to_string(),
            prompt: DEFAULT_PROMPT.to_string(),
        }
    }
}

impl ShellConfig {
    /// Check the invariants the reader, tokenizer and launcher rely on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.max_args < 2 {
            return Err(ConfigError::TooFewArgs(self.max_args));
        }
        if self.stack_size < MIN_STACK_SIZE {
            return Err(ConfigError::StackTooSmall {
                requested: self.stack_size,
                minimum: MIN_STACK_SIZE,
            });
        }
        Ok(())
    }

    /// The fixed environment handed to every launched program.
    pub fn child_env(&self) -> Vec<(String, String)> {
        vec![("TERM".to_string(), self.term.clone())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_classic_constants() {
        let config = ShellConfig::default();
        assert_eq!(config.initial_capacity, 10);
        assert_eq!(config.max_args, 100);
        assert_eq!(config.stack_size, 1 << 20);
        assert_eq!(config.prompt, "$");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_child_env_only_carries_term() {
        let config = ShellConfig {
            term: "vt100".to_string(),
            ..ShellConfig::default()
        };
        assert_eq!(
            config.child_env(),
            vec![("TERM".to_string(), "vt100".to_string())]
        );
    }

    #[test]
    fn test_validate_rejects_degenerate_values() {
        let zero = ShellConfig {
            initial_capacity: 0,
            ..ShellConfig::default()
        };
        assert_eq!(zero.validate(), Err(ConfigError::ZeroCapacity));

        let no_tokens = ShellConfig {
            max_args: 1,
            ..ShellConfig::default()
        };
        assert_eq!(no_tokens.validate(), Err(ConfigError::TooFewArgs(1)));

        let tiny_stack = ShellConfig {
            stack_size: 4096,
            ..ShellConfig::default()
        };
        assert!(matches!(
            tiny_stack.validate(),
            Err(ConfigError::StackTooSmall { requested: 4096, .. })
        ));
    }
}
