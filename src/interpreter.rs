use crate::command::{CommandFactory, ExitCode};
use crate::config::ShellConfig;
use crate::env::Environment;
use crate::error::report;
use crate::line_reader::{LineBuffer, ReadOutcome};
use crate::tokenizer::{Tokens, tokenize};
use std::ffi::OsStr;
use std::io::{Read, Write};
use tracing::{debug, warn};

/// Stateless [`CommandFactory`] for one command type of this crate: a builtin or
/// the external launcher.
pub(crate) struct Factory<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

/// A minimal interactive shell that can execute built-in and external commands.
///
/// The interpreter owns the input [`LineBuffer`], an [`Environment`] and a list of
/// [`CommandFactory`] objects that are queried in order to create commands by name.
/// See [`Default`] for the factories included out of the box.
///
/// Example
/// ```
/// use minsh::Interpreter;
/// let mut sh = Interpreter::default();
/// let code = sh.run("exit", &["now"]).unwrap();
/// assert_eq!(code, 1);
/// ```
pub struct Interpreter {
    config: ShellConfig,
    buffer: LineBuffer,
    env: Environment,
    commands: Vec<Box<dyn CommandFactory>>,
}

impl Interpreter {
    /// Create a new interpreter with a custom set of command factories.
    pub fn new(config: ShellConfig, commands: Vec<Box<dyn CommandFactory>>) -> Self {
        Self {
            buffer: LineBuffer::with_capacity(config.initial_capacity),
            env: Environment::new(&config),
            config,
            commands,
        }
    }

    /// Create an interpreter with the default commands and the given settings.
    pub fn with_config(config: ShellConfig) -> Self {
        Self::new(config, default_commands())
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Run a single command invocation by name with arguments.
    ///
    /// Messages from the shell itself go to standard output.
    pub fn run(&mut self, name: &str, args: &[&str]) -> anyhow::Result<ExitCode> {
        let mut stdout = std::io::stdout();
        self.run_with_output(name, args, &mut stdout)
    }

    /// Like [`Interpreter::run`], but the shell's own messages go to `out`.
    pub fn run_with_output(
        &mut self,
        name: &str,
        args: &[&str],
        out: &mut dyn Write,
    ) -> anyhow::Result<ExitCode> {
        let args: Vec<&OsStr> = args.iter().map(|a| OsStr::new(*a)).collect();
        dispatch(&self.commands, &mut self.env, OsStr::new(name), &args, out)
    }

    /// Read-Eval-Print Loop.
    ///
    /// Prints the prompt, reads one line, and runs it. Returns when `exit`
    /// succeeds or `input` is exhausted. Command failures are reported on
    /// `out` and never end the loop; only failing to write to `out` does.
    pub fn repl<R: Read + ?Sized, W: Write>(
        &mut self,
        input: &mut R,
        out: &mut W,
    ) -> anyhow::Result<()> {
        while !self.env.should_exit {
            out.write_all(self.config.prompt.as_bytes())?;
            out.flush()?;

            let line = match self.buffer.read_line(input) {
                Ok(ReadOutcome::Line(line)) => line,
                Ok(ReadOutcome::Eof) => {
                    debug!("end of input");
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "discarding input line");
                    report(&mut *out, e)?;
                    continue;
                }
            };

            let tokens = tokenize(line, self.config.max_args);
            execute_line(&self.commands, &mut self.env, &tokens, &mut *out)?;
        }
        Ok(())
    }
}

fn execute_line(
    commands: &[Box<dyn CommandFactory>],
    env: &mut Environment,
    tokens: &Tokens<'_>,
    out: &mut dyn Write,
) -> std::io::Result<()> {
    let Some(name) = tokens.program() else {
        return Ok(());
    };
    match dispatch(commands, env, name, tokens.args(), &mut *out) {
        Ok(code) => debug!(command = ?name, code, "command done"),
        Err(e) => report(out, e)?,
    }
    Ok(())
}

fn dispatch(
    commands: &[Box<dyn CommandFactory>],
    env: &mut Environment,
    name: &OsStr,
    args: &[&OsStr],
    out: &mut dyn Write,
) -> anyhow::Result<ExitCode> {
    debug!(command = ?name, argc = args.len(), "dispatching");
    for factory in commands {
        if let Some(cmd) = factory.try_create(env, name, args) {
            return cmd.execute(out, env);
        }
    }
    Err(anyhow::anyhow!("command not found: {}", name.to_string_lossy()))
}

fn default_commands() -> Vec<Box<dyn CommandFactory>> {
    use crate::builtin::*;
    use crate::external::ExternalCommand;
    vec![
        Box::new(Factory::<Cd>::default()),
        Box::new(Factory::<Exit>::default()),
        Box::new(Factory::<ExternalCommand>::default()),
    ]
}

impl Default for Interpreter {
    /// Create an interpreter with the default settings and commands:
    /// - built-ins: `cd`, `exit`
    /// - external command launcher
    fn default() -> Self {
        Self::with_config(ShellConfig::default())
    }
}
