use anyhow::Context;
use argh::FromArgs;
use minsh::Interpreter;
use minsh::config::{self, ShellConfig};
use minsh::line_reader::raw_stdin;
use minsh::signals;
use tracing_subscriber::EnvFilter;

#[derive(FromArgs)]
/// A minimal interactive command interpreter.
///
/// Set MINSH_LOG (e.g. MINSH_LOG=debug) to log to standard error.
struct Options {
    #[argh(option, default = "config::DEFAULT_TERM.to_string()")]
    /// value of TERM in the environment of launched programs
    term: String,

    #[argh(option, default = "config::DEFAULT_INITIAL_CAPACITY")]
    /// initial size of the input line buffer in bytes
    initial_capacity: usize,

    #[argh(option, default = "config::DEFAULT_STACK_SIZE")]
    /// bytes of stack reserved for each launched program
    stack_size: usize,

    #[argh(option, default = "config::DEFAULT_PROMPT.to_string()")]
    /// prompt printed before every line
    prompt: String,
}

fn init_tracing() {
    // Logging stays off unless asked for; stdout belongs to the prompt.
    let Ok(filter) = EnvFilter::try_from_env("MINSH_LOG") else {
        return;
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(true)
        .init();
}

fn main() -> anyhow::Result<()> {
    let options: Options = argh::from_env();
    init_tracing();

    let config = ShellConfig {
        initial_capacity: options.initial_capacity,
        stack_size: options.stack_size,
        term: options.term,
        prompt: options.prompt,
        ..ShellConfig::default()
    };
    config.validate().context("invalid configuration")?;

    signals::ignore_interrupts().context("cannot ignore SIGINT")?;
    let mut input = raw_stdin().context("cannot open standard input")?;

    let mut sh = Interpreter::with_config(config);
    sh.repl(&mut input, &mut std::io::stdout())
}
