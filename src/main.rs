use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use clap::Parser;
use tracing::{debug, warn};
use tracing_subscriber::filter::EnvFilter;

use vmlite::repl::{self, Mode, Options};
use vmlite::runtime::{Session, Snapshot, VmConfig};

#[derive(Parser, Debug)]
#[command(
    name = "vmlite",
    version,
    about = "A tiny expression language compiled to bytecode",
    long_about = "Compiles each input to packed bytecode and runs it on a stack VM.\n\n\
                  Interactive:   vmlite\n\
                  Tokens only:   vmlite --mode lexer 'print 1 + 2'\n\
                  Disassemble:   vmlite --mode compiler 'var x = 3 * 4'"
)]
struct Cli {
    /// How far to take the input
    #[arg(short, long, value_enum, default_value_t = Mode::Repl)]
    mode: Mode,

    /// Source text for the non-interactive modes (read from stdin if absent)
    input: Option<String>,

    /// Session image to restore at start and save on exit
    #[arg(long, value_name = "PATH")]
    image: Option<PathBuf>,

    /// Abort a run after this many instructions
    #[arg(long)]
    max_steps: Option<usize>,

    /// Operand stack capacity
    #[arg(long, default_value_t = vmlite::runtime::vm::STACK_SIZE)]
    stack_size: usize,

    /// Disable ANSI colors in token dumps
    #[arg(long)]
    no_color: bool,

    /// Print token text instead of the debug form
    #[arg(long)]
    pretty: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = real_main(cli) {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn real_main(cli: Cli) -> vmlite::Result<()> {
    let config = VmConfig {
        stack_capacity: cli.stack_size,
        max_steps: cli.max_steps,
        ..VmConfig::default()
    };
    let mut session = Session::with_config(config);

    if let Some(path) = &cli.image {
        load_image(&mut session, path)?;
    }

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match (cli.mode, cli.input) {
        (Mode::Repl, None) => {
            repl::banner(&mut out)?;
            repl::run_loop(&mut session, stdin.lock(), &mut out)?;
        }
        (mode, input) => {
            let source = match input {
                Some(source) => source,
                None => {
                    let mut line = String::new();
                    stdin.lock().read_line(&mut line)?;
                    line
                }
            };
            let options = Options {
                color: !cli.no_color,
                pretty: cli.pretty,
            };
            repl::run_once(mode, &mut session, source.trim_end(), options, &mut out)?;
        }
    }
    out.flush()?;

    if let Some(path) = &cli.image {
        save_image(&session, path)?;
    }
    Ok(())
}

fn load_image(session: &mut Session, path: &Path) -> vmlite::Result<()> {
    if !path.exists() {
        debug!(path = %path.display(), "no session image yet");
        return Ok(());
    }
    let bytes = std::fs::read(path)?;
    match Snapshot::from_bytes(&bytes) {
        Ok(snapshot) => {
            let names = snapshot.names.len();
            session.restore(snapshot)?;
            debug!(path = %path.display(), names, "restored session image");
            Ok(())
        }
        Err(e) => {
            warn!(path = %path.display(), "unreadable session image");
            Err(e)
        }
    }
}

fn save_image(session: &Session, path: &Path) -> vmlite::Result<()> {
    let bytes = session.snapshot().to_bytes()?;
    std::fs::write(path, bytes)?;
    debug!(path = %path.display(), "saved session image");
    Ok(())
}
