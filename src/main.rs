// scriptc: script evaluator, binder and REPL

use std::fs::{self, File};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;

use clap::Parser as _;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing_subscriber::EnvFilter;

use scriptc::binder::types::TypeRegistry;
use scriptc::interpreter::Environment;
use scriptc::ui::App;

/// Evaluate scripts, or bind them and print the instructions a compiler would
/// emit. Without input the interactive REPL starts.
#[derive(clap::Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Script file to run.
    file: Option<PathBuf>,

    /// Script text given on the command line instead of a file.
    #[arg(short, long, value_name = "EXPR", conflicts_with = "file")]
    eval: Option<String>,

    /// Bind the script and print its type and instructions instead of
    /// evaluating it.
    #[arg(long)]
    bind: bool,

    /// Print the parsed tree before anything else.
    #[arg(long)]
    tree: bool,

    /// Start the REPL, after running any given script in its environment.
    #[arg(long)]
    repl: bool,

    /// Write logs to PATH instead of stderr. Filtered by RUST_LOG.
    #[arg(long, value_name = "PATH")]
    log: Option<PathBuf>,
}

fn init_logging(log: Option<&PathBuf>, interactive: bool) -> io::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);

    match log {
        Some(path) => {
            let file = File::create(path)?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        // The REPL owns the terminal; without a log file nothing is written.
        None if interactive => {}
        None => builder.with_writer(io::stderr).init(),
    }
    Ok(())
}

fn run_batch(source: &str, args: &Args, env: &mut Environment) -> Result<(), scriptc::Error> {
    let program = scriptc::parse_program(source)?;

    if args.tree {
        for statement in &program {
            println!("{}", statement);
        }
    }

    if args.bind {
        let registry = TypeRegistry::new();
        let instructions = scriptc::compile(&program, &registry, None)?;
        for instruction in &instructions {
            println!("{}", instruction);
        }
        return Ok(());
    }

    let result = scriptc::evaluate(&program, env)?;
    for line in env.take_output() {
        println!("{}", line);
    }
    if !result.is_null() {
        println!("{}", result);
    }
    Ok(())
}

fn run_repl(env: Environment) -> io::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(env, TypeRegistry::new());
    let res = app.run(&mut terminal);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    res
}

fn main() -> ExitCode {
    let args = Args::parse();

    let source = match (&args.file, &args.eval) {
        (Some(path), _) => match fs::read_to_string(path) {
            Ok(source) => Some(source),
            Err(e) => {
                eprintln!("Error: cannot read '{}': {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        (None, Some(text)) => Some(text.clone()),
        (None, None) => None,
    };
    let interactive = args.repl || source.is_none();

    if let Err(e) = init_logging(args.log.as_ref(), interactive) {
        eprintln!("Error: cannot open log file: {}", e);
        return ExitCode::FAILURE;
    }

    let mut env = Environment::with_builtins();

    if let Some(source) = &source {
        if let Err(e) = run_batch(source, &args, &mut env) {
            eprintln!("{}: {}", e.stage(), e);
            return ExitCode::FAILURE;
        }
    }

    if interactive {
        if let Err(e) = run_repl(env) {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    }

    ExitCode::SUCCESS
}
