use anyhow::{Context, Result};
use clap::Parser;
use expectio::config::parse_duration;
use expectio::report::ERR_PREFIX;
use expectio::{ExternalCommand, HarnessConfig, Program, Runner, Suite, program};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Exit code when there is nothing to run.
const SETUP_FAILURE: u8 = 2;

/// How long shutdown waits for a program still running past its run timeout.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

#[derive(Parser, Debug)]
#[command(
    name = "expectio",
    about = "Replay transcript files against an interactive console program",
    version
)]
struct Args {
    /// Directory containing the *.test transcripts (prompted for when omitted)
    #[arg(short, long, env = "EXPECTIO_DIR")]
    dir: Option<PathBuf>,

    /// Registered program to test (prompted for when omitted)
    #[arg(short, long, env = "EXPECTIO_PROGRAM", conflicts_with = "command")]
    program: Option<String>,

    /// External executable to test instead of a registered program
    #[arg(short, long)]
    command: Option<String>,

    /// How long an input waits for the output that must come before it
    #[arg(long, env = "EXPECTIO_HANDSHAKE_TIMEOUT", default_value = "5s", value_parser = parse_duration)]
    handshake_timeout: Duration,

    /// Upper bound on a single transcript run
    #[arg(long, env = "EXPECTIO_RUN_TIMEOUT", default_value = "30s", value_parser = parse_duration)]
    run_timeout: Duration,

    /// Don't echo program output
    #[arg(short, long)]
    quiet: bool,

    /// Arguments to pass to the external command
    #[arg(trailing_var_arg = true, requires = "command")]
    args: Vec<String>,
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start the tokio runtime")?;
    let exit_code = runtime.block_on(run(args));
    // Workers of programs that outlived their run timeout are left behind.
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
    exit_code
}

async fn run(args: Args) -> Result<ExitCode> {
    let Some(dir) = resolve_dir(args.dir)? else {
        return Ok(ExitCode::from(SETUP_FAILURE));
    };
    let target: Arc<dyn Program> = match args.command {
        Some(command) => Arc::new(ExternalCommand::new(command, args.args)),
        None => match resolve_program(args.program)? {
            Some(program) => program,
            None => return Ok(ExitCode::from(SETUP_FAILURE)),
        },
    };

    let config = HarnessConfig {
        handshake_timeout: args.handshake_timeout,
        run_timeout: args.run_timeout,
        ..HarnessConfig::default()
    };
    let runner = if args.quiet {
        Runner::silent(config)
    } else {
        Runner::new(config)
    };

    match Suite::new(dir, runner).run(target).await {
        Ok(summary) => Ok(ExitCode::from(summary.exit_code())),
        Err(err) => {
            eprintln!("{ERR_PREFIX}{err}");
            Ok(ExitCode::from(SETUP_FAILURE))
        }
    }
}

fn resolve_dir(given: Option<PathBuf>) -> Result<Option<PathBuf>> {
    if given.is_some() {
        return Ok(given);
    }
    prompt_until("Path to test-Directory: ", |answer| {
        let dir = PathBuf::from(answer);
        if dir.is_dir() {
            Ok(dir)
        } else {
            Err("Given path doesn't exist or is not a directory!".to_string())
        }
    })
}

fn resolve_program(given: Option<String>) -> Result<Option<Arc<dyn Program>>> {
    let find = |name: &str| {
        program::lookup(name).ok_or_else(|| {
            let known: Vec<_> = program::names().collect();
            format!(
                "Program {name} doesn't exist! Known programs: {}",
                known.join(", ")
            )
        })
    };
    match given {
        Some(name) => match find(&name) {
            Ok(program) => Ok(Some(program)),
            Err(msg) => {
                eprintln!("{ERR_PREFIX}{msg}");
                Ok(None)
            }
        },
        None => prompt_until("Name of program to test: ", find),
    }
}

/// Ask on stdin until `accept` takes the answer. `None` once stdin is closed.
fn prompt_until<T>(
    prompt: &str,
    mut accept: impl FnMut(&str) -> std::result::Result<T, String>,
) -> Result<Option<T>> {
    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("{prompt}");
        io::stdout().flush()?;
        line.clear();
        if stdin
            .lock()
            .read_line(&mut line)
            .context("Failed to read from stdin")?
            == 0
        {
            println!();
            return Ok(None);
        }
        match accept(line.trim()) {
            Ok(value) => return Ok(Some(value)),
            Err(msg) => eprintln!("{ERR_PREFIX}{msg}"),
        }
    }
}
