//! Testbench harness CLI.
//!
//! This binary runs one hardware model against a program image. It performs:
//! 1. **Setup:** Reads the optional JSON configuration, applies plusargs and
//!    loads the program and device-descriptor images.
//! 2. **Run:** Drives the linked model (or the idle model) until it finishes,
//!    the step budget runs out or SIGINT arrives.
//! 3. **Report:** Logs the verdict, optionally dumps memory and maps the
//!    outcome to an exit status.
//!
//! The model's console output goes to stdout; log messages go to stderr.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::OnceLock;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use tbsim_core::sim::{CancelHook, CancelToken, HaltReason, load_regions};
use tbsim_core::{
    Config, ConsoleSink, Driver, HarnessError, IdleModel, MemoryImage, Plusargs, RunSummary,
    SimModel,
};

/// Exit status for a run whose write-host check failed under `--fail-on-mismatch`.
const EXIT_MISMATCH: u8 = 2;

#[derive(Parser, Debug)]
#[command(
    name = "tbsim",
    author,
    version,
    about = "Cycle-driven testbench for simulated processor cores",
    long_about = "Run a hardware model against a raw program image.\n\nPlusargs follow simulator conventions and are matched by prefix:\n  +B<path>   program image (required)\n  +D<path>   device-descriptor image\n  +T<n>      step budget in half-cycles, 0 = unbounded\n  +W<hex>    absolute write-host address to check after the run\n  +trace     record a waveform into logs/vlt_dump.vcd\n\nExamples:\n  tbsim +Bprog.bin +T100000 +W80001000\n  tbsim --config layout.json +Bprog.bin +Dsystem.dtb +trace"
)]
struct Cli {
    /// JSON file overriding the memory layout and run settings.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Exit with status 2 when the write-host check fails.
    #[arg(long)]
    fail_on_mismatch: bool,

    /// Dump memory to the dump path on SIGINT and after the run.
    #[arg(long)]
    dump_mem: bool,

    /// Simulator plusargs (`+B...`, `+T...`, ...).
    #[arg(allow_hyphen_values = true, trailing_var_arg = true)]
    plusargs: Vec<String>,
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(summary) => {
            info!(
                time = summary.time,
                reason = ?summary.reason,
                console_bytes = summary.console_bytes,
                refused_writes = summary.refused_writes,
                "simulation finished"
            );
            if cli.fail_on_mismatch && summary.verdict.is_mismatch() {
                ExitCode::from(EXIT_MISMATCH)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

/// Sets up and runs one simulation.
fn run(cli: &Cli) -> Result<RunSummary, HarnessError> {
    let mut config = match &cli.config {
        Some(path) => Config::from_json_file(path)?,
        None => Config::default(),
    };

    let plusargs = Plusargs::parse(&cli.plusargs)?;
    plusargs.apply(&mut config.run);
    let program = plusargs
        .program
        .as_deref()
        .ok_or(HarnessError::MissingProgram)?;

    let mut memory = MemoryImage::from_config(&config.memory);
    let _ = load_regions(
        &mut memory,
        &config.memory,
        program,
        plusargs.descriptor.as_deref(),
    )?;

    let mut driver = Driver::new(select_model(), memory, ConsoleSink::stdout(), &config);
    let _ = driver.enable_trace()?;

    if cli.dump_mem {
        let token = CancelToken::new();
        install_sigint(token.clone());
        driver.set_cancel_hook(CancelHook::dump_to(token, config.run.dump_path.clone()));
    }

    let summary = driver.run()?;

    // A cancelled run has already been dumped by the hook.
    if cli.dump_mem && summary.reason != HaltReason::Cancelled {
        driver.memory().dump(&config.run.dump_path)?;
        info!("Memory has been dumped into {}.", config.run.dump_path.display());
    }
    Ok(summary)
}

/// The linked hardware model, or the idle model when none is available.
fn select_model() -> Box<dyn SimModel> {
    #[cfg(feature = "verilated")]
    {
        if let Some(model) = tbsim_core::sim::VerilatedModel::new() {
            return Box::new(model);
        }
        warn!("hardware model could not be instantiated");
    }
    warn!("no hardware model linked; running the idle model");
    Box::new(IdleModel::new())
}

static SIGINT_TOKEN: OnceLock<CancelToken> = OnceLock::new();

extern "C" fn on_sigint(_signal: libc::c_int) {
    if let Some(token) = SIGINT_TOKEN.get() {
        token.cancel();
    }
}

/// Routes SIGINT to `token`. Only the first call has any effect.
fn install_sigint(token: CancelToken) {
    if SIGINT_TOKEN.set(token).is_err() {
        return;
    }
    let handler = on_sigint as extern "C" fn(libc::c_int);
    // SAFETY: the handler only performs an atomic store through a token that
    // was initialized before installation and lives for the whole process.
    let previous = unsafe { libc::signal(libc::SIGINT, handler as libc::sighandler_t) };
    if previous == libc::SIG_ERR {
        warn!("could not install the SIGINT handler; interrupts will not dump memory");
    }
}
