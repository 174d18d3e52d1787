//! memlogd - memory pressure logger daemon.
//!
//! Samples memory, vm event and per-process statistics into an in-memory
//! ring on a timer and streams the formatted records to stdout. Settings can
//! be changed at runtime by writing `name=value` lines to stdin.

use tikv_jemallocator::Jemalloc;
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use clap::Parser;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

#[cfg(target_os = "linux")]
use memlog::collector::RealFs;
#[cfg(not(target_os = "linux"))]
use memlog::collector::mock::MockFs;
use memlog::error::ReadError;
use memlog::filter::{
    FilterConfig, MemoryFields, ProcessFields, VmEventFields, memory_fields_from_bits,
    parse_mask, process_fields_from_bits, vm_event_fields_from_bits,
};
use memlog::format::MAX_FIELD_WIDTH;
use memlog::logger::{ControlCommand, MemLogger, Providers, Sampler, Ticker};

/// Memory pressure logger daemon.
#[derive(Parser)]
#[command(name = "memlogd", about = "Memory pressure logger daemon", version)]
struct Args {
    /// Sampling interval in milliseconds.
    #[arg(short, long, default_value = "1000")]
    interval_ms: u64,

    /// Ring size as a power of two, in words (14 = 16384 words).
    #[arg(long, default_value = "14", value_parser = clap::value_parser!(u32).range(1..=24))]
    buffer_shift: u32,

    /// Memory fields mask (decimal or 0x hex). Default: all.
    #[arg(long, value_parser = parse_memory_fields)]
    memory_fields: Option<MemoryFields>,

    /// Vm event fields mask (decimal or 0x hex). Default: all.
    #[arg(long, value_parser = parse_vm_event_fields)]
    vm_event_fields: Option<VmEventFields>,

    /// Per-process fields mask (decimal or 0x hex). Default: all.
    #[arg(long, value_parser = parse_process_fields)]
    process_fields: Option<ProcessFields>,

    /// Lowest oom-adjust sampled.
    #[arg(long, default_value_t = -16, allow_negative_numbers = true)]
    min_adj: i32,

    /// Highest oom-adjust sampled.
    #[arg(long, default_value_t = 16, allow_negative_numbers = true)]
    max_adj: i32,

    /// Sample only this pid.
    #[arg(long)]
    pid: Option<u32>,

    /// Path to /proc filesystem (for testing/mocking).
    #[arg(long, default_value = "/proc")]
    proc_path: String,

    /// Path to /sys filesystem.
    #[arg(long, default_value = "/sys")]
    sys_path: String,

    /// Size of each read from the ring, in bytes.
    #[arg(long, default_value = "4096")]
    read_size: usize,

    /// Do not print the column header.
    #[arg(long)]
    no_header: bool,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is info level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

impl Args {
    fn filter(&self) -> FilterConfig {
        if self.min_adj > self.max_adj {
            warn!(
                "oom-adjust window [{}, {}] is empty, no processes will be sampled",
                self.min_adj, self.max_adj
            );
        }
        FilterConfig {
            memory: self.memory_fields.unwrap_or(MemoryFields::all()),
            vm_events: self.vm_event_fields.unwrap_or(VmEventFields::all()),
            process: self.process_fields.unwrap_or(ProcessFields::all()),
            min_adj: self.min_adj,
            max_adj: self.max_adj,
            pid: self.pid,
        }
    }
}

fn parse_memory_fields(s: &str) -> Result<MemoryFields, String> {
    parse_mask("memory-fields", s)
        .and_then(memory_fields_from_bits)
        .map_err(|e| e.to_string())
}

fn parse_vm_event_fields(s: &str) -> Result<VmEventFields, String> {
    parse_mask("vm-event-fields", s)
        .and_then(vm_event_fields_from_bits)
        .map_err(|e| e.to_string())
}

fn parse_process_fields(s: &str) -> Result<ProcessFields, String> {
    parse_mask("process-fields", s)
        .and_then(process_fields_from_bits)
        .map_err(|e| e.to_string())
}

/// Initializes the tracing subscriber with the appropriate log level.
/// Default level is INFO. Use -q for quiet mode (errors only).
/// Logs go to stderr; stdout carries the record stream.
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Applies control commands read from stdin until it is closed.
fn spawn_control_thread(logger: Arc<MemLogger>, ticker: Arc<Ticker>) -> io::Result<()> {
    thread::Builder::new()
        .name("memlog-control".into())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        warn!("stdin: {}", e);
                        break;
                    }
                };
                match ControlCommand::parse(&line) {
                    Ok(Some(command)) => {
                        command.apply(&logger, Some(&ticker));
                        debug!(?command, "applied");
                    }
                    Ok(None) => {}
                    Err(e) => warn!("{}: {}", line.trim(), e),
                }
            }
            debug!("control input closed");
        })?;
    Ok(())
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let filter = args.filter();

    #[cfg(target_os = "linux")]
    let providers = Providers::procfs(RealFs::new(), &args.proc_path, &args.sys_path);
    #[cfg(not(target_os = "linux"))]
    let providers = Providers::procfs(MockFs::typical_system(), &args.proc_path, &args.sys_path);

    info!(
        "Config: interval={}ms, proc={}, sys={}",
        args.interval_ms, args.proc_path, args.sys_path
    );

    let logger = Arc::new(MemLogger::new(
        args.buffer_shift,
        filter,
        Sampler::new(providers),
    ));
    info!(
        "Ring: {} words, format program of {} fields",
        logger.capacity(),
        logger.program_len()
    );
    let ticker = Arc::new(Ticker::spawn(
        Arc::clone(&logger),
        Duration::from_millis(args.interval_ms),
    )?);
    spawn_control_thread(Arc::clone(&logger), Arc::clone(&ticker))?;

    // Setup graceful shutdown
    let running = Arc::new(AtomicBool::new(true));
    {
        let running = Arc::clone(&running);
        let logger = Arc::clone(&logger);
        if let Err(e) = ctrlc::set_handler(move || {
            info!("Received shutdown signal");
            running.store(false, Ordering::SeqCst);
            logger.interrupt();
        }) {
            warn!("Failed to set Ctrl-C handler: {}", e);
        }
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    logger.open();
    let mut buf = vec![0u8; args.read_size.max(MAX_FIELD_WIDTH)];
    let mut seen = None;
    let mut header_printed = false;

    while running.load(Ordering::SeqCst) {
        match logger.read_with_header(&mut buf, &mut seen) {
            Ok(chunk) => {
                // Columns changed since the last header.
                if let Some(header) = chunk.header.filter(|_| !args.no_header) {
                    if header_printed {
                        writeln!(out)?;
                    }
                    write!(out, "{}", header)?;
                    header_printed = true;
                }
                out.write_all(&buf[..chunk.len])?;
                out.flush()?;
            }
            Err(ReadError::Interrupted) => continue,
            Err(e) => return Err(e.into()),
        }
    }

    writeln!(out)?;
    info!("memlogd stopped");
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose, args.quiet);

    info!("memlogd {} starting", env!("CARGO_PKG_VERSION"));

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
