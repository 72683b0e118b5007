pub mod bench;
pub mod hasher;
pub mod memstats;
pub mod registry;
pub mod report;
pub mod utils;

use anyhow::{bail, Result};
use clap::Parser;
use std::io::{self, Write};
use std::thread;
use std::time::Duration;

use bench::{run_all, BenchConfig, Iterations, DEFAULT_BENCH_TIME, DEFAULT_BUFFER_SIZE};
use registry::default_registry;
use utils::Logger;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Size of the random buffer hashed per operation, in bytes
    #[arg(long, default_value_t = DEFAULT_BUFFER_SIZE)]
    pub buffer_size: usize,

    /// Minimum measured time per benchmark in milliseconds (adaptive mode)
    #[arg(long, default_value_t = DEFAULT_BENCH_TIME.as_millis() as u64)]
    pub bench_time: u64,

    /// Run exactly this many iterations instead of adapting
    #[arg(long)]
    pub iterations: Option<u64>,

    /// Number of times to run each benchmark
    #[arg(long, default_value_t = 1)]
    pub count: u32,

    /// Only run algorithms whose name contains this text (case-insensitive)
    #[arg(long)]
    pub filter: Option<String>,

    /// Hide the B/op and allocs/op columns
    #[arg(long)]
    pub no_benchmem: bool,

    /// List the registered algorithms and exit
    #[arg(long)]
    pub list: bool,

    /// Log timestamped diagnostics to stderr
    #[arg(long)]
    pub verbose: bool,

    /// Disable the progress spinner
    #[arg(long)]
    pub no_progress: bool,
}

impl Args {
    pub fn to_config(&self) -> Result<BenchConfig> {
        if self.buffer_size == 0 {
            bail!("--buffer-size must be greater than zero");
        }
        if self.count == 0 {
            bail!("--count must be greater than zero");
        }
        let iterations = match self.iterations {
            Some(0) => bail!("--iterations must be greater than zero"),
            Some(n) => Iterations::Fixed(n),
            None if self.bench_time == 0 => bail!("--bench-time must be greater than zero"),
            None => Iterations::Adaptive {
                target: Duration::from_millis(self.bench_time),
            },
        };

        Ok(BenchConfig {
            buffer_size: self.buffer_size,
            iterations,
            count: self.count,
            benchmem: !self.no_benchmem,
            progress: !self.no_progress,
            filter: self.filter.clone(),
        })
    }
}

/// Sizes the rayon pool to every available core so parallel implementations can use them.
/// Returns the thread count in effect.
fn configure_parallelism(logger: &Logger) -> Result<usize> {
    let threads = thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);

    match rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
    {
        Ok(()) => logger.log(&format!("Worker pool sized to {} threads", threads))?,
        Err(e) => logger.log(&format!("Worker pool already configured: {}", e))?,
    }
    Ok(rayon::current_num_threads())
}

pub fn run(args: Args) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    run_to(args, &mut out)
}

/// Same as [`run`], writing the report to `out` instead of stdout.
pub fn run_to<W: Write>(args: Args, out: &mut W) -> Result<()> {
    let logger = if args.verbose {
        Logger::stderr()
    } else {
        Logger::disabled()
    };
    let config = args.to_config()?;

    // Every implementation is constructed before anything runs
    let mut registry = default_registry()?;

    if args.list {
        for (name, hasher) in registry.iter() {
            writeln!(out, "{:<24}{} bytes", name, hasher.output_size())?;
        }
        return Ok(());
    }

    if !registry.names().any(|name| config.selects(name)) {
        bail!(
            "No algorithm matches filter {:?}",
            config.filter.as_deref().unwrap_or("")
        );
    }

    writeln!(out, "{}", report::build_line())?;
    let threads = configure_parallelism(&logger)?;
    writeln!(out, "{}", report::header(&config, threads))?;

    let reports = run_all(&mut registry, &config, &logger, out)?;
    logger.log(&format!("Completed {} benchmark runs", reports.len()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Args {
        Args::parse_from(std::iter::once("hashbench").chain(extra.iter().copied()))
    }

    #[test]
    fn test_default_config() -> Result<()> {
        let config = parse(&[]).to_config()?;
        assert_eq!(config.buffer_size, 128 * 1024);
        assert_eq!(
            config.iterations,
            Iterations::Adaptive {
                target: Duration::from_secs(1)
            }
        );
        assert_eq!(config.count, 1);
        assert!(config.benchmem);
        assert!(config.filter.is_none());
        Ok(())
    }

    #[test]
    fn test_fixed_iterations_override_bench_time() -> Result<()> {
        let config = parse(&["--iterations", "50", "--bench-time", "10"]).to_config()?;
        assert_eq!(config.iterations, Iterations::Fixed(50));
        Ok(())
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(parse(&["--buffer-size", "0"]).to_config().is_err());
        assert!(parse(&["--iterations", "0"]).to_config().is_err());
        assert!(parse(&["--count", "0"]).to_config().is_err());
        assert!(parse(&["--bench-time", "0"]).to_config().is_err());
        assert!(parse(&["--bench-time", "0", "--iterations", "3"])
            .to_config()
            .is_ok());
    }
}
