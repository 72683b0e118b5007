//! The measurement loop.
//!
//! Each iteration refills the buffer with random bytes, then times only the
//! `update` + `finalize` pair. The hasher is reset after the clock stops.

use crate::hasher::DynDigest;
use crate::memstats::{self, AllocCounters};
use crate::registry::Registry;
use crate::report;
use crate::utils::Logger;
use anyhow::{bail, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rand::RngCore;
use std::hint::black_box;
use std::io::Write;
use std::time::{Duration, Instant};

pub const DEFAULT_BUFFER_SIZE: usize = 1 << 17; // 128KB
pub const DEFAULT_BENCH_TIME: Duration = Duration::from_secs(1);
pub const MAX_ITERATIONS: u64 = 1_000_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Iterations {
    Fixed(u64),
    /// Grow the iteration count until the timed total reaches `target`.
    Adaptive { target: Duration },
}

impl Default for Iterations {
    fn default() -> Self {
        Iterations::Adaptive {
            target: DEFAULT_BENCH_TIME,
        }
    }
}

/// Result of the final (reported) round of one benchmark.
#[derive(Debug, Clone)]
pub struct Measurement {
    pub iterations: u64,
    pub bytes_per_op: u64,
    /// Sum of `bytes_per_op` over every iteration actually fed to the hasher.
    pub bytes: u64,
    /// Time spent inside the timed regions only.
    pub elapsed: Duration,
    /// Allocation totals inside the timed regions, if the counting allocator is installed.
    pub allocs: Option<AllocCounters>,
    pub rounds: u32,
    /// Kept so the optimizer cannot drop the hashing; only ever logged.
    pub last_digest: Vec<u8>,
}

impl Measurement {
    pub fn ns_per_op(&self) -> f64 {
        if self.iterations == 0 {
            return 0.0;
        }
        self.elapsed.as_nanos() as f64 / self.iterations as f64
    }

    /// Throughput in MB/s, where 1 MB is 10^6 bytes.
    pub fn mb_per_sec(&self) -> Option<f64> {
        let secs = self.elapsed.as_secs_f64();
        if secs <= 0.0 || self.bytes == 0 {
            return None;
        }
        Some(self.bytes as f64 / 1e6 / secs)
    }

    pub fn allocs_per_op(&self) -> Option<u64> {
        self.allocs.map(|a| a.allocations / self.iterations.max(1))
    }

    pub fn alloc_bytes_per_op(&self) -> Option<u64> {
        self.allocs.map(|a| a.bytes / self.iterations.max(1))
    }
}

/// Next iteration count for the adaptive search.
///
/// Extrapolates from the previous round, overshoots by 20%, grows at most
/// 100x and at least by one, and never exceeds [`MAX_ITERATIONS`].
pub fn predict_iterations(target: Duration, prev_iterations: u64, prev_elapsed: Duration) -> u64 {
    let prev = prev_iterations as u128;
    let prev_ns = prev_elapsed.as_nanos().max(1);
    let mut n = target.as_nanos() * prev / prev_ns;
    n += n / 5;
    n = n.min(100 * prev);
    n = n.max(prev + 1);
    n.min(MAX_ITERATIONS as u128) as u64
}

fn random_fill() -> impl FnMut(&mut [u8]) {
    let mut rng = rand::thread_rng();
    move |buf: &mut [u8]| rng.fill_bytes(buf)
}

/// One benchmark run: a buffer, a refill source and an iteration policy.
pub struct Bench<'a> {
    buffer: Vec<u8>,
    iterations: Iterations,
    fill: Box<dyn FnMut(&mut [u8]) + 'a>,
    progress: ProgressBar,
}

impl<'a> Bench<'a> {
    pub fn new(buffer_size: usize, iterations: Iterations) -> Result<Self> {
        if buffer_size == 0 {
            bail!("Buffer size must be greater than zero");
        }
        Ok(Self {
            buffer: vec![0u8; buffer_size],
            iterations,
            fill: Box::new(random_fill()),
            progress: ProgressBar::hidden(),
        })
    }

    /// Replaces the random refill, e.g. with a deterministic or slow source.
    pub fn with_fill(mut self, fill: impl FnMut(&mut [u8]) + 'a) -> Self {
        self.fill = Box::new(fill);
        self
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    pub fn run(&mut self, hasher: &mut dyn DynDigest) -> Measurement {
        hasher.reset();
        (self.fill)(&mut self.buffer);

        match self.iterations {
            Iterations::Fixed(n) => {
                self.progress.set_message(format!("{} iterations", n));
                self.run_round(hasher, n, 1)
            }
            Iterations::Adaptive { target } => {
                let mut n = 1;
                let mut rounds = 1;
                let mut measurement = self.run_round(hasher, n, rounds);
                while measurement.elapsed < target && n < MAX_ITERATIONS {
                    n = predict_iterations(target, n, measurement.elapsed);
                    rounds += 1;
                    self.progress.set_message(format!("{} iterations", n));
                    measurement = self.run_round(hasher, n, rounds);
                }
                measurement
            }
        }
    }

    fn run_round(&mut self, hasher: &mut dyn DynDigest, n: u64, round: u32) -> Measurement {
        let mut elapsed = Duration::ZERO;
        let mut bytes = 0u64;
        let mut allocs = memstats::is_installed().then(AllocCounters::default);
        let mut last_digest = Vec::new();

        for _ in 0..n {
            (self.fill)(&mut self.buffer);

            let region = memstats::region();
            let start = Instant::now();
            hasher.update(black_box(&self.buffer));
            let digest = hasher.finalize();
            elapsed += start.elapsed();
            let change = region.change();

            if let Some(total) = allocs.as_mut() {
                total.add(change.into());
            }

            hasher.reset();
            bytes += self.buffer.len() as u64;
            last_digest = black_box(digest);
        }
        self.progress.tick();

        Measurement {
            iterations: n,
            bytes_per_op: self.buffer.len() as u64,
            bytes,
            elapsed,
            allocs,
            rounds: round,
            last_digest,
        }
    }
}

/// Runs one benchmark with the default random refill.
pub fn run_benchmark(
    hasher: &mut dyn DynDigest,
    buffer_size: usize,
    iterations: Iterations,
) -> Result<Measurement> {
    Ok(Bench::new(buffer_size, iterations)?.run(hasher))
}

#[derive(Debug, Clone)]
pub struct BenchConfig {
    pub buffer_size: usize,
    pub iterations: Iterations,
    /// Number of times each benchmark is repeated.
    pub count: u32,
    pub benchmem: bool,
    pub progress: bool,
    /// Case-insensitive substring; `None` selects everything.
    pub filter: Option<String>,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            iterations: Iterations::default(),
            count: 1,
            benchmem: true,
            progress: true,
            filter: None,
        }
    }
}

impl BenchConfig {
    pub fn selects(&self, name: &str) -> bool {
        match &self.filter {
            Some(pattern) => name.to_lowercase().contains(&pattern.to_lowercase()),
            None => true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Report {
    pub name: String,
    pub measurement: Measurement,
}

/// Benchmarks every selected registry entry in name order, one after another,
/// writing a report line to `out` as each finishes.
pub fn run_all<W: Write>(
    registry: &mut Registry,
    config: &BenchConfig,
    logger: &Logger,
    out: &mut W,
) -> Result<Vec<Report>> {
    let mut reports = Vec::new();

    for (name, hasher) in registry.iter_mut() {
        if !config.selects(name) {
            continue;
        }

        for _ in 0..config.count {
            let pb = if config.progress {
                let pb = ProgressBar::new_spinner();
                pb.set_style(
                    ProgressStyle::default_spinner().template("{spinner:.green} {prefix}: {msg}")?,
                );
                pb.set_prefix(name.to_string());
                pb
            } else {
                ProgressBar::hidden()
            };

            let measurement = Bench::new(config.buffer_size, config.iterations)?
                .with_progress(pb.clone())
                .run(hasher);
            pb.finish_and_clear();

            writeln!(out, "{}", report::format_line(name, &measurement, config.benchmem))?;
            out.flush()?;
            logger.log(&format!(
                "{}: {} rounds, last digest {}",
                name,
                measurement.rounds,
                hex::encode(&measurement.last_digest)
            ))?;

            reports.push(Report {
                name: name.to_string(),
                measurement,
            });
        }
    }

    Ok(reports)
}
