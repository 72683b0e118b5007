use crate::bench::{BenchConfig, Iterations, Measurement};
use crate::utils::format_bytes;
use std::env::consts::{ARCH, OS};

/// One line describing the build and target, printed before any benchmark.
pub fn build_line() -> String {
    format!(
        "Build: hashbench {} ({}) {}-{}",
        env!("CARGO_PKG_VERSION"),
        env!("HASHBENCH_RUSTC_VERSION"),
        OS,
        ARCH
    )
}

pub fn header(config: &BenchConfig, threads: usize) -> String {
    let policy = match config.iterations {
        Iterations::Fixed(n) => format!("{} iterations", n),
        Iterations::Adaptive { target } => format!("adaptive, {:?} per benchmark", target),
    };
    format!(
        "Buffer: {} per op, {}, count {}, {} worker threads",
        format_bytes(config.buffer_size as u64),
        policy,
        config.count,
        threads
    )
}

fn format_ns(ns: f64) -> String {
    if ns >= 100.0 {
        format!("{:.0}", ns)
    } else if ns >= 10.0 {
        format!("{:.1}", ns)
    } else {
        format!("{:.2}", ns)
    }
}

/// Tab separated result line: name, iterations, ns/op, MB/s and optionally B/op and allocs/op.
pub fn format_line(name: &str, m: &Measurement, benchmem: bool) -> String {
    let mut line = format!(
        "{:<24}\t{:>10}\t{:>12} ns/op",
        name,
        m.iterations,
        format_ns(m.ns_per_op())
    );
    if let Some(rate) = m.mb_per_sec() {
        line.push_str(&format!("\t{:>10.2} MB/s", rate));
    }
    if benchmem {
        if let (Some(bytes), Some(allocs)) = (m.alloc_bytes_per_op(), m.allocs_per_op()) {
            line.push_str(&format!("\t{:>8} B/op\t{:>6} allocs/op", bytes, allocs));
        }
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memstats::AllocCounters;
    use std::time::Duration;

    fn measurement(allocs: Option<AllocCounters>) -> Measurement {
        Measurement {
            iterations: 2000,
            bytes_per_op: 1 << 17,
            bytes: 2000 << 17,
            elapsed: Duration::from_millis(500),
            allocs,
            rounds: 4,
            last_digest: vec![0; 32],
        }
    }

    #[test]
    fn test_format_line() {
        let m = measurement(Some(AllocCounters {
            allocations: 2000,
            bytes: 64_000,
        }));
        let line = format_line("SHA256", &m, true);
        let fields: Vec<&str> = line.split('\t').map(str::trim).collect();
        assert_eq!(
            fields,
            [
                "SHA256",
                "2000",
                "250000 ns/op",
                "524.29 MB/s",
                "32 B/op",
                "1 allocs/op"
            ]
        );
    }

    #[test]
    fn test_format_line_without_allocs() {
        let with_counters = measurement(Some(AllocCounters::default()));
        assert!(!format_line("MD5", &with_counters, false).contains("allocs/op"));

        let without_counters = measurement(None);
        let line = format_line("MD5", &without_counters, true);
        assert!(line.ends_with("MB/s"));
    }

    #[test]
    fn test_format_ns() {
        assert_eq!(format_ns(123456.7), "123457");
        assert_eq!(format_ns(42.24), "42.2");
        assert_eq!(format_ns(1.5), "1.50");
    }

    #[test]
    fn test_header() {
        let config = BenchConfig {
            iterations: Iterations::Fixed(10),
            ..BenchConfig::default()
        };
        assert_eq!(
            header(&config, 8),
            "Buffer: 128.00 KB per op, 10 iterations, count 1, 8 worker threads"
        );
        assert!(build_line().starts_with("Build: hashbench "));
        assert!(build_line().ends_with(&format!("{}-{}", OS, ARCH)));
    }
}
