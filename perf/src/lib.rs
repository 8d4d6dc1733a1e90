//! Measurement helpers shared by the benchmarks and the demo consumer:
//! percentile summaries for latency samples, shared-memory scratch paths,
//! and CPU pinning for the hot threads.

use basalt_events::MarketData;

/// Percentile summary of a latency sample set, in nanoseconds.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Stats {
    pub min: u64,
    pub max: u64,
    pub mean: f64,
    pub stddev: f64,
    pub p50: u64,
    pub p90: u64,
    pub p95: u64,
    pub p99: u64,
    pub p999: u64,
    pub count: usize,
}

/// Summarize latency samples (sorts `samples` in place).
///
/// Mean and standard deviation come from Welford's recurrence in a single
/// pass; a plain running sum of squares loses precision once the sample
/// count and magnitudes grow.
///
/// # Panics
/// Panics on an empty sample set.
pub fn compute_stats(samples: &mut [u64]) -> Stats {
    assert!(!samples.is_empty(), "cannot compute stats on empty samples");
    samples.sort_unstable();

    let mut mean = 0.0;
    let mut m2 = 0.0;
    for (i, &sample) in samples.iter().enumerate() {
        let value = sample as f64;
        let delta = value - mean;
        mean += delta / (i + 1) as f64;
        m2 += delta * (value - mean);
    }

    let count = samples.len();
    Stats {
        min: samples[0],
        max: samples[count - 1],
        mean,
        stddev: (m2 / count as f64).sqrt(),
        p50: quantile_sorted(samples, 0.50),
        p90: quantile_sorted(samples, 0.90),
        p95: quantile_sorted(samples, 0.95),
        p99: quantile_sorted(samples, 0.99),
        p999: quantile_sorted(samples, 0.999),
        count,
    }
}

/// Nearest-rank quantile over an already-sorted slice, `q` in `[0, 1]`.
fn quantile_sorted(sorted: &[u64], q: f64) -> u64 {
    debug_assert!((0.0..=1.0).contains(&q));
    let idx = ((sorted.len() - 1) as f64 * q).round() as usize;
    sorted[idx]
}

/// Pin the calling thread to one logical core.
///
/// Producer and consumers are expected to run on distinct cores; pinning
/// keeps the spin loops from migrating and trashing each other's caches.
#[cfg(target_os = "linux")]
pub fn pin_to_core(core: usize) -> std::io::Result<()> {
    let mut set: libc::cpu_set_t = unsafe { std::mem::zeroed() };
    unsafe {
        libc::CPU_ZERO(&mut set);
        libc::CPU_SET(core, &mut set);
    }
    let rc = unsafe { libc::sched_setaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), &set) };
    if rc != 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(not(target_os = "linux"))]
pub fn pin_to_core(_core: usize) -> std::io::Result<()> {
    Ok(())
}

pub fn cpu_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

pub fn temp_shm_path(label: &str) -> String {
    let pid = std::process::id();
    format!("/tmp/basalt_bench_{label}_{pid}")
}

pub fn make_test_md() -> MarketData {
    MarketData::new("BTCUSDT", 12_345.67, 1_500)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_summarize_known_samples() {
        let mut samples = vec![5, 1, 9, 3, 7];
        let stats = compute_stats(&mut samples);
        assert_eq!(stats.count, 5);
        assert_eq!(stats.min, 1);
        assert_eq!(stats.max, 9);
        assert_eq!(stats.p50, 5);
        assert_eq!(stats.mean, 5.0);
    }

    #[test]
    fn stddev_matches_hand_computation() {
        // Population stddev of [2, 4, 4, 4, 5, 5, 7, 9] is exactly 2.
        let mut samples = vec![2, 4, 4, 4, 5, 5, 7, 9];
        let stats = compute_stats(&mut samples);
        assert!((stats.mean - 5.0).abs() < 1e-9);
        assert!((stats.stddev - 2.0).abs() < 1e-9);
    }

    #[test]
    fn single_sample_is_every_percentile() {
        let mut samples = vec![42];
        let stats = compute_stats(&mut samples);
        assert_eq!(stats.min, 42);
        assert_eq!(stats.p50, 42);
        assert_eq!(stats.p999, 42);
        assert_eq!(stats.max, 42);
    }

    #[test]
    #[should_panic(expected = "empty samples")]
    fn stats_panic_on_empty_input() {
        let mut samples: Vec<u64> = Vec::new();
        let _ = compute_stats(&mut samples);
    }

    #[test]
    fn cpu_count_is_positive() {
        assert!(cpu_count() >= 1);
    }
}
