use std::path::PathBuf;

use basalt_config::BusConfig;
use basalt_events::MarketData;
use basalt_icc::{
    mono_now_ns, AttachOptions, FrameHeader, MessageQueue, FRAME_HEADER_BYTES,
};
use basalt_perf::compute_stats;
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Messages per latency report.
const STATS_INTERVAL: usize = 1_000;

/// Consume market-data ticks from a basalt shared-memory queue and report
/// queue latency percentiles.
#[derive(Parser, Debug)]
#[command(name = "basalt-consumer")]
struct Args {
    /// TOML bus config; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Total number of messages to consume (default: run until killed)
    #[arg(short = 'n', long)]
    count: Option<u64>,

    /// Number of consumers the queue is sized for
    #[arg(short = 'c', long)]
    consumers: Option<u32>,

    /// This consumer's id, in 0..num_consumers
    #[arg(long, default_value_t = 0)]
    id: u32,

    /// Pin this process to a logical core
    #[arg(long)]
    pin_core: Option<usize>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = match &args.config {
        Some(path) => BusConfig::load(path.display().to_string())?,
        None => BusConfig::default(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    let num_consumers = args.consumers.unwrap_or(config.num_consumers);
    if args.id >= num_consumers {
        return Err(format!(
            "consumer id {} must be less than num_consumers {}",
            args.id, num_consumers
        )
        .into());
    }

    if let Some(core) = args.pin_core {
        basalt_perf::pin_to_core(core)?;
        info!(core, cores = basalt_perf::cpu_count(), "pinned consumer");
    }

    let mut queue = MessageQueue::open(
        &config.shm_name,
        config.capacity,
        config.max_payload,
        num_consumers,
        AttachOptions::default(),
    )?;

    info!(
        region = %config.shm_name,
        consumer_id = args.id,
        capacity = queue.capacity(),
        "consuming market data"
    );

    let mut buf = vec![0u8; queue.element_size() as usize];
    let mut latencies: Vec<u64> = Vec::with_capacity(STATS_INTERVAL);
    let mut consumed: u64 = 0;

    loop {
        if let Some(limit) = args.count {
            if consumed >= limit {
                break;
            }
        }

        if queue.consume(args.id, &mut buf)? {
            let header = FrameHeader::read_from(&buf);
            let latency = mono_now_ns().saturating_sub(header.timestamp);
            latencies.push(latency);
            consumed += 1;

            let md = MarketData::read_from(&buf[FRAME_HEADER_BYTES..]);
            debug!(
                symbol = md.symbol_str(),
                price = md.price,
                volume = md.volume,
                sequence = header.sequence,
                latency_ns = latency,
                "consumed"
            );

            if latencies.len() == STATS_INTERVAL {
                let stats = compute_stats(&mut latencies);
                info!(
                    samples = stats.count,
                    min_ns = stats.min,
                    p50_ns = stats.p50,
                    p95_ns = stats.p95,
                    p99_ns = stats.p99,
                    max_ns = stats.max,
                    "queue latency"
                );
                latencies.clear();
            }
        } else {
            // Empty for this consumer: spin rather than sleep, latency wins
            // over power here.
            std::hint::spin_loop();
        }
    }

    if !latencies.is_empty() {
        let stats = compute_stats(&mut latencies);
        info!(
            samples = stats.count,
            min_ns = stats.min,
            p50_ns = stats.p50,
            p95_ns = stats.p95,
            p99_ns = stats.p99,
            max_ns = stats.max,
            "queue latency (final)"
        );
    }
    info!(consumed, "consumer done");
    Ok(())
}
