use std::path::PathBuf;
use std::time::Duration;

use basalt_config::BusConfig;
use basalt_events::MarketData;
use basalt_icc::{AttachOptions, MessageQueue, MessageType};
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Publish synthetic market-data ticks onto a basalt shared-memory queue.
#[derive(Parser, Debug)]
#[command(name = "basalt-producer")]
struct Args {
    /// TOML bus config; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Total number of messages to produce (default: run until killed)
    #[arg(short = 'n', long)]
    count: Option<u64>,

    /// Number of consumers the queue is sized for
    #[arg(short = 'c', long)]
    consumers: Option<u32>,

    /// Unlink any existing region and start fresh
    #[arg(long)]
    force_recreate: bool,

    /// Pin this process to a logical core
    #[arg(long)]
    pin_core: Option<usize>,

    /// Microseconds to sleep between ticks
    #[arg(long, default_value_t = 1_000)]
    interval_us: u64,
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

    if let Some(core) = args.pin_core {
        basalt_perf::pin_to_core(core)?;
        info!(core, cores = basalt_perf::cpu_count(), "pinned producer");
    }

    let mut queue = MessageQueue::open(
        &config.shm_name,
        config.capacity,
        config.max_payload,
        num_consumers,
        AttachOptions {
            force_recreate: args.force_recreate,
            ..AttachOptions::default()
        },
    )?;

    info!(
        region = %config.shm_name,
        capacity = queue.capacity(),
        max_payload = queue.max_payload(),
        num_consumers,
        creator = queue.is_creator(),
        "producing market data"
    );

    let mut produced: u64 = 0;
    let mut counter: u64 = 0;

    loop {
        if let Some(limit) = args.count {
            if produced >= limit {
                break;
            }
        }

        let md = MarketData::new(
            "AAPL",
            182.72 + (counter % 10) as f64 * 0.01,
            1_000 + counter % 500,
        );

        if queue.produce(MessageType::MARKET_DATA, &md.to_bytes())? {
            debug!(
                symbol = md.symbol_str(),
                price = md.price,
                volume = md.volume,
                "produced"
            );
            produced += 1;
            counter += 1;
        }
        // On a full ring we just come back around after the interval; the
        // slowest consumer sets the pace.

        std::thread::sleep(Duration::from_micros(args.interval_us));
    }

    info!(produced, "producer done");
    Ok(())
}
