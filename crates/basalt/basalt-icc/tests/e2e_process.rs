//! End-to-end two-process test for the shared-memory queue.
//!
//! The same test executable is re-invoked with role environment variables to
//! run a producer process and a consumer process that communicate through a
//! real shared region **concurrently**:
//!
//! ```text
//!                     Time -->
//!
//! [PRODUCER] --[create]--[produce, spinning on full]------------[done]
//!                 |            |     |     |
//!                 v            v     v     v
//!             [shm region]  (backpressured ring)
//!                 |            ^     ^     ^
//!                 v            |     |     |
//! [CONSUMER] ----[attach no_create]--[consume]------------------[done]
//! ```
//!
//! Unlike a lossy bus, this queue backpressures the producer, so the
//! consumer must observe *every* message exactly once, in order, with
//! contiguous sequence numbers. That is the property being validated
//! across real process boundaries, page mappings and cache lines.

use std::env;
use std::io::Write;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use basalt_events::{MarketData, MARKET_DATA_WIRE_BYTES};
use basalt_icc::{
    AttachOptions, Error, FrameHeader, MessageQueue, MessageType, FRAME_HEADER_BYTES,
};

/// Writes to stderr with immediate flush to bypass test output capture.
macro_rules! log {
    ($($arg:tt)*) => {{
        let _ = writeln!(std::io::stderr(), $($arg)*);
        let _ = std::io::stderr().flush();
    }};
}

const ENV_ROLE: &str = "BASALT_E2E_ROLE";
const ENV_PATH: &str = "BASALT_E2E_PATH";

const ROLE_PRODUCER: &str = "producer";
const ROLE_CONSUMER: &str = "consumer";

const MESSAGE_COUNT: u64 = 50_000;
const CAPACITY: u32 = 1024;
const MAX_PAYLOAD: u32 = MARKET_DATA_WIRE_BYTES as u32;

fn region_path() -> String {
    format!("/tmp/basalt_e2e_bus_{}", std::process::id())
}

fn run_producer(path: &str) {
    log!("[PRODUCER] creating queue at {path} (capacity {CAPACITY})");
    let mut queue =
        MessageQueue::open(path, CAPACITY, MAX_PAYLOAD, 1, AttachOptions::default())
            .expect("producer: failed to create queue");
    assert!(queue.is_creator());

    let deadline = Instant::now() + Duration::from_secs(60);
    let start = Instant::now();

    for i in 0..MESSAGE_COUNT {
        let md = MarketData::new("E2E", 100.0 + (i % 100) as f64, i);
        let payload = md.to_bytes();
        // Spin on a full ring: the consumer's pace gates ours.
        while !queue.produce(MessageType::MARKET_DATA, &payload).unwrap() {
            if Instant::now() > deadline {
                panic!("[PRODUCER] consumer stalled, ring stayed full");
            }
            std::hint::spin_loop();
        }
        if (i + 1) % 10_000 == 0 {
            log!("[PRODUCER] progress: {}/{MESSAGE_COUNT}", i + 1);
        }
    }

    let elapsed = start.elapsed();
    let rate = MESSAGE_COUNT as f64 / elapsed.as_secs_f64();
    log!("[PRODUCER] done: {MESSAGE_COUNT} messages in {elapsed:?} ({rate:.0} msg/s)");
}

fn run_consumer(path: &str) {
    log!("[CONSUMER] waiting for queue at {path}");

    // The producer creates the region; attach strictly, retrying until it
    // appears.
    let open_deadline = Instant::now() + Duration::from_secs(10);
    let attach = AttachOptions {
        no_create: true,
        ..AttachOptions::default()
    };
    let mut queue = loop {
        match MessageQueue::open(path, CAPACITY, MAX_PAYLOAD, 1, attach) {
            Ok(queue) => break queue,
            Err(Error::NotFound(_)) if Instant::now() < open_deadline => {
                std::thread::sleep(Duration::from_millis(1));
            }
            Err(err) => panic!("[CONSUMER] failed to attach: {err}"),
        }
    };
    log!("[CONSUMER] attached");

    let mut buf = vec![0u8; queue.element_size() as usize];
    let read_deadline = Instant::now() + Duration::from_secs(60);
    let start = Instant::now();
    let mut received = 0u64;

    while received < MESSAGE_COUNT {
        if queue.consume(0, &mut buf).unwrap() {
            let header = FrameHeader::read_from(&buf);
            assert_eq!(
                header.sequence, received,
                "sequence gap or reorder at message {received}"
            );
            let md = MarketData::read_from(&buf[FRAME_HEADER_BYTES..]);
            assert_eq!(md.volume, received, "payload does not match its index");
            received += 1;
            if received % 10_000 == 0 {
                log!("[CONSUMER] progress: {received}/{MESSAGE_COUNT}");
            }
        } else {
            if Instant::now() > read_deadline {
                panic!("[CONSUMER] timed out after {received} messages");
            }
            std::hint::spin_loop();
        }
    }

    let elapsed = start.elapsed();
    let rate = received as f64 / elapsed.as_secs_f64();
    log!("[CONSUMER] done: {received} messages in {elapsed:?} ({rate:.0} msg/s)");
}

/// Two-process concurrent end-to-end test.
///
/// Validates, across a real process boundary:
/// 1. the create / no_create rendezvous,
/// 2. exactly-once in-order delivery under backpressure,
/// 3. the acquire/release slot-publication protocol,
/// 4. contiguous per-producer sequence numbers.
#[test]
fn e2e_two_process_queue() {
    // Child invocation?
    if let Ok(role) = env::var(ENV_ROLE) {
        let path = env::var(ENV_PATH).expect("BASALT_E2E_PATH not set");
        match role.as_str() {
            ROLE_PRODUCER => run_producer(&path),
            ROLE_CONSUMER => run_consumer(&path),
            other => panic!("unknown role: {other}"),
        }
        return;
    }

    let path = region_path();
    let exe = env::current_exe().expect("failed to get current executable");

    log!("");
    log!("E2E two-process queue test: {MESSAGE_COUNT} messages, capacity {CAPACITY}");
    log!("region: {path}");

    let mut producer = Command::new(&exe)
        .arg("--exact")
        .arg("e2e_two_process_queue")
        .env(ENV_ROLE, ROLE_PRODUCER)
        .env(ENV_PATH, &path)
        .stderr(Stdio::inherit())
        .spawn()
        .expect("failed to spawn producer process");

    // Give the producer a moment to create the region; the consumer retries
    // anyway.
    std::thread::sleep(Duration::from_millis(5));

    let mut consumer = Command::new(&exe)
        .arg("--exact")
        .arg("e2e_two_process_queue")
        .env(ENV_ROLE, ROLE_CONSUMER)
        .env(ENV_PATH, &path)
        .stderr(Stdio::inherit())
        .spawn()
        .expect("failed to spawn consumer process");

    let producer_status = producer.wait().expect("failed to wait for producer");
    let consumer_status = consumer.wait().expect("failed to wait for consumer");

    let _ = std::fs::remove_file(&path);

    assert!(producer_status.success(), "producer failed: {producer_status}");
    assert!(consumer_status.success(), "consumer failed: {consumer_status}");
    log!("e2e two-process test passed");
}
