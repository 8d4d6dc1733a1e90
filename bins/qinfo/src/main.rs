//! Region introspection: map a basalt region read-only and print its header,
//! per-consumer tails and fill depths. Never mutates the region.

use std::path::PathBuf;
use std::process::ExitCode;

use basalt_icc::{RingBuffer, RingInfo, HEADER_BYTES, TAIL_ENTRY_BYTES};
use clap::Parser;

/// Inspect a basalt shared-memory queue region.
#[derive(Parser, Debug)]
#[command(name = "basalt-qinfo")]
struct Args {
    /// Path of the shared-memory region (e.g. /dev/shm/basalt_md_bus)
    region: PathBuf,
}

fn print_info(info: &RingInfo) {
    println!("=== region header ===");
    println!("capacity:      {} messages", info.capacity);
    println!("element_size:  {} bytes", info.element_size);
    println!("num_consumers: {}", info.num_consumers);
    println!("head:          {}", info.head);

    println!();
    println!("=== consumers ===");
    for (i, tail) in info.tails.iter().enumerate() {
        println!(
            "consumer {i:>2}: tail={tail:>6}  backlog={:>6} messages",
            info.depth(i)
        );
    }

    let geometry = info.geometry();
    let metadata = HEADER_BYTES + info.num_consumers as usize * TAIL_ENTRY_BYTES;
    let slots = geometry.total_bytes() - metadata as u64;
    println!();
    println!("=== layout ===");
    println!("header + tails: {metadata} bytes");
    println!("slot array:     {slots} bytes");
    println!("total:          {} bytes", geometry.total_bytes());
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let _ = err.print();
            // --help and --version land here too; only real parse errors
            // are failures.
            return if err.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    match RingBuffer::inspect(&args.region) {
        Ok(info) if info.is_initialized() => {
            println!("region: {}", args.region.display());
            println!();
            print_info(&info);
            ExitCode::SUCCESS
        }
        Ok(_) => {
            // Mapped but the creator has not finished writing the header.
            println!(
                "region {} exists but is not initialized yet",
                args.region.display()
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("basalt-qinfo: {err}");
            ExitCode::FAILURE
        }
    }
}
