//! relay-dump: record UDP datagrams arriving on a loopback port
//!
//! Usage:
//!   relay-dump capture.txt 5004
//!
//! Records until Ctrl+C, then flushes the file and exits.

use media_relay::cli::{self, DumpArgs};
use media_relay::{Dumper, StreamEndpoint};

#[tokio::main]
async fn main() {
    let args: DumpArgs = argh::from_env();
    cli::init_logging(&args.log_level);

    let endpoint = match args.port.parse::<StreamEndpoint>() {
        Ok(endpoint) => endpoint,
        Err(e) => cli::exit_with(e.into()),
    };

    let (_shutdown_tx, shutdown_rx) = cli::shutdown_channel();

    let dumper = match Dumper::bind(endpoint).await {
        Ok(dumper) => dumper,
        Err(e) => cli::exit_with(e.into()),
    };

    match dumper.run(&args.file, Some(shutdown_rx)).await {
        Ok(count) => println!("Recorded {} datagrams to {}", count, args.file),
        Err(e) => cli::exit_with(e.into()),
    }
}
