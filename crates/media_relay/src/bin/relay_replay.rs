//! relay-replay: play a capture file back to a loopback port
//!
//! Usage:
//!   relay-replay capture.txt 5004
//!   relay-replay capture.txt 5004 --begin 10 --end 25.5

use media_relay::cli::{self, ReplayArgs};
use media_relay::{replay, ReplayOptions, StreamEndpoint};

#[tokio::main]
async fn main() {
    let args: ReplayArgs = argh::from_env();
    cli::init_logging(&args.log_level);

    let endpoint = match args.port.parse::<StreamEndpoint>() {
        Ok(endpoint) => endpoint,
        Err(e) => cli::exit_with(e.into()),
    };

    let options = ReplayOptions {
        begin: args.begin,
        end: args.end,
        batch_size: args.batch,
    };

    let (_shutdown_tx, shutdown_rx) = cli::shutdown_channel();

    match replay(&args.file, endpoint, &options, Some(shutdown_rx)).await {
        Ok(count) => log::info!("Sent {} datagrams to {}", count, endpoint),
        Err(e) => cli::exit_with(e.into()),
    }
}
