//! relay-play: play an RTP/H.264 stream arriving on a loopback port
//!
//! Usage:
//!   relay-play 5004
//!   relay-play 5004 -c relay.yaml
//!   relay-play 5004 --dry-run
//!
//! Exits as soon as the engine is running; the engine outlives this process.

use media_relay::cli::{self, PlayArgs};
use media_relay::{Relay, SearchPathLocator};

#[tokio::main]
async fn main() {
    let args: PlayArgs = argh::from_env();
    cli::init_logging(&args.log_level);

    let config = match cli::load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => cli::exit_with(e),
    };
    let relay = Relay::from_config(&config, SearchPathLocator::new());

    let port = match cli::parse_port(&args.port) {
        Ok(port) => port,
        Err(e) => cli::exit_with(e.into()),
    };

    if args.dry_run {
        match relay.receive_command(port) {
            Ok(command) => println!("{}", command),
            Err(e) => cli::exit_with(e),
        }
        return;
    }

    match relay.start_receiver(port).await {
        Ok(handle) => {
            let pid = handle.release();
            log::info!("Receiver engine running with PID {}", pid);
        }
        Err(e) => cli::exit_with(e),
    }
}
