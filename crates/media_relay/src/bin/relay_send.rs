//! relay-send: transcode a file to H.264 and stream it to a loopback port
//!
//! Usage:
//!   relay-send clip.ts 5004
//!   relay-send clip.ts 5004 -c relay.yaml
//!   relay-send clip.ts 5004 --dry-run
//!
//! Blocks until the engine exits and mirrors its exit code. Ctrl+C stops the
//! engine and exits with 130.

use media_relay::cli::{self, SendArgs};
use media_relay::{Relay, SearchPathLocator};

#[tokio::main]
async fn main() {
    let args: SendArgs = argh::from_env();
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
        match relay.send_command(&args.file, port) {
            Ok(command) => println!("{}", command),
            Err(e) => cli::exit_with(e),
        }
        return;
    }

    let (_shutdown_tx, shutdown_rx) = cli::shutdown_channel();

    match relay.start_sender(&args.file, port, Some(shutdown_rx)).await {
        Ok(outcome) => {
            if !outcome.success() {
                log::error!("runtime failed: {}", outcome);
            }
            std::process::exit(outcome.exit_code());
        }
        Err(e) => cli::exit_with(e),
    }
}
