//! Command-line interface for the relay binaries

use crate::config::RelayConfig;
use crate::endpoint::EndpointError;
use crate::error::LaunchError;
use argh::FromArgs;
use tokio::sync::watch;

/// Play an RTP/H.264 stream arriving on a loopback port (detached)
#[derive(FromArgs, Debug)]
pub struct PlayArgs {
    /// UDP port on 127.0.0.1 to receive from
    #[argh(positional)]
    pub port: String,

    /// engine profile YAML (default: built-in cvlc profile)
    #[argh(option, short = 'c')]
    pub config: Option<String>,

    /// print the engine command without starting it
    #[argh(switch)]
    pub dry_run: bool,

    /// log level (error, warn, info, debug, trace)
    #[argh(option, short = 'l', default = "String::from(\"warn\")")]
    pub log_level: String,
}

/// Transcode a file to H.264 and stream it as RTP/MPEG-TS to a loopback port
#[derive(FromArgs, Debug)]
pub struct SendArgs {
    /// media file to stream
    #[argh(positional)]
    pub file: String,

    /// UDP port on 127.0.0.1 to send to
    #[argh(positional)]
    pub port: String,

    /// engine profile YAML (default: built-in cvlc profile)
    #[argh(option, short = 'c')]
    pub config: Option<String>,

    /// print the engine command without starting it
    #[argh(switch)]
    pub dry_run: bool,

    /// log level (error, warn, info, debug, trace)
    #[argh(option, short = 'l', default = "String::from(\"warn\")")]
    pub log_level: String,
}

/// Record every UDP datagram arriving on a loopback port until Ctrl+C
#[derive(FromArgs, Debug)]
pub struct DumpArgs {
    /// capture file to write
    #[argh(positional)]
    pub file: String,

    /// UDP port on 127.0.0.1 to listen on
    #[argh(positional)]
    pub port: String,

    /// log level (error, warn, info, debug, trace)
    #[argh(option, short = 'l', default = "String::from(\"info\")")]
    pub log_level: String,
}

/// Play a capture file back to a loopback port
#[derive(FromArgs, Debug)]
pub struct ReplayArgs {
    /// capture file to read
    #[argh(positional)]
    pub file: String,

    /// UDP port on 127.0.0.1 to send to
    #[argh(positional)]
    pub port: String,

    /// start at this many seconds into the capture
    #[argh(option, from_str_fn(parse_seconds))]
    pub begin: Option<f64>,

    /// stop after this many seconds into the capture
    #[argh(option, from_str_fn(parse_seconds))]
    pub end: Option<f64>,

    /// datagrams sent per pacing step (default: 100)
    #[argh(option, default = "100")]
    pub batch: usize,

    /// log level (error, warn, info, debug, trace)
    #[argh(option, short = 'l', default = "String::from(\"info\")")]
    pub log_level: String,
}

/// Parse a non-negative number of seconds
fn parse_seconds(s: &str) -> Result<f64, String> {
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Ok(v),
        _ => Err(format!(
            "Invalid time '{}'. Expected a non-negative number of seconds",
            s
        )),
    }
}

/// Parse port text, leaving the range check to the launchers
pub fn parse_port(s: &str) -> Result<i64, EndpointError> {
    s.trim()
        .parse()
        .map_err(|_| EndpointError::InvalidPort(s.to_string()))
}

/// Initialize env_logger at `level`, falling back to `warn` for unknown names
pub fn init_logging(level: &str) {
    let level = match level.to_lowercase().as_str() {
        "error" => "error",
        "warn" => "warn",
        "info" => "info",
        "debug" => "debug",
        "trace" => "trace",
        _ => "warn",
    };
    env_logger::Builder::new()
        .parse_filters(level)
        .format_target(false)
        .init();
}

/// Load the engine profile from `--config`, or the built-in one
pub fn load_config(path: Option<&str>) -> Result<RelayConfig, LaunchError> {
    if let Some(path) = path {
        log::info!("Loading config file: {}", path);
    }
    Ok(RelayConfig::load(path)?)
}

/// Channel that fires once on Ctrl+C
pub fn shutdown_channel() -> (watch::Sender<()>, watch::Receiver<()>) {
    let (shutdown_tx, shutdown_rx) = watch::channel(());

    let tx = shutdown_tx.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        log::info!("Received Ctrl+C, initiating shutdown...");
        let _ = tx.send(());
    }) {
        log::warn!("Failed to set Ctrl+C handler: {}", e);
    }

    (shutdown_tx, shutdown_rx)
}

/// Report a failed launch on stderr and exit with its code
pub fn exit_with(error: LaunchError) -> ! {
    log::error!("{} failed: {}", error.stage(), error);
    std::process::exit(error.exit_code());
}
