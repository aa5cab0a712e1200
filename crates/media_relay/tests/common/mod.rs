//! Test helpers: a `/bin/sh` stand-in for the media engine

#![allow(dead_code)]

use media_relay::{EngineLocator, EngineNotFound, EngineProfile, FixedLocator, Relay, Supervisor};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const SHELL: &str = "/bin/sh";

/// Profile whose engine is `sh`, so each template is `-c <script> ...`
pub fn shell_profile(receive_args: &[&str], send_args: &[&str]) -> EngineProfile {
    EngineProfile {
        program: "sh".to_string(),
        receive_args: receive_args.iter().map(|s| s.to_string()).collect(),
        send_args: send_args.iter().map(|s| s.to_string()).collect(),
    }
}

/// Relay running `sh` scripts in place of the engine
pub fn shell_relay(receive_args: &[&str], send_args: &[&str]) -> Relay {
    let supervisor =
        Supervisor::new(FixedLocator::new(SHELL)).with_stop_timeout(Duration::from_secs(1));
    Relay::new(supervisor, shell_profile(receive_args, send_args))
}

/// Locator that counts lookups and never finds anything
#[derive(Clone, Default)]
pub struct CountingLocator {
    pub calls: Arc<AtomicUsize>,
}

impl CountingLocator {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl EngineLocator for CountingLocator {
    fn locate(&self, program: &str) -> Result<PathBuf, EngineNotFound> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(EngineNotFound(program.to_string()))
    }
}

/// A loopback UDP port that was free a moment ago
pub fn free_udp_port() -> u16 {
    let socket = std::net::UdpSocket::bind("127.0.0.1:0").expect("bind ephemeral port");
    socket.local_addr().expect("local addr").port()
}
