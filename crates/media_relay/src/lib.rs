//! Media Relay
//!
//! Launches an external media engine (VLC's `cvlc` by default) to play or
//! send H.264 over RTP on the loopback interface, and supervises it.
//!
//! # Overview
//!
//! - The receiver launcher starts a detached engine listening on
//!   `127.0.0.1:<port>` and returns at once.
//! - The sender launcher transcodes a file to H.264, streams it as
//!   RTP/MPEG-TS to `127.0.0.1:<port>` with TTL 1, and blocks until the
//!   engine exits.
//! - Inputs are validated before anything is spawned. Engine output is
//!   discarded unless captured, and engine failures are reported as exit
//!   codes or signals without interpretation.
//! - The capture tools record and replay raw loopback UDP traffic.
//!
//! # Example Config File
//!
//! ```yaml
//! engine:
//!   program: cvlc
//!   receive_args: ["-q", "rtp://$(arg host):$(arg port)"]
//!   send_args:
//!     - "-q"
//!     - "$(arg source)"
//!     - "--sout"
//!     - "#transcode{vcodec=h264}:rtp{dst=$(arg host),port=$(arg port),mux=ts,ttl=$(arg ttl)}"
//! stop_timeout_ms: 5000
//! ```

pub mod capture;
pub mod cli;
pub mod config;
pub mod endpoint;
pub mod engine;
pub mod error;
pub mod launch;
pub mod runtime;

pub use capture::{
    find_timestamp, parse_record, replay, CaptureError, Dumper, Record, ReplayOptions,
};
pub use config::{ConfigError, EngineProfile, RelayConfig, SubstitutionContext, SubstitutionError};
pub use endpoint::{EndpointError, SourceFile, StreamEndpoint};
pub use engine::{EngineLocator, EngineNotFound, FixedLocator, SearchPathLocator};
pub use error::{LaunchError, Stage};
pub use launch::{ExitOutcome, ReceiverHandle, Relay};
pub use runtime::{
    ChildProcess, ChildStatus, EngineCommand, LaunchOptions, OutputMode, ProcessEvent, Supervisor,
    SupervisorError,
};
