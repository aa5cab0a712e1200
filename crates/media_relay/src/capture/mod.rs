//! Loopback UDP capture and replay
//!
//! Datagrams are stored as opaque bytes, one text record per line, so a
//! stream can be recorded once and played back to a receiver later.

mod dump;
mod player;
mod record;

pub use dump::*;
pub use player::*;
pub use record::*;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Errors from recording or replaying a capture
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Capture file error on '{}': {source}", .path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Socket error: {0}")]
    Socket(#[source] std::io::Error),
}

impl CaptureError {
    fn file(path: &Path, source: std::io::Error) -> Self {
        CaptureError::File {
            path: path.to_path_buf(),
            source,
        }
    }
}
