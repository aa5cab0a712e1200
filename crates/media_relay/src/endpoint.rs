//! Validated launch inputs: loopback stream endpoints and source files

use std::fmt;
use std::fs::File;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Destination host for every stream. Never user supplied.
pub const LOOPBACK_HOST: Ipv4Addr = Ipv4Addr::LOCALHOST;

/// Hop limit applied to outgoing stream packets.
pub const STREAM_TTL: u32 = 1;

/// A UDP endpoint on the loopback interface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamEndpoint {
    port: u16,
}

impl StreamEndpoint {
    /// Build an endpoint, rejecting ports outside 1..=65535
    pub fn new(port: i64) -> Result<Self, EndpointError> {
        match u16::try_from(port) {
            Ok(port) if port != 0 => Ok(Self { port }),
            _ => Err(EndpointError::InvalidPort(port.to_string())),
        }
    }

    pub fn host(&self) -> Ipv4Addr {
        LOOPBACK_HOST
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(LOOPBACK_HOST, self.port))
    }
}

impl FromStr for StreamEndpoint {
    type Err = EndpointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let port: i64 = s
            .trim()
            .parse()
            .map_err(|_| EndpointError::InvalidPort(s.to_string()))?;
        Self::new(port)
    }
}

impl fmt::Display for StreamEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", LOOPBACK_HOST, self.port)
    }
}

/// A media file that was readable when it was validated.
///
/// The engine opens the file again on its own and may still fail on it;
/// this check only guarantees the launcher never spawns for a path that
/// is obviously wrong.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    path: PathBuf,
}

impl SourceFile {
    /// Validate that `path` names an existing, readable regular file
    pub fn open(path: impl AsRef<Path>) -> Result<Self, EndpointError> {
        let path = path.as_ref();
        let metadata = match std::fs::metadata(path) {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(EndpointError::FileNotFound(path.to_path_buf()));
            }
            Err(e) => {
                return Err(EndpointError::FileNotReadable {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                });
            }
        };

        if !metadata.is_file() {
            return Err(EndpointError::FileNotReadable {
                path: path.to_path_buf(),
                reason: "not a regular file".to_string(),
            });
        }

        File::open(path).map_err(|e| EndpointError::FileNotReadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Input validation failures, all detected before anything is spawned
#[derive(Debug, thiserror::Error)]
pub enum EndpointError {
    #[error("Invalid port '{0}': expected an integer in 1..=65535")]
    InvalidPort(String),

    #[error("Source file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Source file not readable: {}: {reason}", .path.display())]
    FileNotReadable { path: PathBuf, reason: String },
}
