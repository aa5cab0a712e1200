//! Recording loopback UDP traffic to a capture file

use super::record::Record;
use super::CaptureError;
use crate::endpoint::StreamEndpoint;
use crate::runtime::supervisor::cancellation;
use std::net::SocketAddr;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::net::UdpSocket;
use tokio::sync::watch;
use tokio::time::Instant;

/// Largest datagram that is recorded in full
pub const MAX_DATAGRAM_SIZE: usize = 16384;

/// A socket bound on `127.0.0.1:<port>`, ready to record
pub struct Dumper {
    socket: UdpSocket,
}

impl Dumper {
    pub async fn bind(endpoint: StreamEndpoint) -> Result<Self, CaptureError> {
        let addr = endpoint.socket_addr();
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|source| CaptureError::Bind { addr, source })?;
        log::info!("Capturing datagrams on {}", addr);
        Ok(Self { socket })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, CaptureError> {
        self.socket.local_addr().map_err(CaptureError::Socket)
    }

    /// Append one record per datagram to `path` until `cancel` fires.
    ///
    /// Timestamps count from the first datagram, which is always 0.0, so
    /// idle time before traffic starts is not recorded. Returns the number
    /// of datagrams written.
    pub async fn run(
        self,
        path: impl AsRef<Path>,
        mut cancel: Option<watch::Receiver<()>>,
    ) -> Result<u64, CaptureError> {
        let path = path.as_ref();
        let file = File::create(path)
            .await
            .map_err(|source| CaptureError::file(path, source))?;
        let mut writer = BufWriter::new(file);

        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
        let mut first_packet_at: Option<Instant> = None;
        let mut written = 0u64;

        loop {
            let len = tokio::select! {
                received = self.socket.recv(&mut buf) => received.map_err(CaptureError::Socket)?,
                _ = cancellation(&mut cancel) => break,
            };
            let received_at = Instant::now();

            let first = *first_packet_at.get_or_insert(received_at);
            let record = Record {
                timestamp: received_at.duration_since(first).as_secs_f64(),
                payload: buf[..len].to_vec(),
            };

            writer
                .write_all(record.to_line().as_bytes())
                .await
                .map_err(|source| CaptureError::file(path, source))?;
            written += 1;
            log::trace!("Recorded {} bytes at {:.6}s", len, record.timestamp);
        }

        writer
            .flush()
            .await
            .map_err(|source| CaptureError::file(path, source))?;
        log::info!("Wrote {} datagrams to {}", written, path.display());
        Ok(written)
    }
}
