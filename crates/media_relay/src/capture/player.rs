//! Playing a capture file back to a loopback port

use super::record::parse_record;
use super::CaptureError;
use crate::endpoint::{StreamEndpoint, STREAM_TTL};
use crate::runtime::supervisor::cancellation;
use std::io::SeekFrom;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader};
use tokio::net::UdpSocket;
use tokio::sync::watch;
use tokio::time::Instant;

/// Replay window and pacing
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayOptions {
    /// Skip records before this many seconds
    pub begin: Option<f64>,
    /// Stop before the first record after this many seconds
    pub end: Option<f64>,
    /// Datagrams sent back-to-back per pacing step
    pub batch_size: usize,
}

impl Default for ReplayOptions {
    fn default() -> Self {
        Self {
            begin: None,
            end: None,
            batch_size: 100,
        }
    }
}

/// Byte offset of the first record whose timestamp is at or after
/// `timestamp`, or the file length when there is none.
///
/// Malformed lines are skipped.
pub async fn find_timestamp(path: impl AsRef<Path>, timestamp: f64) -> Result<u64, CaptureError> {
    let path = path.as_ref();
    let file = File::open(path)
        .await
        .map_err(|source| CaptureError::file(path, source))?;
    let mut reader = BufReader::new(file);

    let mut position = 0u64;
    let mut line = String::new();
    loop {
        line.clear();
        let read = reader
            .read_line(&mut line)
            .await
            .map_err(|source| CaptureError::file(path, source))?;
        if read == 0 {
            return Ok(position);
        }

        if let Ok(record) = parse_record(&line) {
            if record.timestamp >= timestamp {
                return Ok(position);
            }
        }
        position += read as u64;
    }
}

/// Send the records of `path` to `127.0.0.1:<port>`.
///
/// Packets are not sent at their exact recorded instants. They go out in
/// batches, and each batch starts one recorded batch span after the
/// previous one, leaving finer timing to the receiver's buffer. Returns the
/// number of datagrams sent.
pub async fn replay(
    path: impl AsRef<Path>,
    endpoint: StreamEndpoint,
    options: &ReplayOptions,
    mut cancel: Option<watch::Receiver<()>>,
) -> Result<u64, CaptureError> {
    let path = path.as_ref();
    let batch_size = options.batch_size.max(1);

    let socket = UdpSocket::bind(SocketAddr::from((Ipv4Addr::LOCALHOST, 0)))
        .await
        .map_err(CaptureError::Socket)?;
    socket.set_ttl(STREAM_TTL).map_err(CaptureError::Socket)?;
    let target = endpoint.socket_addr();

    let mut file = File::open(path)
        .await
        .map_err(|source| CaptureError::file(path, source))?;
    if let Some(begin) = options.begin.filter(|b| *b > 0.0) {
        let offset = find_timestamp(path, begin).await?;
        log::debug!("Seeking to byte {} for {:.3}s", offset, begin);
        file.seek(SeekFrom::Start(offset))
            .await
            .map_err(|source| CaptureError::file(path, source))?;
    }
    let mut reader = BufReader::new(file);

    log::info!("Replaying {} to {}", path.display(), target);

    let mut batch: Vec<Vec<u8>> = Vec::with_capacity(batch_size);
    let mut first_in_batch = 0.0f64;
    let mut next_play_at: Option<Instant> = None;
    let mut sent = 0u64;
    let mut line = String::new();

    loop {
        line.clear();
        let read = reader
            .read_line(&mut line)
            .await
            .map_err(|source| CaptureError::file(path, source))?;
        if read == 0 {
            break;
        }

        let record = match parse_record(&line) {
            Ok(record) => record,
            Err(e) => {
                log::warn!("Skipping record: {}", e);
                continue;
            }
        };

        if options.end.is_some_and(|end| record.timestamp > end) {
            break;
        }

        if batch.is_empty() {
            first_in_batch = record.timestamp;
        }
        batch.push(record.payload);
        if batch.len() < batch_size {
            continue;
        }

        let span = (record.timestamp - first_in_batch).max(0.0);
        if !wait_until(next_play_at, &mut cancel).await {
            return Ok(sent);
        }

        let played_at = Instant::now();
        sent += send_batch(&socket, target, &mut batch).await?;
        next_play_at = batch_deadline(played_at, span);
    }

    if !batch.is_empty() {
        if !wait_until(next_play_at, &mut cancel).await {
            return Ok(sent);
        }
        sent += send_batch(&socket, target, &mut batch).await?;
    }

    log::info!("Replayed {} datagrams", sent);
    Ok(sent)
}

/// When the next batch may start, or `None` when `span` is too large to
/// schedule and the next batch goes out at once
fn batch_deadline(played_at: Instant, span: f64) -> Option<Instant> {
    let deadline = Duration::try_from_secs_f64(span)
        .ok()
        .and_then(|span| played_at.checked_add(span));
    if deadline.is_none() {
        log::warn!("Batch span of {}s is out of range, not pacing", span);
    }
    deadline
}

/// Sleep until `deadline`. Returns false if cancelled first.
async fn wait_until(deadline: Option<Instant>, cancel: &mut Option<watch::Receiver<()>>) -> bool {
    let Some(deadline) = deadline else {
        return true;
    };
    tokio::select! {
        _ = tokio::time::sleep_until(deadline) => true,
        _ = cancellation(cancel) => false,
    }
}

async fn send_batch(
    socket: &UdpSocket,
    target: SocketAddr,
    batch: &mut Vec<Vec<u8>>,
) -> Result<u64, CaptureError> {
    let count = batch.len() as u64;
    for payload in batch.drain(..) {
        socket
            .send_to(&payload, target)
            .await
            .map_err(CaptureError::Socket)?;
    }
    Ok(count)
}
