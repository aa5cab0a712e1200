//! Capture file recording and replay over loopback UDP

mod common;

use media_relay::{find_timestamp, replay, Dumper, Record, ReplayOptions, StreamEndpoint};
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::sync::watch;

fn record_line(timestamp: f64, payload: &[u8]) -> String {
    Record {
        timestamp,
        payload: payload.to_vec(),
    }
    .to_line()
}

async fn receiver() -> (UdpSocket, StreamEndpoint) {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let port = socket.local_addr().unwrap().port();
    (socket, StreamEndpoint::new(port.into()).unwrap())
}

async fn recv_payloads(socket: &UdpSocket, count: usize) -> Vec<Vec<u8>> {
    let mut buf = vec![0u8; 2048];
    let mut payloads = Vec::new();
    for _ in 0..count {
        let len = tokio::time::timeout(Duration::from_secs(2), socket.recv(&mut buf))
            .await
            .expect("datagram should arrive")
            .unwrap();
        payloads.push(buf[..len].to_vec());
    }
    payloads
}

#[tokio::test]
async fn test_dump_then_replay_preserves_datagrams() {
    let dir = tempfile::tempdir().unwrap();
    let capture = dir.path().join("capture.txt");

    let port = common::free_udp_port();
    let dumper = Dumper::bind(StreamEndpoint::new(port.into()).unwrap())
        .await
        .unwrap();
    let target = dumper.local_addr().unwrap();

    let (stop_tx, stop_rx) = watch::channel(());
    let path = capture.clone();
    let dump_task = tokio::spawn(async move { dumper.run(path, Some(stop_rx)).await });

    let sent: Vec<Vec<u8>> = vec![b"first".to_vec(), vec![0, 1, 2, 255], b"third".to_vec()];
    let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    for payload in &sent {
        client.send_to(payload, target).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    tokio::time::sleep(Duration::from_millis(100)).await;
    stop_tx.send(()).unwrap();

    let written = dump_task.await.unwrap().unwrap();
    assert_eq!(written, 3);

    let content = std::fs::read_to_string(&capture).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("0.0000000000\t"));

    let (socket, endpoint) = receiver().await;
    let replayed = replay(&capture, endpoint, &ReplayOptions::default(), None)
        .await
        .unwrap();
    assert_eq!(replayed, 3);
    assert_eq!(recv_payloads(&socket, 3).await, sent);
}

#[tokio::test]
async fn test_replay_window_and_malformed_records() {
    let dir = tempfile::tempdir().unwrap();
    let capture = dir.path().join("capture.txt");

    let mut content = String::new();
    content.push_str(&record_line(0.0, b"a"));
    content.push_str(&record_line(0.5, b"b"));
    content.push_str("garbage without a tab\n");
    content.push_str(&record_line(1.0, b"c"));
    content.push_str("1.2\tnot*base64\n");
    content.push_str(&record_line(1.5, b"d"));
    content.push_str(&record_line(2.0, b"e"));
    std::fs::write(&capture, content).unwrap();

    let (socket, endpoint) = receiver().await;
    let options = ReplayOptions {
        begin: Some(0.9),
        end: Some(1.6),
        batch_size: 1,
    };
    let replayed = replay(&capture, endpoint, &options, None).await.unwrap();

    assert_eq!(replayed, 2);
    assert_eq!(recv_payloads(&socket, 2).await, vec![b"c".to_vec(), b"d".to_vec()]);
}

#[tokio::test]
async fn test_find_timestamp_offsets() {
    let dir = tempfile::tempdir().unwrap();
    let capture = dir.path().join("capture.txt");

    let lines = [
        record_line(0.0, b"a"),
        "broken line\n".to_string(),
        record_line(0.75, b"b"),
        record_line(1.5, b"c"),
    ];
    std::fs::write(&capture, lines.concat()).unwrap();
    let offset_of = |index: usize| lines[..index].iter().map(|l| l.len() as u64).sum::<u64>();

    assert_eq!(find_timestamp(&capture, 0.0).await.unwrap(), 0);
    assert_eq!(find_timestamp(&capture, 0.5).await.unwrap(), offset_of(2));
    assert_eq!(find_timestamp(&capture, 0.75).await.unwrap(), offset_of(2));
    assert_eq!(find_timestamp(&capture, 1.0).await.unwrap(), offset_of(3));
    assert_eq!(find_timestamp(&capture, 60.0).await.unwrap(), offset_of(4));
}

#[tokio::test]
async fn test_replay_paces_batches() {
    let dir = tempfile::tempdir().unwrap();
    let capture = dir.path().join("capture.txt");

    // Batches of two: [0.0, 0.1] then [0.4, 0.6], then the 0.9 remainder.
    let content: String = [(0.0, b"1"), (0.1, b"2"), (0.4, b"3"), (0.6, b"4"), (0.9, b"5")]
        .iter()
        .map(|(t, p)| record_line(*t, *p))
        .collect();
    std::fs::write(&capture, content).unwrap();

    let (socket, endpoint) = receiver().await;
    let options = ReplayOptions {
        batch_size: 2,
        ..Default::default()
    };

    let started = Instant::now();
    let replayed = replay(&capture, endpoint, &options, None).await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(replayed, 5);
    // 0.1s after the first batch plus 0.2s after the second
    assert!(elapsed >= Duration::from_millis(280), "replay took {:?}", elapsed);
    assert_eq!(recv_payloads(&socket, 5).await.len(), 5);
}

#[tokio::test]
async fn test_replay_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let (_socket, endpoint) = receiver().await;

    let result = replay(
        dir.path().join("missing.txt"),
        endpoint,
        &ReplayOptions::default(),
        None,
    )
    .await;
    assert!(matches!(result, Err(media_relay::CaptureError::File { .. })));
}

#[tokio::test]
async fn test_replay_out_of_range_span_sends_without_pacing() {
    let dir = tempfile::tempdir().unwrap();
    let capture = dir.path().join("capture.txt");
    std::fs::write(&capture, "0.0\tAA==\n1e19\tAQ==\n0.0\tAg==\n").unwrap();

    let (socket, endpoint) = receiver().await;
    let options = ReplayOptions {
        batch_size: 2,
        ..Default::default()
    };

    let replayed = tokio::time::timeout(
        Duration::from_secs(5),
        replay(&capture, endpoint, &options, None),
    )
    .await
    .expect("replay should not wait on an unschedulable span")
    .unwrap();

    assert_eq!(replayed, 3);
    assert_eq!(
        recv_payloads(&socket, 3).await,
        vec![vec![0u8], vec![1u8], vec![2u8]]
    );
}
