//! Test doubles and common utilities for the station contract tests.
//!
//! The central double is a scripted fake station: it waits on a
//! loopback discovery port for the broadcast, connects back to the
//! driver's listen port, answers a fixed list of queries, then
//! silently drops the connection, one session per rediscovery.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};
use tokio::task::JoinHandle;

use observer_core::StationConfig;

/// Config pointed at loopback test ports, with short timings
pub fn test_config(listen_port: u16, discovery_port: u16) -> StationConfig {
    let mut config = StationConfig::new();
    config.host = "127.0.0.1".to_string();
    config.port = listen_port;
    config.discovery_addr = "127.0.0.1".to_string();
    config.discovery_port = discovery_port;
    config.poll_interval = 1;
    config.timeout = 2;
    config.retry_wait = 1;
    config
}

/// Build a response frame with known values at the confirmed offsets
/// (temperature_out: f32 LE at 54, wind_dir: u16 LE at 38).
pub fn make_frame(temperature_out: f32, wind_dir: u16) -> Vec<u8> {
    let mut buf = vec![0u8; 102];
    buf[16..25].copy_from_slice(b"NOWRECORD");
    buf[38..40].copy_from_slice(&wind_dir.to_le_bytes());
    buf[54..58].copy_from_slice(&temperature_out.to_le_bytes());
    buf
}

/// Connect back to the driver, retrying while its listener reopens
async fn connect_back(listen_port: u16) -> TcpStream {
    for _ in 0..100 {
        match TcpStream::connect(("127.0.0.1", listen_port)).await {
            Ok(conn) => return conn,
            Err(_) => tokio::time::sleep(Duration::from_millis(100)).await,
        }
    }
    panic!("fake station could not connect back to port {listen_port}");
}

/// Spawn a scripted fake station.
///
/// Each entry in `sessions` is the list of frames answered on one
/// accepted connection; after the last frame the connection is
/// silently dropped, forcing the driver back to discovery. Returns the
/// task handle and a counter of discovery broadcasts received.
pub fn spawn_station(
    discovery_port: u16,
    listen_port: u16,
    sessions: Vec<Vec<Vec<u8>>>,
) -> (JoinHandle<()>, Arc<AtomicUsize>) {
    let broadcasts = Arc::new(AtomicUsize::new(0));
    let counter = broadcasts.clone();

    let handle = tokio::spawn(async move {
        let socket = UdpSocket::bind(("127.0.0.1", discovery_port))
            .await
            .expect("bind fake discovery socket");
        let mut buf = [0u8; 64];

        for session in sessions {
            let (n, _from) = socket.recv_from(&mut buf).await.expect("recv broadcast");
            assert!(
                buf[..n].starts_with(b"PC2000"),
                "discovery broadcast must carry the protocol magic"
            );
            counter.fetch_add(1, Ordering::SeqCst);

            let mut conn = connect_back(listen_port).await;
            for answer in session {
                let mut query = [0u8; 64];
                let n = conn.read(&mut query).await.expect("read query");
                if n == 0 {
                    // driver went away mid-session
                    break;
                }
                assert!(query[..n].starts_with(b"PC2000"));
                conn.write_all(&answer).await.expect("write answer");
            }
            // dropping conn here is the silent disconnect
        }
    });

    (handle, broadcasts)
}
