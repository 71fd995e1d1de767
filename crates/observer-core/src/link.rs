//! One discover/accept/poll cycle with the station.
//!
//! The station holds no fixed network identity: the driver broadcasts a
//! discovery datagram and the station connects back to the listening
//! port. A [`StationLink`] is created fresh for every such cycle and
//! owns exactly one listener and at most one accepted connection;
//! dropping it closes both on every exit path.

use crate::codec::{self, RawFrame, MAX_FRAME};
use crate::config::StationConfig;
use crate::error::{Error, Result};
use std::io;
use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpSocket, TcpStream, UdpSocket};
use tracing::{debug, info};

/// Outcome of one query/response exchange
#[derive(Debug)]
pub enum Poll {
    /// The station answered with a raw frame
    Frame(RawFrame),
    /// No answer within the timeout. The connection is still usable;
    /// keep polling on it.
    Empty,
}

/// Owns the listening socket and the discovery plumbing for one cycle
pub struct StationLink {
    listener: TcpListener,
    config: StationConfig,
}

impl StationLink {
    /// Bind the listening socket with address reuse enabled.
    ///
    /// Fails with [`Error::Bind`] when the address cannot be acquired;
    /// the half-built socket is discarded, not leaked, and the caller
    /// retries after its cooldown.
    pub async fn open(config: &StationConfig) -> Result<Self> {
        let addr = config.listen_addr();
        let socket = TcpSocket::new_v4().map_err(Error::Bind)?;
        socket.set_reuseaddr(true).map_err(Error::Bind)?;
        socket.bind(addr).map_err(Error::Bind)?;
        // one station at a time
        let listener = socket.listen(1).map_err(Error::Bind)?;
        debug!(%addr, "listening for station connection");
        Ok(Self {
            listener,
            config: config.clone(),
        })
    }

    /// Address the listener actually bound to
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Send the discovery broadcast from a short-lived UDP socket.
    ///
    /// The socket is never reused and never kept; it closes as soon as
    /// the datagram is out.
    pub async fn broadcast_discovery(&self) -> Result<()> {
        let socket = UdpSocket::bind(("0.0.0.0", 0)).await.map_err(Error::Link)?;
        socket.set_broadcast(true).map_err(Error::Link)?;
        let dest = self.config.discovery_dest();
        socket
            .send_to(codec::encode_discovery(), dest)
            .await
            .map_err(Error::Link)?;
        debug!(%dest, "sent discovery broadcast");
        Ok(())
    }

    /// Wait for the station to connect back, bounded by the timeout.
    ///
    /// Timeout means no station answered ([`Error::NoPeer`]); the
    /// caller should re-broadcast and listen again. Any other socket
    /// failure is [`Error::Link`] and tears the cycle down.
    pub async fn accept_connection(&self) -> Result<(TcpStream, SocketAddr)> {
        match tokio::time::timeout(self.config.timeout(), self.listener.accept()).await {
            Ok(Ok((conn, peer))) => {
                info!(%peer, "station connected");
                Ok((conn, peer))
            }
            Ok(Err(e)) => Err(Error::Link(e)),
            Err(_) => Err(Error::NoPeer),
        }
    }

    /// One query/response exchange on the accepted connection.
    ///
    /// Both the send and the receive are bounded by the configured
    /// timeout; nothing here blocks indefinitely. A receive timeout is
    /// an explicit no-data outcome, not an error; the connection stays
    /// usable. A send timeout, EOF, or any I/O failure is
    /// [`Error::Link`]: the connection must be discarded and discovery
    /// restarted.
    pub async fn poll_once(&self, conn: &mut TcpStream) -> Result<Poll> {
        // a station that will not accept a 40-byte query within the
        // timeout is gone, even if the connection still looks open
        match tokio::time::timeout(self.config.timeout(), conn.write_all(codec::encode_query()))
            .await
        {
            Ok(result) => result.map_err(Error::Link)?,
            Err(_) => {
                return Err(Error::Link(io::Error::new(
                    io::ErrorKind::TimedOut,
                    "station stopped accepting queries",
                )));
            }
        }
        let mut buf = vec![0u8; MAX_FRAME];
        match tokio::time::timeout(self.config.timeout(), conn.read(&mut buf)).await {
            Ok(Ok(0)) => Err(Error::Link(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "station closed the connection",
            ))),
            Ok(Ok(n)) => {
                buf.truncate(n);
                debug!(len = n, "received frame");
                Ok(Poll::Frame(buf))
            }
            Ok(Err(e)) => Err(Error::Link(e)),
            Err(_) => {
                debug!("timeout while querying/receiving");
                Ok(Poll::Empty)
            }
        }
    }
}

// Cleanup is unconditional: the listener (and any accepted connection,
// owned by the caller) closes on drop, on every exit path including
// cancellation. No socket handle outlives its owning cycle.
