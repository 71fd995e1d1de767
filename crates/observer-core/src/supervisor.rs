//! Outer control loop: keep a station link's discover/poll cycle
//! running until told to stop, restarting after any failure.
//!
//! This is the system's sole fault-recovery authority. Every error a
//! [`StationLink`] reports is caught here, logged, and converted into a
//! cooldown plus a full restart; nothing propagates past this loop.
//! There are no socket-level retries: failure always escalates to a
//! cycle restart, a deliberate simplicity/robustness trade-off given
//! the station's propensity to drop and rediscover.

use crate::channel::ReadoutSender;
use crate::config::StationConfig;
use crate::error::{Error, Result};
use crate::link::{Poll, StationLink};
use std::net::SocketAddr;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

/// Capacity of the monitoring event channel
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Events emitted by the supervisor for monitoring
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupervisorEvent {
    /// Supervisor started
    Started,
    /// A station connected back after discovery
    LinkEstablished { peer: SocketAddr },
    /// The cycle failed and the link was torn down
    LinkLost { reason: String },
    /// Waiting out the cooldown before the next cycle
    Restarting { wait_secs: u64 },
    /// Supervisor stopped
    Stopped { reason: String },
}

/// Outer control loop around [`StationLink`]
///
/// Owns all socket state exclusively on its own task. The only shared
/// state with the consumer is the readout channel.
pub struct Supervisor {
    config: StationConfig,
    output: ReadoutSender,
    event_tx: mpsc::Sender<SupervisorEvent>,
}

impl Supervisor {
    /// Create a supervisor and the receiver for its monitoring events
    pub fn new(
        config: StationConfig,
        output: ReadoutSender,
    ) -> Result<(Self, mpsc::Receiver<SupervisorEvent>)> {
        config.validate()?;
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        Ok((
            Self {
                config,
                output,
                event_tx,
            },
            event_rx,
        ))
    }

    /// Run until SIGINT, restarting the station cycle after any failure
    pub async fn run(&self) -> Result<()> {
        self.run_internal(None).await
    }

    /// Run with a controlled shutdown signal.
    ///
    /// Used by tests and embedders that manage shutdown themselves;
    /// `run()` is the production entry point and listens for SIGINT.
    pub async fn run_with_shutdown(
        &self,
        shutdown_rx: Option<oneshot::Receiver<()>>,
    ) -> Result<()> {
        self.run_internal(shutdown_rx).await
    }

    async fn run_internal(&self, shutdown_rx: Option<oneshot::Receiver<()>>) -> Result<()> {
        self.emit(SupervisorEvent::Started);
        info!(
            port = self.config.port,
            poll_interval = self.config.poll_interval,
            timeout = self.config.timeout,
            "supervisor started"
        );

        // The supervise loop never returns on its own; the select
        // cancels it at the next await point once the signal fires.
        // Every blocking socket call inside is timeout-bounded, so the
        // worst-case shutdown latency is about one timeout period.
        if let Some(rx) = shutdown_rx {
            tokio::select! {
                _ = self.supervise() => {}
                _ = rx => {
                    info!("shutdown signal received");
                }
            }
        } else {
            tokio::select! {
                _ = self.supervise() => {}
                _ = tokio::signal::ctrl_c() => {
                    info!("shutdown signal received");
                }
            }
        }

        self.emit(SupervisorEvent::Stopped {
            reason: "shutdown signal".to_string(),
        });
        Ok(())
    }

    /// Restart loop: run one cycle, log its failure, cool down, repeat
    async fn supervise(&self) {
        loop {
            // a cycle only returns by failing
            if let Err(e) = self.cycle().await {
                warn!(error = %e, "station cycle failed");
                self.emit(SupervisorEvent::LinkLost {
                    reason: e.to_string(),
                });
            }
            // fixed cooldown, not a backoff
            self.emit(SupervisorEvent::Restarting {
                wait_secs: self.config.retry_wait,
            });
            tokio::time::sleep(self.config.retry_wait()).await;
        }
    }

    /// One full discover/accept/poll cycle.
    ///
    /// Returns only by failing; the link (listener and connection) is
    /// dropped, and with it closed, on every exit path.
    async fn cycle(&self) -> Result<()> {
        let link = StationLink::open(&self.config).await?;
        loop {
            link.broadcast_discovery().await?;
            let (mut conn, peer) = match link.accept_connection().await {
                Ok(accepted) => accepted,
                Err(Error::NoPeer) => {
                    debug!("no station answered, re-broadcasting");
                    continue;
                }
                Err(e) => return Err(e),
            };
            self.emit(SupervisorEvent::LinkEstablished { peer });

            loop {
                match link.poll_once(&mut conn).await? {
                    Poll::Frame(frame) => {
                        self.output.push(frame);
                        // steady-state cadence between successful polls
                        tokio::time::sleep(self.config.poll_interval()).await;
                    }
                    // no data; the receive timeout already paced us
                    Poll::Empty => {}
                }
            }
        }
    }

    fn emit(&self, event: SupervisorEvent) {
        // monitoring is best effort; a full channel drops the event
        if self.event_tx.try_send(event).is_err() {
            warn!("event channel full, dropping supervisor event");
        }
    }
}
