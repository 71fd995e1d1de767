//! Consumer-facing driver: owns the supervisor task and turns raw
//! frames into decoded, sensor-mapped, timestamped records.

use crate::channel::{readout_channel, ReadoutReceiver, Readout};
use crate::codec;
use crate::config::StationConfig;
use crate::error::Result;
use crate::supervisor::{Supervisor, SupervisorEvent};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// How long one consumer wait on the readout queue lasts before it is
/// logged as idle and retried.
///
/// Deliberately fixed rather than a config knob: it only paces the
/// idle log line while the station is offline. Data timing is set by
/// `poll_interval`; this wait never delays a queued frame.
const CONSUMER_WAIT: Duration = Duration::from_secs(10);

/// One decoded record, stamped with the time of emission.
///
/// Keys are the configured sensor-map output keys; fields the station
/// did not report are absent, never zero.
#[derive(Debug, Clone, Serialize)]
pub struct LoopRecord {
    #[serde(rename = "dateTime")]
    pub date_time: i64,
    #[serde(flatten)]
    pub values: BTreeMap<String, f64>,
}

/// Driver for an Observer station.
///
/// Spawns the supervisor on its own task; the driver side only drains
/// the readout channel and decodes. The record sequence is lazy,
/// infinite, and non-restartable: it ends only when [`stop`] shuts the
/// supervisor down.
///
/// [`stop`]: ObserverDriver::stop
pub struct ObserverDriver {
    sensor_map: BTreeMap<String, String>,
    reader: ReadoutReceiver,
    events: mpsc::Receiver<SupervisorEvent>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<Result<()>>>,
}

impl ObserverDriver {
    /// Validate the configuration and start the network task
    pub fn start(config: StationConfig) -> Result<Self> {
        config.validate()?;
        info!(model = %config.model, port = config.port, "starting station driver");
        debug!(sensor_map = ?config.sensor_map, "sensor map");

        let sensor_map = config.sensor_map.clone().into_iter().collect();
        let (frames_tx, reader) = readout_channel();
        let (supervisor, events) = Supervisor::new(config, frames_tx)?;
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(async move {
            supervisor.run_with_shutdown(Some(shutdown_rx)).await
        });

        Ok(Self {
            sensor_map,
            reader,
            events,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        })
    }

    /// Next decoded record, waiting as long as it takes.
    ///
    /// Repeated queue emptiness (station offline, being rediscovered)
    /// is a normal idle condition and only logged. Returns `None` once
    /// the driver has been stopped; nothing else ends the sequence.
    pub async fn next_record(&mut self) -> Option<LoopRecord> {
        loop {
            match self.reader.pop(CONSUMER_WAIT).await {
                Readout::Frame(frame) => {
                    debug!(raw = %codec::fmt_bytes(&frame), "raw data");
                    let decoded = codec::decode(&frame);
                    debug!(?decoded, "decoded packet");
                    return Some(self.map_record(decoded));
                }
                Readout::Empty => {
                    debug!("empty queue");
                }
                Readout::Closed => return None,
            }
        }
    }

    /// Monitoring events from the supervisor (link established/lost,
    /// restarts). Draining them is optional.
    pub fn events(&mut self) -> &mut mpsc::Receiver<SupervisorEvent> {
        &mut self.events
    }

    /// Stop the network task and wait for it to exit
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
        info!("station driver stopped");
    }

    fn map_record(&self, decoded: codec::DecodedRecord) -> LoopRecord {
        let mut values = BTreeMap::new();
        for (key, field) in &self.sensor_map {
            if let Some(value) = decoded.get(field.as_str()) {
                values.insert(key.clone(), *value);
            }
        }
        // round to the nearest second, matching the wall-clock stamp
        // consumers compare against
        let date_time = (chrono::Utc::now().timestamp_millis() + 500) / 1000;
        LoopRecord { date_time, values }
    }
}
