// # observer-core
//
// Core library for collecting data from an Observer weather station by
// polling over the network.
//
// The station does not hold a fixed network identity. The driver
// listens on a port, broadcasts a UDP discovery datagram, and the
// station responds by connecting back to that port. The driver then
// polls the station over the connection; if anything fails, the whole
// process begins again.
//
// ## Architecture
//
// ```text
// ┌────────────┐  discover/accept/poll  ┌─────────────┐
// │ Supervisor │ ─────────────────────▶ │ StationLink │
// └────────────┘                        └─────────────┘
//       │ raw frames                          │ bytes
//       ▼                                     ▼
// ┌────────────────┐   decode + map   ┌────────────┐
// │ ReadoutChannel │ ───────────────▶ │ FrameCodec │
// └────────────────┘  (ObserverDriver)└────────────┘
// ```
//
// - **codec**: the only frame-byte parser; search/query constants
// - **link**: one discover→accept→poll cycle, timeout-bounded
// - **supervisor**: restart-forever control loop, sole fault authority
// - **channel**: SPSC hand-off from the network task to the consumer
// - **driver**: consumer-facing record sequence and task lifecycle

pub mod channel;
pub mod codec;
pub mod config;
pub mod driver;
pub mod error;
pub mod link;
pub mod supervisor;

pub use channel::{readout_channel, Readout, ReadoutReceiver, ReadoutSender};
pub use codec::{decode, DecodedRecord, RawFrame};
pub use config::StationConfig;
pub use driver::{LoopRecord, ObserverDriver};
pub use error::{Error, Result};
pub use link::{Poll, StationLink};
pub use supervisor::{Supervisor, SupervisorEvent};
