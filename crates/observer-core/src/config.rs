//! Configuration types for the station polling engine.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Station configuration
///
/// Supplied by an external loader (environment variables, CLI flags).
/// The core never parses configuration sources itself; it only
/// validates the assembled struct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationConfig {
    /// IP address of the interface on which to listen.
    /// Empty string means any available interface.
    #[serde(default)]
    pub host: String,

    /// Port on which the driver listens for the station to connect back
    #[serde(default = "default_port")]
    pub port: u16,

    /// How often to poll the station, in seconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,

    /// Socket timeout in seconds, bounds every blocking network call
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Accepted but currently inert: reconnection is unconditional,
    /// not bounded by a retry count. Kept for config compatibility.
    #[serde(default = "default_max_tries")]
    pub max_tries: u32,

    /// Cooldown between full discover/poll cycles, in seconds
    #[serde(default = "default_retry_wait")]
    pub retry_wait: u64,

    /// Port the discovery broadcast is sent to
    #[serde(default = "default_discovery_port")]
    pub discovery_port: u16,

    /// Address the discovery broadcast is sent to
    #[serde(default = "default_discovery_addr")]
    pub discovery_addr: String,

    /// Maps an output key to the decoded field name it is filled from
    #[serde(default = "default_sensor_map")]
    pub sensor_map: HashMap<String, String>,

    /// Free-text hardware label
    #[serde(default = "default_model")]
    pub model: String,
}

impl StationConfig {
    /// Create a configuration with all defaults
    pub fn new() -> Self {
        Self {
            host: String::new(),
            port: default_port(),
            poll_interval: default_poll_interval(),
            timeout: default_timeout(),
            max_tries: default_max_tries(),
            retry_wait: default_retry_wait(),
            discovery_port: default_discovery_port(),
            discovery_addr: default_discovery_addr(),
            sensor_map: default_sensor_map(),
            model: default_model(),
        }
    }

    /// Validate the configuration
    ///
    /// Malformed configuration is the one error class expected to fail
    /// fast at startup; it cannot be recovered by retrying.
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.port == 0 {
            return Err(crate::Error::config("listen port must be non-zero"));
        }
        if self.poll_interval == 0 {
            return Err(crate::Error::config("poll_interval must be > 0"));
        }
        if self.timeout == 0 {
            return Err(crate::Error::config("timeout must be > 0"));
        }
        if !self.host.is_empty() && self.host.parse::<Ipv4Addr>().is_err() {
            return Err(crate::Error::config(format!(
                "host must be an IPv4 interface address, got '{}'",
                self.host
            )));
        }
        if self.discovery_addr.parse::<Ipv4Addr>().is_err() {
            return Err(crate::Error::config(format!(
                "discovery_addr must be an IPv4 address, got '{}'",
                self.discovery_addr
            )));
        }
        Ok(())
    }

    /// Local address the listener binds to
    pub fn listen_addr(&self) -> SocketAddr {
        let ip = self
            .host
            .parse::<Ipv4Addr>()
            .unwrap_or(Ipv4Addr::UNSPECIFIED);
        SocketAddr::new(IpAddr::V4(ip), self.port)
    }

    /// Destination of the discovery broadcast
    pub fn discovery_dest(&self) -> SocketAddr {
        let ip = self
            .discovery_addr
            .parse::<Ipv4Addr>()
            .unwrap_or(Ipv4Addr::BROADCAST);
        SocketAddr::new(IpAddr::V4(ip), self.discovery_port)
    }

    /// Socket timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// Steady-state poll cadence as a Duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval)
    }

    /// Cooldown between cycles as a Duration
    pub fn retry_wait(&self) -> Duration {
        Duration::from_secs(self.retry_wait)
    }
}

impl Default for StationConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn default_port() -> u16 {
    6500
}

fn default_poll_interval() -> u64 {
    10
}

fn default_timeout() -> u64 {
    15
}

fn default_max_tries() -> u32 {
    3
}

fn default_retry_wait() -> u64 {
    5
}

fn default_discovery_port() -> u16 {
    6000
}

fn default_discovery_addr() -> String {
    "255.255.255.255".to_string()
}

fn default_model() -> String {
    "WS1001".to_string()
}

/// Default mapping from output keys to decoded field names
pub fn default_sensor_map() -> HashMap<String, String> {
    [
        ("outTemp", "temperature_out"),
        ("inTemp", "temperature_in"),
        ("outHumidity", "humidity_out"),
        ("pressure", "pressure"),
        ("windSpeed", "wind_speed"),
        ("windDir", "wind_dir"),
        ("windGust", "gust_speed"),
        ("windGustDir", "gust_dir"),
        ("rain", "rain_delta"),
        ("radiation", "solar_radiation"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}
