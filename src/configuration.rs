//! Config for the server behaviors
//!
//! Configuration can be created programmatically using [`Configuration::new()`] or by reading
//! environment variables using [`Configuration::from_env()`].
//!
//! # Environment Variables
//!
//! All values are optional. Invalid values are ignored and the default is used instead.
//!
//! - `BOXES_ADDRESS` — IP address to listen on (default: `127.0.0.1`)
//! - `BOXES_PORT` — Port to listen on (default: `8080`)
//! - `BOXES_AGENT` — Built-in agent, `random` or `first-free` (default: `random`)
//! - `BOXES_SEED` — Seed for the random agent (default: none, seeded from the OS)
//! - `BOXES_LOG_LEVEL` — `error`, `warn`, `info`, `debug` or `trace` (default: `info`)
//! - `BOXES_LOG` — Set to `"true"` to log to a file instead of stdout (default: `false`)
//! - `BOXES_EVICT_ENDED` — Set to `"true"` to forget games once they ended (default: `false`)

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;

use tracing::Level;

use crate::agent::AgentKind;

/// Configuration for server behaviors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Configuration {
    pub(crate) address: IpAddr,
    pub(crate) port: u16,
    pub(crate) agent: AgentKind,
    pub(crate) seed: Option<u64>,
    pub(crate) log_level: Level,
    pub(crate) log_to_file: bool,
    pub(crate) evict_ended: bool,
}

impl Configuration {
    /// Create a new configuration with default parameters.
    ///
    /// By default:
    /// - The server listens on `127.0.0.1:8080`.
    /// - New games are played by the random agent, seeded from the OS.
    /// - Logs at `INFO` level go to stdout.
    /// - Ended games stay in memory.
    pub fn new() -> Self {
        Self {
            address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 8080,
            agent: AgentKind::Random,
            seed: None,
            log_level: Level::INFO,
            log_to_file: false,
            evict_ended: false,
        }
    }

    /// Create configuration from environment variables.
    ///
    /// See module documentation for the recognized variables.
    pub fn from_env() -> Self {
        fn get_env<T: FromStr>(var: &str) -> Option<T> {
            std::env::var(var).ok().and_then(|val| val.trim().parse().ok())
        }

        fn get_env_flag(var: &str, default: bool) -> bool {
            match std::env::var(var) {
                Ok(val) => val.eq_ignore_ascii_case("true"),
                Err(_) => default,
            }
        }

        let default = Self::new();
        Self {
            address: get_env("BOXES_ADDRESS").unwrap_or(default.address),
            port: get_env("BOXES_PORT").unwrap_or(default.port),
            agent: get_env("BOXES_AGENT").unwrap_or(default.agent),
            seed: get_env("BOXES_SEED").or(default.seed),
            log_level: get_env("BOXES_LOG_LEVEL").unwrap_or(default.log_level),
            log_to_file: get_env_flag("BOXES_LOG", default.log_to_file),
            evict_ended: get_env_flag("BOXES_EVICT_ENDED", default.evict_ended),
        }
    }

    /// Address to listen on.
    pub fn with_address(mut self, value: IpAddr) -> Self {
        self.address = value;
        self
    }

    /// Port to listen on. `0` lets the OS pick one.
    pub fn with_port(mut self, value: u16) -> Self {
        self.port = value;
        self
    }

    /// Built-in agent used for every new game.
    pub fn with_agent(mut self, value: AgentKind) -> Self {
        self.agent = value;
        self
    }

    /// Make the random agent reproducible.
    pub fn with_seed(mut self, value: Option<u64>) -> Self {
        self.seed = value;
        self
    }

    /// Most verbose level that gets logged.
    pub fn with_log_level(mut self, value: Level) -> Self {
        self.log_level = value;
        self
    }

    /// Enable or disable logging to file.
    pub fn with_log_to_file(mut self, value: bool) -> Self {
        self.log_to_file = value;
        self
    }

    /// Enable or disable eviction of ended games.
    pub fn with_evict_ended(mut self, value: bool) -> Self {
        self.evict_ended = value;
        self
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.address, self.port)
    }

    pub fn agent(&self) -> AgentKind {
        self.agent
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn log_level(&self) -> Level {
        self.log_level
    }

    pub fn log_to_file(&self) -> bool {
        self.log_to_file
    }

    pub fn evict_ended(&self) -> bool {
        self.evict_ended
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self::new()
    }
}
