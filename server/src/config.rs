//! Server configuration and startup validation.

use crate::error::ServerError;
use crate::world::WorldSettings;
use shared::framing::DEFAULT_REASSEMBLY_CAPACITY;
use shared::{DEFAULT_FPS, DEFAULT_MAX_CLIENTS, DEFAULT_PORT, MAX_FPS, MAX_PORT, MIN_PORT};
use std::ops::RangeInclusive;
use std::time::Duration;

/// Runtime settings for one server process.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub host: String,
    /// Listening port; must lie inside `allowed_ports`
    pub port: u16,
    /// Operator-configured range the port is validated against
    pub allowed_ports: RangeInclusive<u16>,
    /// Simulation ticks (and snapshot broadcasts) per second
    pub tick_rate: u32,
    /// Maximum concurrent connections before new ones are turned away
    pub max_clients: usize,
    /// Per-session inbound reassembly limit in bytes
    pub reassembly_capacity: usize,
    /// Frames queued per session before broadcasts to it are dropped
    pub outbound_queue: usize,
    /// World created when a player joins before any `NEW_GAME`
    pub default_world: WorldSettings,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            allowed_ports: MIN_PORT..=MAX_PORT,
            tick_rate: DEFAULT_FPS,
            max_clients: DEFAULT_MAX_CLIENTS,
            reassembly_capacity: DEFAULT_REASSEMBLY_CAPACITY,
            outbound_queue: 16,
            default_world: WorldSettings::default(),
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), ServerError> {
        if !self.allowed_ports.contains(&self.port) {
            return Err(ServerError::PortOutOfRange {
                port: self.port,
                min: *self.allowed_ports.start(),
                max: *self.allowed_ports.end(),
            });
        }
        if self.tick_rate == 0 || self.tick_rate > MAX_FPS {
            return Err(ServerError::InvalidConfig(format!(
                "tick rate {} must be between 1 and {}",
                self.tick_rate, MAX_FPS
            )));
        }
        if self.max_clients == 0 {
            return Err(ServerError::InvalidConfig(
                "max_clients must be at least 1".to_string(),
            ));
        }
        if self.outbound_queue == 0 {
            return Err(ServerError::InvalidConfig(
                "outbound_queue must be at least 1".to_string(),
            ));
        }
        if self.reassembly_capacity < 64 {
            return Err(ServerError::InvalidConfig(format!(
                "reassembly capacity {} is too small",
                self.reassembly_capacity
            )));
        }
        Ok(())
    }

    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate.max(1) as f64)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
