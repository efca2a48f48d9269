use std::fmt;
use std::time::Duration;

use serde::Serialize;

/// Snapshot of pool limits and usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    /// Maximum number of open connections.
    pub max_open: u32,
    /// Connections the pool keeps open while idle.
    pub min_idle: Option<u32>,
    /// Maximum age of a pooled connection.
    pub max_lifetime: Option<Duration>,
    /// Connections currently open.
    pub connections: u32,
    /// Open connections not checked out.
    pub idle_connections: u32,
}

impl fmt::Display for PoolStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lifetime = self
            .max_lifetime
            .map_or_else(|| "unlimited".to_string(), |d| humantime::format_duration(d).to_string());
        let idle = self
            .min_idle
            .map_or_else(|| "0".to_string(), |n| n.to_string());
        write!(
            f,
            "Settings: ConnMaxLifetime: {lifetime}, MaxIdleConns: {idle}, MaxOpenConns: {}, OpenConns: {}, IdleConns: {}",
            self.max_open, self.connections, self.idle_connections
        )
    }
}
