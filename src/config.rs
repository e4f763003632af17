//! Plain configuration structs for the transport, browser, and advertiser,
//! mirroring the teacher CLI's `CliOptions` style: simple fields with a
//! sensible `Default`.
use std::time::Duration;

use crate::constants::{
    DEFAULT_ANNOUNCE_COUNT, DEFAULT_ANNOUNCE_INTERVAL_SECS, DEFAULT_QUERY_INTERVAL_SECS,
    DEFAULT_TTL,
};

/// Which address families and interface a transport should bind.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub use_ipv4: bool,
    pub use_ipv6: bool,
    /// Restrict to one interface by name (e.g. "eth0"); `None` joins on
    /// every usable interface `if-addrs` reports.
    pub interface_name: Option<String>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        TransportConfig {
            use_ipv4: true,
            use_ipv6: false,
            interface_name: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BrowserConfig {
    pub transport: TransportConfig,
    pub query_interval: Duration,
    /// Automatically send a QU resolve query the moment a PTR is seen.
    pub auto_resolve: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        BrowserConfig {
            transport: TransportConfig::default(),
            query_interval: Duration::from_secs(DEFAULT_QUERY_INTERVAL_SECS),
            auto_resolve: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AdvertiserConfig {
    pub transport: TransportConfig,
    pub ttl: u32,
    pub announcement_interval: Duration,
    pub announcement_count: u32,
    /// Overrides the machine hostname used for services that don't set
    /// their own `host`. `None` detects it from the OS at startup.
    pub host_name: Option<String>,
}

impl Default for AdvertiserConfig {
    fn default() -> Self {
        AdvertiserConfig {
            transport: TransportConfig::default(),
            ttl: DEFAULT_TTL,
            announcement_interval: Duration::from_secs(DEFAULT_ANNOUNCE_INTERVAL_SECS),
            announcement_count: DEFAULT_ANNOUNCE_COUNT,
            host_name: None,
        }
    }
}
