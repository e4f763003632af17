//! mDNS (RFC 6762) and DNS-SD (RFC 6763) service discovery and advertisement,
//! with the libp2p multi-valued TXT extension.
//!
//! [`browser::ServiceBrowser`] discovers instances of a service type;
//! [`advertiser::ServiceAdvertiser`] registers and serves local ones. Both
//! are actors generic over [`transport::Transport`], so the real
//! [`transport::UdpTransport`] can be swapped for
//! [`transport::MockTransport`] in tests.
#[macro_use]
pub mod macros;

pub mod wire;

pub mod error;
pub mod constants;
pub mod util;

pub mod name;
pub mod txt;
pub mod record;
pub mod message;

pub mod service;
pub mod config;
pub mod event;

pub mod transport;
pub mod browser;
pub mod advertiser;

pub use advertiser::ServiceAdvertiser;
pub use browser::ServiceBrowser;
pub use config::{AdvertiserConfig, BrowserConfig, TransportConfig};
pub use error::{DnsSdError, DnsSdResult};
pub use event::{AdvertiserEvent, BrowserEvent};
pub use message::Message;
pub use name::DnsName;
pub use service::Service;
pub use transport::{Transport, UdpTransport};
