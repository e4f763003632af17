//! The service model shared by the browser (discovered instances) and the
//! advertiser (locally registered instances).
use std::net::{Ipv4Addr, Ipv6Addr};
use std::time::{Duration, Instant};

use crate::constants::DEFAULT_TTL;
use crate::txt::Txt;

/// One DNS-SD service instance: `<name>.<service-type>.<domain>.`, with
/// whatever SRV/TXT/address data has been learned (browser) or set
/// (advertiser) so far.
#[derive(Debug, Clone)]
pub struct Service {
    pub name: String,
    pub service_type: String,
    pub domain: String,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub priority: u16,
    pub weight: u16,
    pub ipv4: Vec<Ipv4Addr>,
    pub ipv6: Vec<Ipv6Addr>,
    pub txt: Txt,
    pub ttl: u32,
    pub last_seen: Instant,
}

impl Service {
    pub fn new(name: impl Into<String>, service_type: impl Into<String>) -> Self {
        Service {
            name: name.into(),
            service_type: service_type.into(),
            domain: "local".to_string(),
            host: None,
            port: None,
            priority: 0,
            weight: 0,
            ipv4: Vec::new(),
            ipv6: Vec::new(),
            txt: Txt::new(),
            ttl: DEFAULT_TTL,
            last_seen: Instant::now(),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// `<name>.<service-type>.<domain>.`, this service's identity.
    pub fn full_name(&self) -> String {
        format!("{}.{}.{}.", self.name, self.service_type, self.domain)
    }

    /// `<service-type>.<domain>.`, the name a browser queries PTR records
    /// under and a responder groups registrations by.
    pub fn full_type(&self) -> String {
        format!("{}.{}.", self.service_type, self.domain)
    }

    pub fn is_resolved(&self) -> bool {
        self.host.is_some() && self.port.is_some()
    }

    pub fn has_addresses(&self) -> bool {
        !self.ipv4.is_empty() || !self.ipv6.is_empty()
    }

    pub fn touch(&mut self) {
        self.last_seen = Instant::now();
    }

    pub fn age(&self) -> Duration {
        self.last_seen.elapsed()
    }
}

impl PartialEq for Service {
    fn eq(&self, other: &Self) -> bool {
        self.full_name().eq_ignore_ascii_case(&other.full_name())
    }
}
impl Eq for Service {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_full_name_and_type() {
        let svc = Service::new("My Printer", "_ipp._tcp");
        assert_eq!(svc.full_name(), "My Printer._ipp._tcp.local.");
        assert_eq!(svc.full_type(), "_ipp._tcp.local.");
    }

    #[test]
    fn resolution_requires_host_and_port() {
        let mut svc = Service::new("svc", "_http._tcp");
        assert!(!svc.is_resolved());
        svc.host = Some("host.local".to_string());
        assert!(!svc.is_resolved());
        svc.port = Some(80);
        assert!(svc.is_resolved());
    }

    #[test]
    fn has_addresses_checks_both_families() {
        let mut svc = Service::new("svc", "_http._tcp");
        assert!(!svc.has_addresses());
        svc.ipv4.push(Ipv4Addr::new(1, 2, 3, 4));
        assert!(svc.has_addresses());
    }
}
