//! Protocol constants: multicast endpoints, default TTLs, and the
//! well-known DNS-SD meta-query name.

/// IPv4 mDNS multicast group (RFC 6762 §3).
pub const MDNS_MULTICAST_IPV4: std::net::Ipv4Addr = std::net::Ipv4Addr::new(224, 0, 0, 251);
/// IPv6 mDNS multicast group (RFC 6762 §3).
pub const MDNS_MULTICAST_IPV6: std::net::Ipv6Addr =
    std::net::Ipv6Addr::new(0xff02, 0, 0, 0, 0, 0, 0, 0xfb);
/// The UDP port every mDNS responder listens on.
pub const MDNS_PORT: u16 = 5353;

/// Default TTL applied to records when a caller doesn't specify one.
pub const DEFAULT_TTL: u32 = 120;
/// TTL used on goodbye records, per RFC 6762 §10.1.
pub const GOODBYE_TTL: u32 = 0;

/// DNS-SD service-enumeration meta-query name (RFC 6763 §9).
pub const SERVICES_META_QUERY: &str = "_services._dns-sd._udp.local.";
/// libp2p's reserved service type, carried for the multi-valued TXT
/// extension this library also implements.
pub const LIBP2P_SERVICE_TYPE: &str = "_p2p._udp.local.";

/// Upper bound on a message this library will attempt to send over mDNS.
/// Larger payloads are the caller's problem (fragmentation is a non-goal).
pub const MAX_MDNS_MESSAGE_SIZE: usize = 9000;

/// Default interval between a browser's periodic re-queries.
pub const DEFAULT_QUERY_INTERVAL_SECS: u64 = 120;
/// Default interval between an advertiser's periodic re-announcements.
pub const DEFAULT_ANNOUNCE_INTERVAL_SECS: u64 = 20;
/// Number of times a freshly registered service is announced up front.
pub const DEFAULT_ANNOUNCE_COUNT: u32 = 3;
