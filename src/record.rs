//! Questions and resource records: the enumerations for type/class, the
//! tagged `RData` variant, and their wire codecs.
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::convert::TryFrom;
use std::io::Cursor;
use std::net::{Ipv4Addr, Ipv6Addr};

use mdns_sd_derive::DnsEnum;

use crate::derive_enum;
use crate::error::{DnsSdError, DnsSdResult};
use crate::name::DnsName;
use crate::txt::Txt;
use crate::wire::{read_character_string, write_character_string, ToFromNetworkOrder, WireWriter};

/// High bit of the 16-bit class field on a question: "QU", requesting a
/// unicast response (RFC 6762 §5.4).
const QU_BIT: u16 = 0x8000;
/// High bit of the 16-bit class field on an answer: cache-flush (RFC 6762 §10.2).
const CACHE_FLUSH_BIT: u16 = 0x8000;
const CLASS_MASK: u16 = 0x7FFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq, DnsEnum)]
pub enum RRType {
    A = 1,
    NS = 2,
    CNAME = 5,
    SOA = 6,
    PTR = 12,
    HINFO = 13,
    MX = 15,
    TXT = 16,
    AAAA = 28,
    SRV = 33,
    NSEC = 47,
    ANY = 255,
}
derive_enum!(RRType, u16);

#[derive(Debug, Clone, Copy, PartialEq, Eq, DnsEnum)]
pub enum RClass {
    IN = 1,
    ANY = 255,
}
derive_enum!(RClass, u16);

/// A DNS question: what's being asked about, and whether mDNS should answer
/// it unicast.
#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    pub name: DnsName,
    pub qtype: RRType,
    pub class: RClass,
    pub unicast_response: bool,
}

impl Question {
    pub fn new(name: DnsName, qtype: RRType) -> Self {
        Question {
            name,
            qtype,
            class: RClass::IN,
            unicast_response: false,
        }
    }

    pub fn qu(mut self, unicast_response: bool) -> Self {
        self.unicast_response = unicast_response;
        self
    }
}

impl<'a> ToFromNetworkOrder<'a> for Question {
    fn to_network_bytes(&self, buffer: &mut WireWriter) -> DnsSdResult<usize> {
        let start = buffer.len();
        self.name.to_network_bytes(buffer)?;
        self.qtype.to_network_bytes(buffer)?;

        let mut class_value = self.class as u16;
        if self.unicast_response {
            class_value |= QU_BIT;
        }
        buffer.write_u16::<BigEndian>(class_value)?;
        Ok(buffer.len() - start)
    }

    fn from_network_bytes(&mut self, buffer: &mut Cursor<&'a [u8]>) -> DnsSdResult<()> {
        self.name.from_network_bytes(buffer)?;

        // Decoded by hand rather than through RRType's ToFromNetworkOrder
        // impl: an unrecognized question type is a distinct, switchable
        // error kind here, not a generic invalid-message failure.
        let raw_type = buffer.read_u16::<BigEndian>()?;
        self.qtype = RRType::try_from(raw_type)
            .map_err(|_| DnsSdError::UnsupportedRecordType(raw_type))?;

        let raw_class = buffer.read_u16::<BigEndian>()?;
        self.unicast_response = raw_class & QU_BIT != 0;
        self.class = RClass::try_from(raw_class & CLASS_MASK)
            .map_err(DnsSdError::invalid_message)?;
        Ok(())
    }
}

impl Default for Question {
    fn default() -> Self {
        Question::new(DnsName::root(), RRType::PTR)
    }
}

/// The decoded payload of a resource record. Unrecognized type codes are
/// preserved as `Unknown` rather than rejected, so messages carrying
/// experimental record types still round-trip.
#[derive(Debug, Clone, PartialEq)]
pub enum RData {
    A(Ipv4Addr),
    AAAA(Ipv6Addr),
    PTR(DnsName),
    SRV {
        priority: u16,
        weight: u16,
        port: u16,
        target: DnsName,
    },
    TXT(Txt),
    HINFO {
        cpu: String,
        os: String,
    },
    NSEC {
        next: DnsName,
        bitmap: Vec<u8>,
    },
    Unknown {
        type_code: u16,
        raw: Vec<u8>,
    },
}

impl RData {
    pub fn type_code(&self) -> u16 {
        match self {
            RData::A(_) => RRType::A as u16,
            RData::AAAA(_) => RRType::AAAA as u16,
            RData::PTR(_) => RRType::PTR as u16,
            RData::SRV { .. } => RRType::SRV as u16,
            RData::TXT(_) => RRType::TXT as u16,
            RData::HINFO { .. } => RRType::HINFO as u16,
            RData::NSEC { .. } => RRType::NSEC as u16,
            RData::Unknown { type_code, .. } => *type_code,
        }
    }

    fn encode(&self, buffer: &mut WireWriter) -> DnsSdResult<()> {
        match self {
            RData::A(addr) => {
                addr.to_network_bytes(buffer)?;
            }
            RData::AAAA(addr) => {
                addr.to_network_bytes(buffer)?;
            }
            RData::PTR(name) => {
                name.to_network_bytes(buffer)?;
            }
            RData::SRV {
                priority,
                weight,
                port,
                target,
            } => {
                priority.to_network_bytes(buffer)?;
                weight.to_network_bytes(buffer)?;
                port.to_network_bytes(buffer)?;
                target.to_network_bytes_uncompressed(buffer)?;
            }
            RData::TXT(txt) => {
                txt.to_network_bytes(buffer)?;
            }
            RData::HINFO { cpu, os } => {
                write_character_string(buffer, cpu)?;
                write_character_string(buffer, os)?;
            }
            RData::NSEC { next, bitmap } => {
                next.to_network_bytes(buffer)?;
                buffer.extend_from_slice(bitmap);
            }
            RData::Unknown { raw, .. } => {
                buffer.extend_from_slice(raw);
            }
        }
        Ok(())
    }

    fn decode<'a>(
        type_code: u16,
        rdlength: u16,
        buffer: &mut Cursor<&'a [u8]>,
    ) -> DnsSdResult<RData> {
        match type_code {
            t if t == RRType::A as u16 => {
                if rdlength != 4 {
                    return Err(DnsSdError::invalid_message("A record rdlength != 4"));
                }
                let mut addr = Ipv4Addr::UNSPECIFIED;
                addr.from_network_bytes(buffer)?;
                Ok(RData::A(addr))
            }
            t if t == RRType::AAAA as u16 => {
                if rdlength != 16 {
                    return Err(DnsSdError::invalid_message("AAAA record rdlength != 16"));
                }
                let mut addr = Ipv6Addr::UNSPECIFIED;
                addr.from_network_bytes(buffer)?;
                Ok(RData::AAAA(addr))
            }
            t if t == RRType::PTR as u16 => {
                let mut name = DnsName::root();
                name.from_network_bytes(buffer)?;
                Ok(RData::PTR(name))
            }
            t if t == RRType::SRV as u16 => {
                let mut priority = 0u16;
                let mut weight = 0u16;
                let mut port = 0u16;
                priority.from_network_bytes(buffer)?;
                weight.from_network_bytes(buffer)?;
                port.from_network_bytes(buffer)?;
                let mut target = DnsName::root();
                target.from_network_bytes(buffer)?;
                Ok(RData::SRV {
                    priority,
                    weight,
                    port,
                    target,
                })
            }
            t if t == RRType::TXT as u16 => {
                Ok(RData::TXT(Txt::decode_rdata(buffer, rdlength)?))
            }
            t if t == RRType::HINFO as u16 => {
                let cpu = read_character_string(buffer)?;
                let os = read_character_string(buffer)?;
                Ok(RData::HINFO { cpu, os })
            }
            t if t == RRType::NSEC as u16 => {
                let before = buffer.position();
                let mut next = DnsName::root();
                next.from_network_bytes(buffer)?;
                let consumed = (buffer.position() - before) as usize;
                if consumed > rdlength as usize {
                    return Err(DnsSdError::invalid_message(
                        "NSEC next-domain name exceeds rdlength",
                    ));
                }
                let bitmap_len = rdlength as usize - consumed;
                let pos = buffer.position() as usize;
                let data = *buffer.get_ref();
                if pos + bitmap_len > data.len() {
                    return Err(DnsSdError::invalid_message("NSEC bitmap exceeds message"));
                }
                let bitmap = data[pos..pos + bitmap_len].to_vec();
                buffer.set_position((pos + bitmap_len) as u64);
                Ok(RData::NSEC { next, bitmap })
            }
            other => {
                let pos = buffer.position() as usize;
                let data = *buffer.get_ref();
                let end = pos + rdlength as usize;
                if end > data.len() {
                    return Err(DnsSdError::invalid_message(
                        "unknown-type rdlength exceeds remaining message",
                    ));
                }
                let raw = data[pos..end].to_vec();
                buffer.set_position(end as u64);
                Ok(RData::Unknown {
                    type_code: other,
                    raw,
                })
            }
        }
    }
}

/// A resource record: owner name, class (with the mDNS cache-flush bit),
/// TTL, and its typed payload.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceRecord {
    pub name: DnsName,
    pub class: RClass,
    pub cache_flush: bool,
    pub ttl: u32,
    pub rdata: RData,
}

impl ResourceRecord {
    pub fn new(name: DnsName, rdata: RData, ttl: u32) -> Self {
        ResourceRecord {
            name,
            class: RClass::IN,
            cache_flush: false,
            ttl,
            rdata,
        }
    }

    pub fn cache_flush(mut self, cache_flush: bool) -> Self {
        self.cache_flush = cache_flush;
        self
    }

    /// A goodbye record: same owner/class/rdata, TTL forced to zero.
    pub fn as_goodbye(&self) -> Self {
        ResourceRecord {
            ttl: 0,
            ..self.clone()
        }
    }
}

impl<'a> ToFromNetworkOrder<'a> for ResourceRecord {
    fn to_network_bytes(&self, buffer: &mut WireWriter) -> DnsSdResult<usize> {
        let start = buffer.len();
        self.name.to_network_bytes(buffer)?;
        self.rdata.type_code().to_network_bytes(buffer)?;

        let mut class_value = self.class as u16;
        if self.cache_flush {
            class_value |= CACHE_FLUSH_BIT;
        }
        buffer.write_u16::<BigEndian>(class_value)?;
        self.ttl.to_network_bytes(buffer)?;

        let rdlength_pos = buffer.len();
        buffer.write_u16::<BigEndian>(0)?;
        let rdata_start = buffer.len();
        self.rdata.encode(buffer)?;
        let rdlength = (buffer.len() - rdata_start) as u16;
        buffer[rdlength_pos] = (rdlength >> 8) as u8;
        buffer[rdlength_pos + 1] = (rdlength & 0xFF) as u8;

        Ok(buffer.len() - start)
    }

    fn from_network_bytes(&mut self, buffer: &mut Cursor<&'a [u8]>) -> DnsSdResult<()> {
        self.name.from_network_bytes(buffer)?;
        let type_code = buffer.read_u16::<BigEndian>()?;

        let raw_class = buffer.read_u16::<BigEndian>()?;
        self.cache_flush = raw_class & CACHE_FLUSH_BIT != 0;
        self.class = RClass::try_from(raw_class & CLASS_MASK)
            .map_err(DnsSdError::invalid_message)?;

        self.ttl = buffer.read_u32::<BigEndian>()?;
        let rdlength = buffer.read_u16::<BigEndian>()?;

        let pos = buffer.position() as usize;
        if pos + rdlength as usize > buffer.get_ref().len() {
            return Err(DnsSdError::invalid_message(
                "record rdlength exceeds remaining message",
            ));
        }

        self.rdata = RData::decode(type_code, rdlength, buffer)?;
        Ok(())
    }
}

impl Default for ResourceRecord {
    fn default() -> Self {
        ResourceRecord::new(DnsName::root(), RData::A(Ipv4Addr::UNSPECIFIED), 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::WireWriter;

    #[test]
    fn question_round_trips_with_qu_bit() {
        let q = Question::new("_http._tcp.local".parse().unwrap(), RRType::PTR).qu(true);
        let mut w = WireWriter::new();
        q.to_network_bytes(&mut w).unwrap();
        let bytes = w.into_bytes();

        let mut cursor = Cursor::new(bytes.as_slice());
        let mut decoded = Question::default();
        decoded.from_network_bytes(&mut cursor).unwrap();
        assert_eq!(decoded, q);
        assert!(decoded.unicast_response);
    }

    #[test]
    fn a_record_round_trips_with_cache_flush() {
        let rr = ResourceRecord::new(
            "host.local".parse().unwrap(),
            RData::A(Ipv4Addr::new(192, 168, 1, 100)),
            120,
        )
        .cache_flush(true);

        let mut w = WireWriter::new();
        rr.to_network_bytes(&mut w).unwrap();
        let bytes = w.into_bytes();

        let mut cursor = Cursor::new(bytes.as_slice());
        let mut decoded = ResourceRecord::default();
        decoded.from_network_bytes(&mut cursor).unwrap();
        assert_eq!(decoded, rr);
        assert!(decoded.cache_flush);
    }

    #[test]
    fn srv_target_is_not_compressed() {
        let mut w = WireWriter::new();
        let ptr = ResourceRecord::new(
            "_http._tcp.local".parse().unwrap(),
            RData::PTR("My Server._http._tcp.local".parse().unwrap()),
            120,
        );
        ptr.to_network_bytes(&mut w).unwrap();
        let before = w.len();

        let srv = ResourceRecord::new(
            "My Server._http._tcp.local".parse().unwrap(),
            RData::SRV {
                priority: 0,
                weight: 0,
                port: 8080,
                target: "myhost.local".parse().unwrap(),
            },
            120,
        );
        srv.to_network_bytes(&mut w).unwrap();
        let bytes = w.into_bytes();

        // the target name must appear in full (no 2-byte pointer shortcut)
        // so the srv record's own encoded length includes every label.
        assert!(bytes.len() - before > "myhost.local".len());
    }

    #[test]
    fn unknown_type_round_trips_opaquely() {
        let rr = ResourceRecord::new(
            "host.local".parse().unwrap(),
            RData::Unknown {
                type_code: 999,
                raw: vec![1, 2, 3, 4],
            },
            30,
        );
        let mut w = WireWriter::new();
        rr.to_network_bytes(&mut w).unwrap();
        let bytes = w.into_bytes();

        let mut cursor = Cursor::new(bytes.as_slice());
        let mut decoded = ResourceRecord::default();
        decoded.from_network_bytes(&mut cursor).unwrap();
        assert_eq!(decoded, rr);
    }

    #[test]
    fn txt_record_decodes_bounded_to_rdlength() {
        let rr = ResourceRecord::new(
            "My Server._http._tcp.local".parse().unwrap(),
            RData::TXT(Txt::from_strings(vec!["path=/v1".to_string()])),
            120,
        );
        let mut w = WireWriter::new();
        rr.to_network_bytes(&mut w).unwrap();
        // a second record follows right after in the same buffer
        let trailing = ResourceRecord::new(
            "host.local".parse().unwrap(),
            RData::A(Ipv4Addr::new(1, 2, 3, 4)),
            120,
        );
        trailing.to_network_bytes(&mut w).unwrap();

        let bytes = w.into_bytes();
        let mut cursor = Cursor::new(bytes.as_slice());
        let mut decoded = ResourceRecord::default();
        decoded.from_network_bytes(&mut cursor).unwrap();
        assert_eq!(decoded, rr);
        let mut decoded2 = ResourceRecord::default();
        decoded2.from_network_bytes(&mut cursor).unwrap();
        assert_eq!(decoded2, trailing);
    }
}
