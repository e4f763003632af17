//! The DNS header and four-section message, plus the mDNS factory helpers
//! (`mdns_query`, `mdns_goodbye`, `mdns_response`) used throughout the
//! browser and advertiser.
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::Cursor;

use crate::error::{DnsSdError, DnsSdResult};
use crate::name::DnsName;
use crate::record::{Question, ResourceRecord, RRType};
use crate::wire::{ToFromNetworkOrder, WireWriter};

/// The 16 header flag bits (RFC 1035 §4.1.1), minus the 3 reserved `Z` bits
/// which this library always writes as zero and ignores on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Flags {
    pub response: bool,
    pub opcode: u8,
    pub authoritative: bool,
    pub truncated: bool,
    pub recursion_desired: bool,
    pub recursion_available: bool,
    pub rcode: u8,
}

impl Flags {
    fn to_u16(self) -> u16 {
        let mut v = 0u16;
        if self.response {
            v |= 1 << 15;
        }
        v |= ((self.opcode & 0x0F) as u16) << 11;
        if self.authoritative {
            v |= 1 << 10;
        }
        if self.truncated {
            v |= 1 << 9;
        }
        if self.recursion_desired {
            v |= 1 << 8;
        }
        if self.recursion_available {
            v |= 1 << 7;
        }
        v |= (self.rcode & 0x0F) as u16;
        v
    }

    fn from_u16(v: u16) -> Self {
        Flags {
            response: v & (1 << 15) != 0,
            opcode: ((v >> 11) & 0x0F) as u8,
            authoritative: v & (1 << 10) != 0,
            truncated: v & (1 << 9) != 0,
            recursion_desired: v & (1 << 8) != 0,
            recursion_available: v & (1 << 7) != 0,
            rcode: (v & 0x0F) as u8,
        }
    }
}

/// A full DNS message: the 12-octet header (counts derived from the section
/// lengths, never stored redundantly) and the four record sections.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Message {
    pub id: u16,
    pub flags: Flags,
    pub question: Vec<Question>,
    pub answer: Vec<ResourceRecord>,
    pub authority: Vec<ResourceRecord>,
    pub additional: Vec<ResourceRecord>,
}

impl Message {
    /// A message's id is always zero in mDNS (RFC 6762 §18.1).
    pub fn is_mdns(&self) -> bool {
        self.id == 0
    }

    pub fn to_bytes(&self) -> DnsSdResult<Vec<u8>> {
        let mut buffer = WireWriter::new();

        buffer.write_u16::<BigEndian>(self.id)?;
        buffer.write_u16::<BigEndian>(self.flags.to_u16())?;
        buffer.write_u16::<BigEndian>(self.question.len() as u16)?;
        buffer.write_u16::<BigEndian>(self.answer.len() as u16)?;
        buffer.write_u16::<BigEndian>(self.authority.len() as u16)?;
        buffer.write_u16::<BigEndian>(self.additional.len() as u16)?;

        for q in &self.question {
            q.to_network_bytes(&mut buffer)?;
        }
        for rr in self
            .answer
            .iter()
            .chain(self.authority.iter())
            .chain(self.additional.iter())
        {
            rr.to_network_bytes(&mut buffer)?;
        }

        Ok(buffer.into_bytes())
    }

    pub fn from_bytes(bytes: &[u8]) -> DnsSdResult<Message> {
        if bytes.len() < 12 {
            return Err(DnsSdError::invalid_message("message shorter than header"));
        }
        let mut cursor = Cursor::new(bytes);

        let id = cursor.read_u16::<BigEndian>()?;
        let flags = Flags::from_u16(cursor.read_u16::<BigEndian>()?);
        let qd_count = cursor.read_u16::<BigEndian>()?;
        let an_count = cursor.read_u16::<BigEndian>()?;
        let ns_count = cursor.read_u16::<BigEndian>()?;
        let ar_count = cursor.read_u16::<BigEndian>()?;

        let mut question = Vec::with_capacity(qd_count as usize);
        for _ in 0..qd_count {
            let mut q = Question::default();
            q.from_network_bytes(&mut cursor)?;
            question.push(q);
        }

        let mut answer = Vec::with_capacity(an_count as usize);
        for _ in 0..an_count {
            let mut rr = ResourceRecord::default();
            rr.from_network_bytes(&mut cursor)?;
            answer.push(rr);
        }

        let mut authority = Vec::with_capacity(ns_count as usize);
        for _ in 0..ns_count {
            let mut rr = ResourceRecord::default();
            rr.from_network_bytes(&mut cursor)?;
            authority.push(rr);
        }

        let mut additional = Vec::with_capacity(ar_count as usize);
        for _ in 0..ar_count {
            let mut rr = ResourceRecord::default();
            rr.from_network_bytes(&mut cursor)?;
            additional.push(rr);
        }

        Ok(Message {
            id,
            flags,
            question,
            answer,
            authority,
            additional,
        })
    }
}

/// A single-question PTR query for `service_type` (e.g. `_http._tcp.local.`).
pub fn mdns_query(service_type: &DnsName) -> Message {
    Message {
        id: 0,
        flags: Flags::default(),
        question: vec![Question::new(service_type.clone(), RRType::PTR)],
        ..Default::default()
    }
}

/// A multi-question query for `name`, one question per type in `types`, all
/// sharing the same QU setting. Used by `ServiceBrowser::resolve`.
pub fn mdns_query_types(name: &DnsName, types: &[RRType], qu: bool) -> Message {
    Message {
        id: 0,
        flags: Flags::default(),
        question: types
            .iter()
            .map(|t| Question::new(name.clone(), *t).qu(qu))
            .collect(),
        ..Default::default()
    }
}

/// Announces withdrawal of `records` by re-sending them with TTL zero, as an
/// authoritative response (RFC 6762 §10.1).
pub fn mdns_goodbye(records: &[ResourceRecord]) -> Message {
    Message {
        id: 0,
        flags: Flags {
            response: true,
            authoritative: true,
            ..Default::default()
        },
        answer: records.iter().map(ResourceRecord::as_goodbye).collect(),
        ..Default::default()
    }
}

/// An authoritative response carrying `answer` and `additional` records.
pub fn mdns_response(answer: Vec<ResourceRecord>, additional: Vec<ResourceRecord>) -> Message {
    Message {
        id: 0,
        flags: Flags {
            response: true,
            authoritative: true,
            ..Default::default()
        },
        answer,
        additional,
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RData;
    use std::net::Ipv4Addr;

    #[test]
    fn ptr_query_matches_known_wire_bytes() {
        // id=0, query, QD=1, question = (_http._tcp.local., PTR, IN, QU=false)
        let name: DnsName = "_http._tcp.local".parse().unwrap();
        let msg = mdns_query(&name);
        let bytes = msg.to_bytes().unwrap();

        let expected: Vec<u8> = vec![
            0x00, 0x00, // id
            0x00, 0x00, // flags: query
            0x00, 0x01, // qdcount
            0x00, 0x00, // ancount
            0x00, 0x00, // nscount
            0x00, 0x00, // arcount
            0x05, b'_', b'h', b't', b't', b'p', 0x04, b'_', b't', b'c', b'p', 0x05, b'l', b'o',
            b'c', b'a', b'l', 0x00, // name
            0x00, 0x0c, // type PTR
            0x00, 0x01, // class IN, QU=false
        ];
        assert_eq!(bytes, expected);
    }

    #[test]
    fn decodes_ptr_query_from_wire_bytes() {
        let bytes: Vec<u8> = vec![
            0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x05, b'_',
            b'h', b't', b't', b'p', 0x04, b'_', b't', b'c', b'p', 0x05, b'l', b'o', b'c', b'a',
            b'l', 0x00, 0x00, 0x0c, 0x00, 0x01,
        ];
        let msg = Message::from_bytes(&bytes).unwrap();
        assert!(msg.is_mdns());
        assert!(!msg.flags.response);
        assert_eq!(msg.question.len(), 1);
        assert_eq!(msg.question[0].qtype, RRType::PTR);
        assert!(!msg.question[0].unicast_response);
    }

    #[test]
    fn goodbye_zeroes_ttl_and_keeps_cache_flush() {
        let rr = ResourceRecord::new(
            "host.local".parse().unwrap(),
            RData::A(Ipv4Addr::new(192, 168, 1, 1)),
            120,
        )
        .cache_flush(true);
        let msg = mdns_goodbye(&[rr]);

        assert_eq!(msg.id, 0);
        assert!(msg.flags.response);
        assert!(msg.flags.authoritative);
        assert_eq!(msg.answer.len(), 1);
        assert_eq!(msg.answer[0].ttl, 0);
        assert!(msg.answer[0].cache_flush);
    }

    #[test]
    fn full_response_round_trips_and_compresses() {
        let ptr = ResourceRecord::new(
            "_http._tcp.local".parse().unwrap(),
            RData::PTR("My Service._http._tcp.local".parse().unwrap()),
            120,
        );
        let srv = ResourceRecord::new(
            "My Service._http._tcp.local".parse().unwrap(),
            RData::SRV {
                priority: 0,
                weight: 0,
                port: 8080,
                target: "myhost.local".parse().unwrap(),
            },
            120,
        )
        .cache_flush(true);
        let txt = ResourceRecord::new(
            "My Service._http._tcp.local".parse().unwrap(),
            RData::TXT(crate::txt::Txt::from_strings(vec!["path=/v1".to_string()])),
            120,
        )
        .cache_flush(true);
        let a = ResourceRecord::new(
            "myhost.local".parse().unwrap(),
            RData::A(Ipv4Addr::new(192, 168, 1, 100)),
            120,
        )
        .cache_flush(true);

        let msg = mdns_response(vec![ptr, srv, txt], vec![a]);
        let bytes = msg.to_bytes().unwrap();
        assert!(bytes.len() < 200);

        let decoded = Message::from_bytes(&bytes).unwrap();
        assert_eq!(decoded.answer.len(), 3);
        assert_eq!(decoded.additional.len(), 1);
        assert_eq!(decoded, msg);
    }
}
