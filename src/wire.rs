//! Wire-format primitives: the append-oriented write buffer (with the name
//! compression table) and the `ToFromNetworkOrder` trait implemented by every
//! type that has a DNS wire representation.
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::collections::HashMap;
use std::io::Cursor;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::ops::{Deref, DerefMut};

use crate::error::DnsSdResult;

/// Highest offset a compression pointer can address (14 bits).
pub const MAX_COMPRESSION_OFFSET: usize = 0x3FFF;

/// An append-only output buffer used to encode a whole DNS message.
///
/// Besides the raw bytes, it tracks the offset at which every name suffix
/// already written can be found, so [`crate::name::DnsName::to_network_bytes`]
/// can emit a compression pointer instead of repeating labels.
#[derive(Debug, Default)]
pub struct WireWriter {
    buf: Vec<u8>,
    suffixes: HashMap<String, u16>,
}

impl WireWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Offset at which `suffix` (a dot-joined, lowercased label sequence)
    /// was previously written, if any.
    pub fn offset_of(&self, suffix: &str) -> Option<u16> {
        self.suffixes.get(suffix).copied()
    }

    /// Remembers that `suffix` starts at the buffer's current end, provided
    /// that offset is still addressable by a 14-bit pointer.
    pub fn remember_suffix(&mut self, suffix: String) {
        let offset = self.buf.len();
        if offset <= MAX_COMPRESSION_OFFSET {
            self.suffixes.entry(suffix).or_insert(offset as u16);
        }
    }
}

impl Deref for WireWriter {
    type Target = Vec<u8>;
    fn deref(&self) -> &Vec<u8> {
        &self.buf
    }
}

impl DerefMut for WireWriter {
    fn deref_mut(&mut self) -> &mut Vec<u8> {
        &mut self.buf
    }
}

/// Implemented by every type with a DNS wire representation: primitives,
/// names, records, and whole messages. `'a` is the lifetime of the byte
/// slice a value is decoded from.
///
/// Struct implementations are generated field-by-field with
/// `#[derive(DnsStruct)]`; enums with explicit discriminants get
/// `#[derive(DnsEnum)]` plus the [`crate::derive_enum`] macro for the wire
/// codec half.
pub trait ToFromNetworkOrder<'a> {
    fn to_network_bytes(&self, buffer: &mut WireWriter) -> DnsSdResult<usize>;
    fn from_network_bytes(&mut self, buffer: &mut Cursor<&'a [u8]>) -> DnsSdResult<()>;
}

impl<'a> ToFromNetworkOrder<'a> for u8 {
    fn to_network_bytes(&self, buffer: &mut WireWriter) -> DnsSdResult<usize> {
        buffer.write_u8(*self)?;
        Ok(1)
    }

    fn from_network_bytes(&mut self, buffer: &mut Cursor<&'a [u8]>) -> DnsSdResult<()> {
        *self = buffer.read_u8()?;
        Ok(())
    }
}

impl<'a> ToFromNetworkOrder<'a> for u16 {
    fn to_network_bytes(&self, buffer: &mut WireWriter) -> DnsSdResult<usize> {
        buffer.write_u16::<BigEndian>(*self)?;
        Ok(2)
    }

    fn from_network_bytes(&mut self, buffer: &mut Cursor<&'a [u8]>) -> DnsSdResult<()> {
        *self = buffer.read_u16::<BigEndian>()?;
        Ok(())
    }
}

impl<'a> ToFromNetworkOrder<'a> for u32 {
    fn to_network_bytes(&self, buffer: &mut WireWriter) -> DnsSdResult<usize> {
        buffer.write_u32::<BigEndian>(*self)?;
        Ok(4)
    }

    fn from_network_bytes(&mut self, buffer: &mut Cursor<&'a [u8]>) -> DnsSdResult<()> {
        *self = buffer.read_u32::<BigEndian>()?;
        Ok(())
    }
}

impl<'a> ToFromNetworkOrder<'a> for Ipv4Addr {
    fn to_network_bytes(&self, buffer: &mut WireWriter) -> DnsSdResult<usize> {
        buffer.extend_from_slice(&self.octets());
        Ok(4)
    }

    fn from_network_bytes(&mut self, buffer: &mut Cursor<&'a [u8]>) -> DnsSdResult<()> {
        let mut octets = [0u8; 4];
        std::io::Read::read_exact(buffer, &mut octets)?;
        *self = Ipv4Addr::from(octets);
        Ok(())
    }
}

impl<'a> ToFromNetworkOrder<'a> for Ipv6Addr {
    fn to_network_bytes(&self, buffer: &mut WireWriter) -> DnsSdResult<usize> {
        buffer.extend_from_slice(&self.octets());
        Ok(16)
    }

    fn from_network_bytes(&mut self, buffer: &mut Cursor<&'a [u8]>) -> DnsSdResult<()> {
        let mut octets = [0u8; 16];
        std::io::Read::read_exact(buffer, &mut octets)?;
        *self = Ipv6Addr::from(octets);
        Ok(())
    }
}

/// A DNS `<character-string>`: a single length-prefixed byte string, used for
/// HINFO fields and each entry of a TXT record's raw sequence.
pub fn read_character_string<'a>(buffer: &mut Cursor<&'a [u8]>) -> DnsSdResult<String> {
    let len = buffer.read_u8()? as usize;
    let pos = buffer.position() as usize;
    let data = *buffer.get_ref();
    if pos + len > data.len() {
        return Err(crate::error::DnsSdError::invalid_message(
            "character-string length exceeds remaining buffer",
        ));
    }
    let s = String::from_utf8(data[pos..pos + len].to_vec())?;
    buffer.set_position((pos + len) as u64);
    Ok(s)
}

pub fn write_character_string(buffer: &mut WireWriter, s: &str) -> DnsSdResult<usize> {
    if s.len() > 255 {
        return Err(crate::error::DnsSdError::invalid_name(
            "character-string longer than 255 octets",
        ));
    }
    buffer.write_u8(s.len() as u8)?;
    buffer.extend_from_slice(s.as_bytes());
    Ok(1 + s.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn u16_round_trips() {
        let mut w = WireWriter::new();
        42u16.to_network_bytes(&mut w).unwrap();
        let bytes = w.into_bytes();
        assert_eq!(bytes, vec![0x00, 0x2A]);

        let mut cursor = Cursor::new(bytes.as_slice());
        let mut v = 0u16;
        v.from_network_bytes(&mut cursor).unwrap();
        assert_eq!(v, 42);
    }

    #[test]
    fn character_string_round_trips() {
        let mut w = WireWriter::new();
        write_character_string(&mut w, "path=/v1").unwrap();
        let bytes = w.into_bytes();
        assert_eq!(bytes[0], 8);

        let mut cursor = Cursor::new(bytes.as_slice());
        let s = read_character_string(&mut cursor).unwrap();
        assert_eq!(s, "path=/v1");
    }

    #[test]
    fn ipv4_round_trips() {
        let addr = Ipv4Addr::new(192, 168, 1, 100);
        let mut w = WireWriter::new();
        addr.to_network_bytes(&mut w).unwrap();
        let bytes = w.into_bytes();

        let mut cursor = Cursor::new(bytes.as_slice());
        let mut decoded = Ipv4Addr::UNSPECIFIED;
        decoded.from_network_bytes(&mut cursor).unwrap();
        assert_eq!(decoded, addr);
    }
}
