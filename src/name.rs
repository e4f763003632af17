//! DNS names: label sequences with RFC 1035 §4.1.4 compression on the wire
//! and ASCII case-insensitive identity everywhere else.
use std::fmt;
use std::hash::{Hash, Hasher};
use std::io::Cursor;
use std::str::FromStr;

use crate::error::{DnsSdError, DnsSdResult};
use crate::wire::{ToFromNetworkOrder, WireWriter};

/// Maximum hops a single decode will follow through compression pointers
/// before it gives up and reports a loop.
const MAX_POINTER_HOPS: usize = 128;
const MAX_LABEL_LEN: usize = 63;
const MAX_NAME_LEN: usize = 255;

/// A DNS domain name: an ordered sequence of labels. The empty sequence is
/// the root. Case is preserved for display but ignored for comparison and
/// hashing, per RFC 1035 §4.1.1 (names are not case sensitive).
#[derive(Debug, Clone, Default)]
pub struct DnsName {
    labels: Vec<String>,
}

fn ascii_lower(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii_uppercase() { c.to_ascii_lowercase() } else { c })
        .collect()
}

impl DnsName {
    pub fn root() -> Self {
        DnsName { labels: Vec::new() }
    }

    pub fn from_labels(labels: Vec<String>) -> DnsSdResult<Self> {
        let name = DnsName { labels };
        name.validate()?;
        Ok(name)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn is_root(&self) -> bool {
        self.labels.is_empty()
    }

    /// Appends `other`'s labels after this name's own, e.g. joining an
    /// instance name with its service type to build a full name.
    pub fn join(&self, other: &DnsName) -> DnsSdResult<Self> {
        let mut labels = self.labels.clone();
        labels.extend(other.labels.iter().cloned());
        Self::from_labels(labels)
    }

    fn validate(&self) -> DnsSdResult<()> {
        let mut total = 1usize; // root terminator
        for label in &self.labels {
            if label.is_empty() {
                return Err(DnsSdError::invalid_name("empty label"));
            }
            if label.len() > MAX_LABEL_LEN {
                return Err(DnsSdError::invalid_name(format!(
                    "label '{}' exceeds {} octets",
                    label, MAX_LABEL_LEN
                )));
            }
            total += label.len() + 1;
        }
        if total > MAX_NAME_LEN {
            return Err(DnsSdError::invalid_name(format!(
                "name exceeds {} octets",
                MAX_NAME_LEN
            )));
        }
        Ok(())
    }

    /// Lowercased, dot-joined label sequence, used as the compression-table
    /// key and as the basis of equality/hash.
    fn folded_key(&self) -> String {
        self.labels
            .iter()
            .map(|l| ascii_lower(l))
            .collect::<Vec<_>>()
            .join(".")
    }
}

impl fmt::Display for DnsName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for label in &self.labels {
            write!(f, "{}.", label)?;
        }
        if self.labels.is_empty() {
            write!(f, ".")?;
        }
        Ok(())
    }
}

impl FromStr for DnsName {
    type Err = DnsSdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim_end_matches('.');
        if trimmed.is_empty() {
            return Ok(DnsName::root());
        }
        let labels = trimmed.split('.').map(|s| s.to_string()).collect();
        DnsName::from_labels(labels)
    }
}

impl PartialEq for DnsName {
    fn eq(&self, other: &Self) -> bool {
        self.folded_key() == other.folded_key()
    }
}
impl Eq for DnsName {}

impl Hash for DnsName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.folded_key().hash(state);
    }
}

impl DnsName {
    /// Encodes this name without ever emitting or consulting a compression
    /// pointer. RFC 2782 / RFC 6762 §18.14 require SRV targets on the wire
    /// in this uncompressed form (decoders may still follow pointers in a
    /// peer's SRV target for interop).
    pub fn to_network_bytes_uncompressed(&self, buffer: &mut WireWriter) -> DnsSdResult<usize> {
        let start_len = buffer.len();
        for label in &self.labels {
            buffer.push(label.len() as u8);
            buffer.extend_from_slice(label.as_bytes());
        }
        buffer.push(0);
        Ok(buffer.len() - start_len)
    }
}

impl<'a> ToFromNetworkOrder<'a> for DnsName {
    fn to_network_bytes(&self, buffer: &mut WireWriter) -> DnsSdResult<usize> {
        let start_len = buffer.len();

        for i in 0..self.labels.len() {
            let suffix_key = self.labels[i..]
                .iter()
                .map(|l| ascii_lower(l))
                .collect::<Vec<_>>()
                .join(".");

            if let Some(offset) = buffer.offset_of(&suffix_key) {
                buffer.push(0xC0 | ((offset >> 8) as u8));
                buffer.push((offset & 0xFF) as u8);
                return Ok(buffer.len() - start_len);
            }

            buffer.remember_suffix(suffix_key);
            let label = &self.labels[i];
            buffer.push(label.len() as u8);
            buffer.extend_from_slice(label.as_bytes());
        }

        buffer.push(0);
        Ok(buffer.len() - start_len)
    }

    fn from_network_bytes(&mut self, buffer: &mut Cursor<&'a [u8]>) -> DnsSdResult<()> {
        let data = *buffer.get_ref();
        let start_pos = buffer.position() as usize;

        let mut labels = Vec::new();
        let mut pos = start_pos;
        let mut consumed: Option<usize> = None;
        let mut hops = 0usize;

        loop {
            if pos >= data.len() {
                return Err(DnsSdError::invalid_message("name runs past end of message"));
            }
            let len_byte = data[pos];

            if len_byte == 0 {
                pos += 1;
                if consumed.is_none() {
                    consumed = Some(pos - start_pos);
                }
                break;
            } else if len_byte & 0xC0 == 0xC0 {
                hops += 1;
                if hops > MAX_POINTER_HOPS {
                    return Err(DnsSdError::invalid_message("compression pointer loop"));
                }
                if pos + 1 >= data.len() {
                    return Err(DnsSdError::invalid_message("truncated compression pointer"));
                }
                let offset = (((len_byte & 0x3F) as usize) << 8) | data[pos + 1] as usize;
                if offset >= data.len() {
                    return Err(DnsSdError::invalid_message(
                        "compression pointer out of range",
                    ));
                }
                if consumed.is_none() {
                    consumed = Some(pos + 2 - start_pos);
                }
                pos = offset;
            } else if len_byte & 0xC0 == 0 {
                let len = len_byte as usize;
                if len > MAX_LABEL_LEN {
                    return Err(DnsSdError::invalid_message("label exceeds 63 octets"));
                }
                pos += 1;
                if pos + len > data.len() {
                    return Err(DnsSdError::invalid_message("label runs past end of message"));
                }
                labels.push(String::from_utf8(data[pos..pos + len].to_vec())?);
                pos += len;
            } else {
                return Err(DnsSdError::invalid_message("reserved label type"));
            }
        }

        self.labels = labels;
        buffer.set_position((start_pos + consumed.unwrap_or(0)) as u64);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_simple_name() {
        let name: DnsName = "_http._tcp.local".parse().unwrap();
        let mut w = WireWriter::new();
        name.to_network_bytes(&mut w).unwrap();
        let bytes = w.into_bytes();

        let mut cursor = Cursor::new(bytes.as_slice());
        let mut decoded = DnsName::root();
        decoded.from_network_bytes(&mut cursor).unwrap();
        assert_eq!(decoded, name);
        assert_eq!(cursor.position() as usize, bytes.len());
    }

    #[test]
    fn compression_reuses_suffix() {
        let a: DnsName = "_http._tcp.local".parse().unwrap();
        let b: DnsName = "_ssh._tcp.local".parse().unwrap();

        let mut w = WireWriter::new();
        a.to_network_bytes(&mut w).unwrap();
        let uncompressed_len = w.len();
        b.to_network_bytes(&mut w).unwrap();
        let total = w.len();

        // "_tcp.local" was already on the wire; b's encoding should be a
        // label for "_ssh" plus a 2-byte pointer, much shorter than a's.
        assert!(total - uncompressed_len < uncompressed_len);
    }

    #[test]
    fn follows_pointer_into_prior_name() {
        let mut w = WireWriter::new();
        let base: DnsName = "_tcp.local".parse().unwrap();
        base.to_network_bytes(&mut w).unwrap();

        let full: DnsName = "My Server._tcp.local".parse().unwrap();
        let start = w.len();
        full.to_network_bytes(&mut w).unwrap();
        let bytes = w.into_bytes();

        let mut cursor = Cursor::new(bytes.as_slice());
        cursor.set_position(start as u64);
        let mut decoded = DnsName::root();
        decoded.from_network_bytes(&mut cursor).unwrap();
        assert_eq!(decoded, full);
    }

    #[test]
    fn case_insensitive_equality() {
        let a: DnsName = "_HTTP._TCP.Local".parse().unwrap();
        let b: DnsName = "_http._tcp.local".parse().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn reserved_label_type_fails() {
        let bytes = [0b0100_0000u8, 0x00];
        let mut cursor = Cursor::new(&bytes[..]);
        let mut decoded = DnsName::root();
        assert!(decoded.from_network_bytes(&mut cursor).is_err());
    }

    #[test]
    fn self_pointer_fails() {
        let bytes = [0xC0u8, 0x00];
        let mut cursor = Cursor::new(&bytes[..]);
        let mut decoded = DnsName::root();
        // points at itself: not an infinite loop in this encoding (offset 0
        // re-reads the same pointer), but it must not succeed past the hop cap.
        assert!(decoded.from_network_bytes(&mut cursor).is_err());
    }

    #[test]
    fn over_long_label_rejected() {
        let label = "a".repeat(64);
        let err = DnsName::from_labels(vec![label]);
        assert!(err.is_err());
    }
}
