//! The TXT record data model: an ordered wire-format string sequence plus a
//! case-insensitive key index, supporting both RFC 6763 §6.4 single-value
//! lookups and the libp2p multi-valued extension.
use std::collections::HashMap;
use std::io::Cursor;

use crate::error::DnsSdResult;
use crate::wire::{read_character_string, write_character_string, ToFromNetworkOrder, WireWriter};

/// A TXT record: the ordered raw strings as they appear (or will appear) on
/// the wire, plus a derived lowercased-key index into that sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Txt {
    raw: Vec<String>,
    index: HashMap<String, Vec<usize>>,
}

fn split_entry(entry: &str) -> (String, Option<String>) {
    match entry.split_once('=') {
        Some((k, v)) => (k.to_ascii_lowercase(), Some(v.to_string())),
        None => (entry.to_ascii_lowercase(), None),
    }
}

impl Txt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a `Txt` from the raw wire-order strings, dropping empty
    /// entries (RFC 6763 §6.1 permits but discourages them).
    pub fn from_strings(strings: Vec<String>) -> Self {
        let mut txt = Txt::new();
        for s in strings {
            if !s.is_empty() {
                txt.push_raw(s);
            }
        }
        txt
    }

    fn push_raw(&mut self, entry: String) {
        let (key, _) = split_entry(&entry);
        let pos = self.raw.len();
        self.raw.push(entry);
        self.index.entry(key).or_default().push(pos);
    }

    /// The canonical decode of an empty RDATA window: a single empty
    /// entry, `[""]`, bypassing `from_strings`'s empty-entry filter (which
    /// only applies to caller-constructed values, not the wire's own empty
    /// encoding).
    fn single_empty_entry() -> Self {
        let mut txt = Txt::new();
        txt.push_raw(String::new());
        txt
    }

    fn rebuild_index(&mut self) {
        self.index.clear();
        for (pos, entry) in self.raw.iter().enumerate() {
            let (key, _) = split_entry(entry);
            self.index.entry(key).or_default().push(pos);
        }
    }

    /// The first value stored for `key`, DNS-SD style. Boolean attributes
    /// (no `=`) report `Some("")`.
    pub fn get(&self, key: &str) -> Option<&str> {
        let key = key.to_ascii_lowercase();
        let pos = *self.index.get(&key)?.first()?;
        let (_, value) = split_entry(&self.raw[pos]);
        // SAFETY-free: lifetime tied to self.raw, reconstruct below.
        match value {
            Some(_) => Some(self.raw[pos].splitn(2, '=').nth(1).unwrap_or("")),
            None => Some(""),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(&key.to_ascii_lowercase())
    }

    /// Every value stored for `key`, in wire order (libp2p multi-value).
    pub fn values(&self, key: &str) -> Vec<&str> {
        let key = key.to_ascii_lowercase();
        match self.index.get(&key) {
            Some(positions) => positions
                .iter()
                .map(|&pos| self.raw[pos].splitn(2, '=').nth(1).unwrap_or(""))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Replaces every existing value for `key` with a single new one.
    pub fn set(&mut self, key: &str, value: &str) {
        self.remove(key);
        self.append(key, value);
    }

    /// Adds another entry for `key` without touching existing ones.
    pub fn append(&mut self, key: &str, value: &str) {
        let entry = if value.is_empty() {
            key.to_string()
        } else {
            format!("{}={}", key, value)
        };
        self.push_raw(entry);
    }

    /// Removes every existing value for `key`, then appends each of `values`.
    pub fn set_values(&mut self, key: &str, values: &[&str]) {
        self.remove(key);
        for v in values {
            self.append(key, v);
        }
    }

    pub fn remove(&mut self, key: &str) {
        let key = key.to_ascii_lowercase();
        if self.index.remove(&key).is_none() {
            return;
        }
        self.raw.retain(|entry| split_entry(entry).0 != key);
        self.rebuild_index();
    }

    pub fn to_strings(&self) -> &[String] {
        &self.raw
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }
}

impl<'a> ToFromNetworkOrder<'a> for Txt {
    fn to_network_bytes(&self, buffer: &mut WireWriter) -> DnsSdResult<usize> {
        let start_len = buffer.len();
        if self.raw.is_empty() {
            buffer.push(0);
        } else {
            for entry in &self.raw {
                write_character_string(buffer, entry)?;
            }
        }
        Ok(buffer.len() - start_len)
    }

    /// Consumes character-strings until the cursor reaches the end of its
    /// underlying slice. Callers must therefore hand this a cursor bounded
    /// to exactly the TXT record's `rdlength` window (see
    /// [`Txt::decode_rdata`]), never the whole message.
    fn from_network_bytes(&mut self, buffer: &mut Cursor<&'a [u8]>) -> DnsSdResult<()> {
        let end = buffer.get_ref().len() as u64;
        let mut strings = Vec::new();
        while buffer.position() < end {
            strings.push(read_character_string(buffer)?);
        }
        *self = if strings.is_empty() {
            Txt::single_empty_entry()
        } else {
            Txt::from_strings(strings)
        };
        Ok(())
    }
}

impl Txt {
    /// Decodes a TXT record's RDATA, given the `rdlength` already read from
    /// the enclosing resource record, out of the shared message cursor.
    pub fn decode_rdata<'a>(buffer: &mut Cursor<&'a [u8]>, rdlength: u16) -> DnsSdResult<Txt> {
        let start = buffer.position() as usize;
        let end = start + rdlength as usize;
        let data = *buffer.get_ref();
        if end > data.len() {
            return Err(crate::error::DnsSdError::invalid_message(
                "TXT rdlength exceeds remaining message",
            ));
        }
        let mut sub = Cursor::new(&data[start..end]);
        let mut txt = Txt::new();
        txt.from_network_bytes(&mut sub)?;
        buffer.set_position(end as u64);
        Ok(txt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_preserves_order_and_multi_value() {
        let mut txt = Txt::new();
        txt.append("proto", "v1");
        txt.append("proto", "v2");

        assert_eq!(txt.get("proto"), Some("v1"));
        assert_eq!(txt.values("proto"), vec!["v1", "v2"]);
        assert_eq!(txt.to_strings(), &["proto=v1".to_string(), "proto=v2".to_string()]);
    }

    #[test]
    fn set_replaces_all_values() {
        let mut txt = Txt::new();
        txt.append("k", "a");
        txt.append("k", "b");
        txt.set("k", "c");
        assert_eq!(txt.values("k"), vec!["c"]);
    }

    #[test]
    fn from_strings_round_trips() {
        let original = vec!["path=/v1".to_string(), "secure".to_string()];
        let txt = Txt::from_strings(original.clone());
        assert_eq!(txt.to_strings(), original.as_slice());
        assert_eq!(txt.get("secure"), Some(""));
    }

    #[test]
    fn keys_are_case_insensitive() {
        let mut txt = Txt::new();
        txt.append("Path", "/v1");
        assert_eq!(txt.get("path"), Some("/v1"));
        assert!(txt.contains("PATH"));
    }

    #[test]
    fn empty_strings_are_dropped_on_construction() {
        let txt = Txt::from_strings(vec!["".to_string(), "a=1".to_string()]);
        assert_eq!(txt.to_strings(), &["a=1".to_string()]);
    }
}
