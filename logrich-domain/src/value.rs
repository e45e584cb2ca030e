// /////////////////////////////////////////////////////////////////////////////
// logrich
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Dynamic values carried in context `extra` fields and event `fields`.
//!
//! Application code attaches arbitrary structured data to context frames and
//! log events (user ids, request metadata, nested maps). `Value` is the
//! tagged representation the sanitiser, scrubber, and serialisers all walk
//! generically, instead of each adapter needing its own notion of "extra
//! data shaped like JSON, but also maybe a byte string or a set".

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// A recursive, serialisable value for context and event extras.
///
/// `Map` uses a `BTreeMap` (rather than a `HashMap`) so that canonical JSON
/// rendering (the dump renderer's JSON format, checkpoint records) is
/// deterministic across runs without an extra sort pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    #[serde(with = "bytes_as_base64")]
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Set(SetWrapper),
}

/// Wraps a set so it round-trips through JSON (which has no native set
/// type) distinguishably from `Value::List`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetWrapper {
    #[serde(rename = "__set__")]
    pub items: BTreeSet<OrdValue>,
}

/// An ordering wrapper so `Value` can live inside a `BTreeSet`. Floats are
/// compared on their bit pattern; this is for redaction/serialisation
/// bookkeeping, not numeric semantics.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrdValue(pub String);

impl Value {
    pub fn depth(&self) -> usize {
        match self {
            Value::List(items) => 1 + items.iter().map(Value::depth).max().unwrap_or(0),
            Value::Map(map) => 1 + map.values().map(Value::depth).max().unwrap_or(0),
            Value::Set(_) => 1,
            _ => 0,
        }
    }

    pub fn approximate_size(&self) -> usize {
        match self {
            Value::Null | Value::Bool(_) => 1,
            Value::Int(_) | Value::Float(_) => 8,
            Value::String(s) => s.len(),
            Value::Bytes(b) => b.len(),
            Value::List(items) => items.iter().map(Value::approximate_size).sum(),
            Value::Map(map) => map.iter().map(|(k, v)| k.len() + v.approximate_size()).sum(),
            Value::Set(set) => set.items.iter().map(|v| v.0.len()).sum(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

mod bytes_as_base64 {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        let encoded = general_purpose_encode(bytes);
        serializer.serialize_str(&encoded)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        general_purpose_decode(&s).map_err(serde::de::Error::custom)
    }

    // Minimal base64 (standard alphabet, padded) so this module doesn't pull
    // in a dedicated crate for what is a handful of lines.
    const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

    fn general_purpose_encode(data: &[u8]) -> String {
        let mut out = String::with_capacity((data.len() + 2) / 3 * 4);
        for chunk in data.chunks(3) {
            let b0 = chunk[0];
            let b1 = *chunk.get(1).unwrap_or(&0);
            let b2 = *chunk.get(2).unwrap_or(&0);
            let n = ((b0 as u32) << 16) | ((b1 as u32) << 8) | b2 as u32;
            out.push(ALPHABET[((n >> 18) & 0x3f) as usize] as char);
            out.push(ALPHABET[((n >> 12) & 0x3f) as usize] as char);
            out.push(if chunk.len() > 1 {
                ALPHABET[((n >> 6) & 0x3f) as usize] as char
            } else {
                '='
            });
            out.push(if chunk.len() > 2 {
                ALPHABET[(n & 0x3f) as usize] as char
            } else {
                '='
            });
        }
        out
    }

    fn general_purpose_decode(s: &str) -> Result<Vec<u8>, String> {
        let rev = |c: u8| -> Result<u32, String> {
            ALPHABET
                .iter()
                .position(|&a| a == c)
                .map(|p| p as u32)
                .ok_or_else(|| format!("invalid base64 byte: {c}"))
        };
        let stripped: Vec<u8> = s.bytes().filter(|&b| b != b'=').collect();
        let mut out = Vec::with_capacity(stripped.len() * 3 / 4);
        for chunk in stripped.chunks(4) {
            let mut n: u32 = 0;
            for (i, &c) in chunk.iter().enumerate() {
                n |= rev(c)? << (18 - 6 * i);
            }
            out.push((n >> 16) as u8);
            if chunk.len() > 2 {
                out.push((n >> 8) as u8);
            }
            if chunk.len() > 3 {
                out.push(n as u8);
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_round_trip_through_json() {
        let v = Value::Bytes(vec![0, 1, 2, 250, 255]);
        let json = serde_json::to_string(&v).unwrap();
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v, back);
    }

    #[test]
    fn depth_counts_nesting() {
        let mut inner = BTreeMap::new();
        inner.insert("a".to_string(), Value::Int(1));
        let nested = Value::List(vec![Value::Map(inner)]);
        assert_eq!(nested.depth(), 2);
        assert_eq!(Value::Int(1).depth(), 0);
    }

    #[test]
    fn approximate_size_sums_scalars() {
        let v = Value::List(vec![Value::String("abcd".into()), Value::Int(1)]);
        assert_eq!(v.approximate_size(), 4 + 8);
    }
}
