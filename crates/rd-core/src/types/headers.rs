use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("malformed header blob: {message}")]
pub struct HeaderParseError {
    message: String,
}

/// Request headers as stored: a JSON object blob, kept verbatim.
///
/// Header order is preserved both ways. The blob is only decoded on demand so
/// a row with a damaged blob still loads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Headers(String);

impl Default for Headers {
    fn default() -> Self {
        Self("{}".to_string())
    }
}

impl Headers {
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
        I: IntoIterator<Item = (K, V)>,
    {
        let pairs: Vec<(K, V)> = pairs.into_iter().collect();
        let mut blob = String::from("{");
        for (index, (name, value)) in pairs.iter().enumerate() {
            if index > 0 {
                blob.push_str(", ");
            }
            blob.push_str(&Value::from(name.as_ref()).to_string());
            blob.push_str(": ");
            blob.push_str(&Value::from(value.as_ref()).to_string());
        }
        blob.push('}');
        Self(blob)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_raw(self) -> String {
        self.0
    }

    /// Decodes the blob into ordered `(name, value)` pairs.
    ///
    /// An empty blob is an empty mapping. Non-string values are rendered as
    /// their JSON text.
    pub fn entries(&self) -> Result<Vec<(String, String)>, HeaderParseError> {
        if self.0.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str::<OrderedEntries>(&self.0)
            .map(|entries| entries.0)
            .map_err(|err| HeaderParseError {
                message: err.to_string(),
            })
    }

    /// Case-insensitive lookup. With duplicate names the last one wins.
    ///
    /// Decodes the blob on every call; use [`lookup`] on [`entries`](Self::entries)
    /// for several names.
    pub fn get(&self, name: &str) -> Result<Option<String>, HeaderParseError> {
        Ok(lookup(&self.entries()?, name).map(str::to_string))
    }
}

/// Case-insensitive lookup in decoded entries; the last duplicate wins.
pub fn lookup<'a>(entries: &'a [(String, String)], name: &str) -> Option<&'a str> {
    entries
        .iter()
        .rev()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

struct OrderedEntries(Vec<(String, String)>);

impl<'de> Deserialize<'de> for OrderedEntries {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(EntriesVisitor)
    }
}

struct EntriesVisitor;

impl<'de> Visitor<'de> for EntriesVisitor {
    type Value = OrderedEntries;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON object of header names to values")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some((name, value)) = map.next_entry::<String, Value>()? {
            let value = match value {
                Value::String(text) => text,
                other => other.to_string(),
            };
            entries.push((name, value));
        }
        Ok(OrderedEntries(entries))
    }
}

impl Serialize for Headers {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.entries() {
            Ok(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (name, value) in &entries {
                    map.serialize_entry(name, value)?;
                }
                map.end()
            }
            Err(_) => serializer.serialize_str(&self.0),
        }
    }
}

impl<'de> Deserialize<'de> for Headers {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(HeadersVisitor)
    }
}

struct HeadersVisitor;

impl<'de> Visitor<'de> for HeadersVisitor {
    type Value = Headers;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a header object or a raw header blob")
    }

    fn visit_str<E: serde::de::Error>(self, raw: &str) -> Result<Self::Value, E> {
        Ok(Headers(raw.to_string()))
    }

    fn visit_string<E: serde::de::Error>(self, raw: String) -> Result<Self::Value, E> {
        Ok(Headers(raw))
    }

    fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<Self::Value, A::Error> {
        let entries = EntriesVisitor.visit_map(map)?;
        Ok(Headers::from_pairs(entries.0))
    }
}
