//! Topic validation and envelope canonicalization for the publish path.

use std::fmt;

use serde::de::{Deserializer, IgnoredAny, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use uuid::Uuid;

use crate::utils::error::RelayError;

/// Topic ids are UUIDs in any of the usual textual forms.
pub fn is_valid_topic(topic: &str) -> bool {
    Uuid::parse_str(topic).is_ok()
}

/// The recognized publish body.
///
/// Decoding only accepts a JSON object. Keys match case-insensitively, a
/// repeated key keeps its last value, `null` or a missing field leaves the
/// zero value, and unknown fields are dropped. `t` is carried as raw JSON.
#[derive(Debug, Default, Serialize)]
pub struct Envelope {
    pub a: String,
    pub bn: i64,
    pub sig: String,
    pub t: Option<Box<RawValue>>,
    pub tx: String,
}

impl<'de> Deserialize<'de> for Envelope {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(EnvelopeVisitor)
    }
}

struct EnvelopeVisitor;

impl<'de> Visitor<'de> for EnvelopeVisitor {
    type Value = Envelope;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON object")
    }

    fn visit_map<M>(self, mut map: M) -> Result<Envelope, M::Error>
    where
        M: MapAccess<'de>,
    {
        let mut envelope = Envelope::default();

        while let Some(key) = map.next_key::<String>()? {
            match key.to_ascii_lowercase().as_str() {
                "a" => envelope.a = map.next_value::<Option<String>>()?.unwrap_or_default(),
                "bn" => envelope.bn = map.next_value::<Option<i64>>()?.unwrap_or_default(),
                "sig" => envelope.sig = map.next_value::<Option<String>>()?.unwrap_or_default(),
                "t" => envelope.t = map.next_value::<Option<Box<RawValue>>>()?,
                "tx" => envelope.tx = map.next_value::<Option<String>>()?.unwrap_or_default(),
                _ => {
                    map.next_value::<IgnoredAny>()?;
                }
            }
        }

        Ok(envelope)
    }
}

/// Parses `body` as an [`Envelope`] and re-serializes it with `t` compacted.
pub fn canonicalize(body: &[u8]) -> Result<String, RelayError> {
    let mut envelope: Envelope = serde_json::from_slice(body)?;
    if let Some(raw) = envelope.t.take() {
        envelope.t = Some(RawValue::from_string(compact(raw.get()))?);
    }
    Ok(serde_json::to_string(&envelope)?)
}

/// Strips insignificant whitespace from already-valid JSON text.
pub(crate) fn compact(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    let mut in_string = false;
    let mut escaped = false;

    for c in json.chars() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            ' ' | '\t' | '\n' | '\r' => {}
            '"' => {
                in_string = true;
                out.push(c);
            }
            _ => out.push(c),
        }
    }

    out
}
