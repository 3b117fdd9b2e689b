//! The wire artifact: one fixed-capacity key/value storage slot.

use serde::{Deserialize, Serialize};

/// Inclusive maximum key length, in ASCII characters.
pub const KEY_LIMIT: usize = 64;
/// Inclusive maximum value length, in bytes.
pub const VALUE_LIMIT: usize = 64;
/// Every key opens with a two-character base-36 sequence index.
pub const INDEX_WIDTH: usize = 2;
/// Highest addressable slot index (`zz`).
pub const MAX_INDEX: usize = 36 * 36 - 1;

const INDEX_ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// One ledger name/value entry.  Slots are meaningful only as an ordered
/// sequence; the index prefix in the key is a sanity aid, not a pointer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub key: String,
    #[serde(with = "hex_value")]
    pub value: Vec<u8>,
}

impl Slot {
    /// Total width this slot occupies on the ledger.
    pub fn width(&self) -> usize {
        self.key.len() + self.value.len()
    }
}

/// Render a slot index as two base-36 characters, or `None` past `zz`.
pub fn encode_index(index: usize) -> Option<String> {
    if index > MAX_INDEX {
        return None;
    }
    let mut out = String::with_capacity(INDEX_WIDTH);
    out.push(INDEX_ALPHABET[index / 36] as char);
    out.push(INDEX_ALPHABET[index % 36] as char);
    Some(out)
}

/// Slot values are raw bytes; the JSON manifest carries them hex-encoded.
mod hex_value {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        hex::decode(&text).map_err(serde::de::Error::custom)
    }
}
