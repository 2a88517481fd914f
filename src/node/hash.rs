//! Structural content hashing of node trees.
//!
//! The hash covers a node's kind and its child fields, recursively.
//! Identities and attribute fields are ignored, so two independently built
//! trees with the same structure hash the same.

use super::value::Value;
use super::Node;

const HASH_VERSION: u8 = 1;

// Tags keep differently-shaped values from colliding.
const TAG_NONE: u8 = 0;
const TAG_BOOL: u8 = 1;
const TAG_INT: u8 = 2;
const TAG_FLOAT: u8 = 3;
const TAG_STR: u8 = 4;
const TAG_BYTES: u8 = 5;
const TAG_ENUM: u8 = 6;
const TAG_SYMBOL: u8 = 7;
const TAG_REF: u8 = 8;
const TAG_NODE: u8 = 9;
const TAG_LIST: u8 = 10;
const TAG_SET: u8 = 11;
const TAG_MAP: u8 = 12;

// ─── Content Hash ──────────────────────────────────────────────────

/// Number of hex digits shown by `Display`.
const SHORT_HEX: usize = 12;

/// BLAKE3 digest of a tree's structure.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContentHash(pub [u8; 32]);

impl ContentHash {
    pub fn to_hex(&self) -> String {
        blake3::Hash::from_bytes(self.0).to_hex().to_string()
    }

    /// Parse the 64-digit form produced by [`ContentHash::to_hex`].
    pub fn from_hex(hex: &str) -> Option<ContentHash> {
        blake3::Hash::from_hex(hex)
            .ok()
            .map(|h| ContentHash(*h.as_bytes()))
    }

    /// Leading hex digits, enough to tell trees apart in logs.
    pub fn short(&self) -> String {
        let mut hex = self.to_hex();
        hex.truncate(SHORT_HEX);
        hex
    }
}

impl std::fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ContentHash").field(&self.to_hex()).finish()
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.short())
    }
}

// ─── Hashing ──────────────────────────────────────────────────────

pub(crate) fn hash_node(node: &Node) -> ContentHash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&[HASH_VERSION]);
    write_node(&mut hasher, node);
    ContentHash(*hasher.finalize().as_bytes())
}

fn write_str(hasher: &mut blake3::Hasher, s: &str) {
    hasher.update(&(s.len() as u64).to_le_bytes());
    hasher.update(s.as_bytes());
}

fn write_node(hasher: &mut blake3::Hasher, node: &Node) {
    write_str(hasher, node.kind());
    for (name, value) in node.iter_children() {
        write_str(hasher, name);
        write_value(hasher, value);
    }
}

fn write_value(hasher: &mut blake3::Hasher, value: &Value) {
    match value {
        Value::None => {
            hasher.update(&[TAG_NONE]);
        }
        Value::Bool(b) => {
            hasher.update(&[TAG_BOOL, *b as u8]);
        }
        Value::Int(i) => {
            hasher.update(&[TAG_INT]);
            hasher.update(&i.to_le_bytes());
        }
        Value::Float(x) => {
            hasher.update(&[TAG_FLOAT]);
            hasher.update(&x.to_bits().to_le_bytes());
        }
        Value::Str(s) => {
            hasher.update(&[TAG_STR]);
            write_str(hasher, s);
        }
        Value::Bytes(b) => {
            hasher.update(&[TAG_BYTES]);
            hasher.update(&(b.len() as u64).to_le_bytes());
            hasher.update(b);
        }
        Value::Enum(e) => {
            hasher.update(&[TAG_ENUM]);
            write_str(hasher, &e.enum_name);
            write_str(hasher, &e.variant);
        }
        Value::Symbol(s) => {
            hasher.update(&[TAG_SYMBOL]);
            write_str(hasher, s.as_str());
        }
        Value::Ref(r) => {
            hasher.update(&[TAG_REF]);
            write_str(hasher, r.as_str());
        }
        Value::Node(n) => {
            hasher.update(&[TAG_NODE]);
            write_node(hasher, n);
        }
        Value::List(items) => {
            hasher.update(&[TAG_LIST]);
            hasher.update(&(items.len() as u64).to_le_bytes());
            for item in items {
                write_value(hasher, item);
            }
        }
        Value::Set(items) => {
            // Sets are unordered: combine member hashes in sorted order.
            let mut members: Vec<[u8; 32]> = items
                .iter()
                .map(|item| {
                    let mut h = blake3::Hasher::new();
                    write_value(&mut h, item);
                    *h.finalize().as_bytes()
                })
                .collect();
            members.sort();
            hasher.update(&[TAG_SET]);
            hasher.update(&(members.len() as u64).to_le_bytes());
            for m in &members {
                hasher.update(m);
            }
        }
        Value::Map(entries) => {
            hasher.update(&[TAG_MAP]);
            hasher.update(&(entries.len() as u64).to_le_bytes());
            for (k, v) in entries {
                write_str(hasher, k);
                write_value(hasher, v);
            }
        }
    }
}
