//! Cache key derivation
//!
//! Keys have the form `{prefix}:{operation}:{hash16}`, where `hash16` is the
//! first 16 hex characters of a SHA-256 digest over the canonical JSON text
//! of the sorted parameter pairs. Truncating to 64 bits leaves a collision
//! risk that is negligible for cache-sized keyspaces and is accepted.

use crate::errors::CacheError;
use crate::params::CacheParams;
use serde::Serialize;
use serde_json::ser::Formatter;
use sha2::{Digest, Sha256};
use std::io;

const HASH_LEN_BYTES: usize = 8;

/// Derives namespaced cache keys from an operation name and its parameters
#[derive(Debug, Clone)]
pub struct KeyDeriver {
    prefix: String,
}

impl KeyDeriver {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Glob pattern matching every key this deriver can produce, and no others.
    ///
    /// Glob metacharacters in the prefix are escaped, so `a?b` only ever matches
    /// `a?b:...` and never a neighbour such as `axb:...`.
    pub fn pattern(&self) -> String {
        format!("{}:*", escape_glob(&self.prefix))
    }

    /// Build the key for `operation` with `params`
    pub fn derive(&self, operation: &str, params: &CacheParams) -> Result<String, CacheError> {
        if operation.is_empty() {
            return Err(CacheError::InvalidKey(
                "operation name cannot be empty".to_string(),
            ));
        }

        let canonical = canonical_params(params)?;
        let digest = Sha256::digest(canonical.as_bytes());

        Ok(format!(
            "{}:{}:{}",
            self.prefix,
            operation,
            hex::encode(&digest[..HASH_LEN_BYTES])
        ))
    }
}

/// Backslash-escape the characters Redis `MATCH` treats specially
pub fn escape_glob(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Encode the sorted pairs as `[["name", "value"], ...]`.
///
/// The layout (`", "` separators, ASCII-only output) matches the keys already
/// written by earlier deployments, so existing entries stay addressable.
pub fn canonical_params(params: &CacheParams) -> Result<String, CacheError> {
    let pairs: Vec<(&str, &str)> = params.iter().collect();

    let mut buf = Vec::with_capacity(64);
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, CanonicalFormatter);
    pairs
        .serialize(&mut serializer)
        .map_err(CacheError::Encode)?;

    // The formatter only ever emits ASCII.
    String::from_utf8(buf).map_err(|e| CacheError::InvalidKey(e.to_string()))
}

struct CanonicalFormatter;

impl Formatter for CanonicalFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if fragment.bytes().all(|b| (b' '..=b'~').contains(&b)) {
            return writer.write_all(fragment.as_bytes());
        }

        let mut units = [0u16; 2];
        for ch in fragment.chars() {
            if (' '..='~').contains(&ch) {
                let mut utf8 = [0u8; 1];
                writer.write_all(ch.encode_utf8(&mut utf8).as_bytes())?;
            } else {
                for unit in ch.encode_utf16(&mut units) {
                    write!(writer, "\\u{:04x}", unit)?;
                }
            }
        }
        Ok(())
    }
}
