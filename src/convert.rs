//! # Byte Converters
//!
//! Codecs between domain types and the raw byte sequences stored in the
//! index. Converters are assumed deterministic; when an index relies on
//! ordering semantics (range queries, sorted duplicates), the encoding must
//! also be order-preserving with respect to the configured [`ByteOrder`].
//!
//! The bundled converters follow the big-endian convention used by
//! byte-comparable key encodings: a `u64` encoded big-endian compares under
//! memcmp exactly as the integer compares, so [`U64Converter`] composes with
//! [`crate::order::LexicalOrder`] without a custom comparator.
//!
//! [`ByteOrder`]: crate::order::ByteOrder

use std::sync::Arc;

use eyre::{ensure, Result};

/// Encodes and decodes one domain type.
pub trait ByteConverter<T>: Send + Sync {
    fn to_bytes(&self, value: &T) -> Vec<u8>;
    fn from_bytes(&self, raw: &[u8]) -> Result<T>;
}

/// Shared handle to a converter.
pub type ConverterRef<T> = Arc<dyn ByteConverter<T>>;

/// Identity converter for raw byte payloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct BytesConverter;

impl ByteConverter<Vec<u8>> for BytesConverter {
    fn to_bytes(&self, value: &Vec<u8>) -> Vec<u8> {
        value.clone()
    }

    fn from_bytes(&self, raw: &[u8]) -> Result<Vec<u8>> {
        Ok(raw.to_vec())
    }
}

/// Big-endian `u64` converter. Order-preserving under lexicographic
/// comparison of the encoded bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct U64Converter;

impl ByteConverter<u64> for U64Converter {
    fn to_bytes(&self, value: &u64) -> Vec<u8> {
        value.to_be_bytes().to_vec()
    }

    fn from_bytes(&self, raw: &[u8]) -> Result<u64> {
        ensure!(raw.len() == 8, "expected 8 bytes for u64 key, got {}", raw.len());
        let mut buf = [0u8; 8];
        buf.copy_from_slice(raw);
        Ok(u64::from_be_bytes(buf))
    }
}

/// UTF-8 string converter. Order-preserving: UTF-8 byte order equals
/// code-point order.
#[derive(Debug, Clone, Copy, Default)]
pub struct Utf8Converter;

impl ByteConverter<String> for Utf8Converter {
    fn to_bytes(&self, value: &String) -> Vec<u8> {
        value.as_bytes().to_vec()
    }

    fn from_bytes(&self, raw: &[u8]) -> Result<String> {
        Ok(std::str::from_utf8(raw)?.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn u64_encoding_is_order_preserving() {
        let conv = U64Converter;
        let pairs = [(0u64, 1u64), (1, 255), (255, 256), (u64::MAX - 1, u64::MAX)];
        for (lo, hi) in pairs {
            assert!(conv.to_bytes(&lo) < conv.to_bytes(&hi), "{lo} !< {hi}");
        }
    }

    #[test]
    fn u64_rejects_wrong_width() {
        assert!(U64Converter.from_bytes(&[1, 2, 3]).is_err());
    }

    #[test]
    fn utf8_round_trips() {
        let conv = Utf8Converter;
        let s = "grüße".to_owned();
        assert_eq!(conv.from_bytes(&conv.to_bytes(&s)).unwrap(), s);
    }
}
