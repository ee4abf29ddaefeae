//! Checksum/ID codec.
//!
//! Identifiers and content fingerprints are stored as 20-byte SHA-1 digests.
//! [`checksum`] hashes a natural identifier, [`decode_checksum`] accepts a
//! value that already is a checksum in its 40-character hex form.

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::fmt;

use crate::error::{CoreError, Result};
use crate::value::Value;

/// Storage representation of logical booleans, indexed by the bool as usize.
pub const BOOL_REPR: [&str; 2] = ["n", "y"];

/// A 20-byte SHA-1 checksum.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Checksum(pub [u8; 20]);

impl Checksum {
    /// Create a checksum from raw bytes.
    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Convert to lowercase hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from a 40-character hex string.
    pub fn from_hex(s: &str) -> std::result::Result<Self, hex::FromHexError> {
        let mut arr = [0u8; 20];
        hex::decode_to_slice(s, &mut arr)?;
        Ok(Self(arr))
    }
}

impl fmt::Debug for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Checksum({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..16])
    }
}

impl AsRef<[u8]> for Checksum {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 20]> for Checksum {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for Checksum {
    type Error = CoreError;

    fn try_from(slice: &[u8]) -> Result<Self> {
        let arr: [u8; 20] = slice.try_into().map_err(|_| CoreError::InvalidChecksum {
            value: hex::encode(slice),
            reason: format!("expected 20 bytes, got {}", slice.len()),
        })?;
        Ok(Self(arr))
    }
}

/// Hash a natural identifier into its binary ID.
///
/// Total over strings: the same input always yields the same checksum.
pub fn checksum(value: &str) -> Checksum {
    let digest = Sha1::digest(value.as_bytes());
    let mut arr = [0u8; 20];
    arr.copy_from_slice(&digest);
    Checksum(arr)
}

/// Decode a value that is already expressed as a checksum.
///
/// Only the 40-character hex form is accepted. Anything else is a
/// data-integrity error.
pub fn decode_checksum(value: &str) -> Result<Checksum> {
    if value.len() != 40 {
        return Err(CoreError::InvalidChecksum {
            value: value.to_string(),
            reason: format!("expected 40 hex characters, got {}", value.len()),
        });
    }
    Checksum::from_hex(value).map_err(|e| CoreError::InvalidChecksum {
        value: value.to_string(),
        reason: e.to_string(),
    })
}

/// Map a logical boolean onto the store's `enum('y','n')` representation.
pub fn storage_bool(value: bool) -> Value {
    Value::Text(BOOL_REPR[value as usize].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_checksum_known_digest() {
        // sha1("default")
        assert_eq!(
            checksum("default").to_hex(),
            "7505d64a54e061b7acd54ccd58b49dc43500b635"
        );
    }

    #[test]
    fn test_checksum_distinguishes_inputs() {
        assert_ne!(checksum("h1"), checksum("h3"));
        assert_ne!(checksum(""), checksum(" "));
    }

    #[test]
    fn test_decode_checksum_roundtrip() {
        let sum = checksum("check_period");
        assert_eq!(decode_checksum(&sum.to_hex()).unwrap(), sum);
        assert_eq!(
            decode_checksum(&sum.to_hex().to_uppercase()).unwrap(),
            sum
        );
    }

    #[test]
    fn test_decode_checksum_rejects_garbage() {
        assert!(matches!(
            decode_checksum("h1"),
            Err(CoreError::InvalidChecksum { .. })
        ));
        assert!(decode_checksum(&"zz".repeat(20)).is_err());
        assert!(decode_checksum("").is_err());
    }

    #[test]
    fn test_checksum_from_binary() {
        let sum = checksum("zone");
        assert_eq!(Checksum::try_from(&sum.0[..]).unwrap(), sum);
        assert!(Checksum::try_from(&sum.0[..19]).is_err());
    }

    #[test]
    fn test_storage_bool() {
        assert_eq!(storage_bool(true), Value::Text("y".into()));
        assert_eq!(storage_bool(false), Value::Text("n".into()));
    }

    #[test]
    fn test_checksum_display() {
        let sum = Checksum::from_bytes([0xab; 20]);
        assert_eq!(format!("{}", sum), "abababababababab");
        assert!(format!("{:?}", sum).starts_with("Checksum("));
    }

    proptest! {
        #[test]
        fn checksum_is_deterministic(s in ".*") {
            prop_assert_eq!(checksum(&s), checksum(&s));
        }

        #[test]
        fn checksum_hex_decodes_back(s in ".*") {
            let sum = checksum(&s);
            prop_assert_eq!(decode_checksum(&sum.to_hex()).unwrap(), sum);
        }
    }
}
