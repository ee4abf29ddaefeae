//! Known checksums.
//!
//! Object IDs are stored as the SHA-1 of their name, and several row
//! defaults are checksums of fixed names. These vectors pin both.

use icingadb_configsync_core::checksum;

/// An input and its expected checksum.
#[derive(Debug, Clone)]
pub struct ChecksumVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    pub input: &'static str,
    /// Expected checksum (hex).
    pub expected: &'static str,
}

/// Get all checksum vectors.
pub fn all_vectors() -> Vec<ChecksumVector> {
    vec![
        ChecksumVector {
            name: "empty input",
            input: "",
            expected: "da39a3ee5e6b4b0d3255bfef95601890afd80709",
        },
        ChecksumVector {
            name: "abc",
            input: "abc",
            expected: "a9993e364706816aba3e25717850c26c9cd0d89d",
        },
        ChecksumVector {
            name: "default environment",
            input: "default",
            expected: "7505d64a54e061b7acd54ccd58b49dc43500b635",
        },
        ChecksumVector {
            name: "default check period",
            input: "check_period",
            expected: "39553d5c9ed6dcfcfad6392c1bb44833686affd8",
        },
        ChecksumVector {
            name: "host h1",
            input: "h1",
            expected: "ac4ae97285c19b13201deb9b192d921316db3447",
        },
        ChecksumVector {
            name: "host h2",
            input: "h2",
            expected: "bf1c365741a4bfb5fee5c3150335ab4f867a4d9a",
        },
        ChecksumVector {
            name: "host h3",
            input: "h3",
            expected: "8dbc6058e03353809813416c6830708abaf9d223",
        },
        ChecksumVector {
            name: "host h4",
            input: "h4",
            expected: "4f92c044d819a16c426f859755d06090e1903b42",
        },
    ]
}

/// Check every vector. Returns `(name, passed, actual)` per vector.
pub fn verify_all_vectors() -> Vec<(String, bool, String)> {
    all_vectors()
        .into_iter()
        .map(|vector| {
            let actual = checksum(vector.input).to_hex();
            (vector.name.to_string(), actual == vector.expected, actual)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use icingadb_configsync_core::decode_checksum;

    #[test]
    fn test_all_vectors_pass() {
        for (name, passed, actual) in verify_all_vectors() {
            assert!(passed, "vector '{}' failed: got {}", name, actual);
        }
    }

    #[test]
    fn test_vectors_decode() {
        for vector in all_vectors() {
            let decoded = decode_checksum(vector.expected).unwrap();
            assert_eq!(decoded, checksum(vector.input), "{}", vector.name);
        }
    }
}
