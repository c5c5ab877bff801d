use chrono::Utc;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{LazyLock, Mutex};

/// Crockford base32 alphabet, excludes I, L, O and U.
const ENCODING: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

const TIMESTAMP_BITS: u32 = 48;
const ENTROPY_BITS: u32 = 80;
const ENCODED_LEN: usize = 26;

struct GeneratorState {
    last_millis: u64,
    last_entropy: u128,
}

static GENERATOR: LazyLock<Mutex<GeneratorState>> = LazyLock::new(|| {
    Mutex::new(GeneratorState {
        last_millis: 0,
        last_entropy: 0,
    })
});

/// Identifier for locally authored records. Doubles as the idempotency key of
/// the mutation that carries the record to the remote endpoint.
///
/// Generated ids are 26-character Crockford base32 strings laid out as a
/// 48-bit millisecond timestamp followed by 80 bits of entropy, so ids
/// produced later in the same process always sort lexicographically after
/// earlier ones. Ids assigned by the server for pulled records are accepted
/// as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(value: String) -> Result<Self, String> {
        if value.trim().is_empty() {
            return Err("Record id cannot be empty".to_string());
        }
        Ok(Self(value))
    }

    pub fn generate() -> Self {
        let millis = Utc::now().timestamp_millis().max(0) as u64;
        let mut state = GENERATOR.lock().expect("id generator lock poisoned");

        let (millis, entropy) = if millis <= state.last_millis {
            // Same (or rewound) clock tick: bump the previous entropy so the
            // new id still sorts after the last one.
            (state.last_millis, state.last_entropy.wrapping_add(1))
        } else {
            (millis, random_entropy())
        };

        state.last_millis = millis;
        state.last_entropy = entropy;

        let value = ((millis as u128) << ENTROPY_BITS) | entropy;
        Self(encode(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<RecordId> for String {
    fn from(value: RecordId) -> Self {
        value.0
    }
}

fn random_entropy() -> u128 {
    let mut rng = rand::thread_rng();
    let high = rng.next_u64() as u128;
    let low = rng.next_u64() as u128;
    ((high << 64) | low) & ((1u128 << ENTROPY_BITS) - 1)
}

fn encode(value: u128) -> String {
    debug_assert!(TIMESTAMP_BITS + ENTROPY_BITS == 128);
    let mut out = [0u8; ENCODED_LEN];
    for (i, slot) in out.iter_mut().enumerate() {
        let shift = 5 * (ENCODED_LEN - 1 - i) as u32;
        let index = ((value >> shift) & 0x1F) as usize;
        *slot = ENCODING[index];
    }
    String::from_utf8(out.to_vec()).expect("base32 output is always ASCII")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generated_ids_have_fixed_length() {
        let id = RecordId::generate();
        assert_eq!(id.as_str().len(), ENCODED_LEN);
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let mut seen = HashSet::new();
        for _ in 0..1_000 {
            assert!(seen.insert(RecordId::generate()));
        }
    }

    #[test]
    fn test_later_ids_sort_after_earlier_ones() {
        let mut previous = RecordId::generate();
        for _ in 0..1_000 {
            let next = RecordId::generate();
            assert!(next.as_str() > previous.as_str());
            previous = next;
        }
    }

    #[test]
    fn test_empty_id_rejected() {
        assert!(RecordId::new("  ".to_string()).is_err());
        assert!(RecordId::new("wo-1042".to_string()).is_ok());
    }
}
