//! Block keys and key generation.

use std::collections::HashSet;
use std::fmt;

use rand::{rngs::OsRng, Rng, RngCore, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;
use serde::{Deserialize, Serialize};

/// Opaque identifier of a block within a [`BlockMap`](crate::BlockMap).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockKey(String);

impl BlockKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BlockKey {
    fn from(key: &str) -> Self {
        Self(key.to_owned())
    }
}

impl From<String> for BlockKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

/// Source of fresh block keys.
///
/// Implementations must return values that are unique with overwhelming
/// probability within a single document; collision handling against keys
/// produced elsewhere is the caller's concern.
pub trait KeyGenerator {
    fn generate_key(&mut self) -> BlockKey;
}

const KEY_BITS: u32 = 24;
const KEY_ALPHABET: &[u8; 32] = b"0123456789abcdefghijklmnopqrstuv";

/// Random short-key generator.
///
/// Draws 24-bit integers rendered base-32 and never repeats a key it has
/// already handed out. Seeded from `OsRng` by default; [`from_seed`] gives
/// a reproducible stream.
///
/// [`from_seed`]: RandomKeyGenerator::from_seed
pub struct RandomKeyGenerator {
    rng: Xoshiro256StarStar,
    seen: HashSet<BlockKey>,
}

impl RandomKeyGenerator {
    pub fn new() -> Self {
        let mut seed = [0u8; 32];
        OsRng.fill_bytes(&mut seed);
        Self::from_seed(seed)
    }

    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self {
            rng: Xoshiro256StarStar::from_seed(seed),
            seen: HashSet::new(),
        }
    }
}

impl Default for RandomKeyGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyGenerator for RandomKeyGenerator {
    fn generate_key(&mut self) -> BlockKey {
        loop {
            let n: u32 = self.rng.gen_range(0..1u32 << KEY_BITS);
            let key = BlockKey(to_base32(n));
            if self.seen.insert(key.clone()) {
                return key;
            }
        }
    }
}

fn to_base32(mut n: u32) -> String {
    let mut digits = [0u8; 5];
    let mut start = digits.len();
    loop {
        start -= 1;
        digits[start] = KEY_ALPHABET[(n % 32) as usize];
        n /= 32;
        if n == 0 {
            break;
        }
    }
    // the alphabet is ASCII
    String::from_utf8_lossy(&digits[start..]).into_owned()
}

/// Deterministic `prefix0, prefix1, …` generator for tests and examples.
pub struct SequentialKeyGenerator {
    prefix: String,
    next: u64,
}

impl SequentialKeyGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: 0,
        }
    }
}

impl KeyGenerator for SequentialKeyGenerator {
    fn generate_key(&mut self) -> BlockKey {
        let key = BlockKey(format!("{}{}", self.prefix, self.next));
        self.next += 1;
        key
    }
}
