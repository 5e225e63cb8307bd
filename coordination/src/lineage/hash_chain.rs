//! SHA-256 hash chain for run and agent lineage.

use std::fmt;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rand::rngs::{OsRng, StdRng};
use rand::{RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Fixed prefix mixed into every genesis digest.
const GENESIS_PREFIX: &str = "GENESIS";

/// Lower-case hex SHA-256 digest (64 characters).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HashDigest(String);

impl HashDigest {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First `len` hex characters, used in log lines and candidate headers.
    pub fn short(&self, len: usize) -> &str {
        self.0.get(..len).unwrap_or(&self.0)
    }
}

impl fmt::Display for HashDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for HashDigest {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Hash arbitrary bytes.
pub fn digest(bytes: impl AsRef<[u8]>) -> HashDigest {
    HashDigest(hex::encode(Sha256::digest(bytes.as_ref())))
}

/// Run-level seed: `H("GENESIS" ‖ timestamp ‖ context)`.
pub fn genesis_hash(timestamp: &str, context: &str) -> HashDigest {
    digest(format!("{GENESIS_PREFIX}{timestamp}{context}"))
}

/// Initial origin of an agent: `H(genesis ‖ agent_id ‖ nonce)`.
pub fn agent_origin(genesis: &HashDigest, agent_id: &str, nonce: u64) -> HashDigest {
    digest(format!("{genesis}{agent_id}{nonce}"))
}

/// Next link of an agent's chain: `H(origin ‖ genesis ‖ round)`.
pub fn advance_origin(origin: &HashDigest, genesis: &HashDigest, round: u32) -> HashDigest {
    digest(format!("{origin}{genesis}{round}"))
}

/// Time source for the genesis timestamp.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// UNIX seconds with a six-digit fractional part, e.g. `1718000000.123456`.
    fn timestamp(&self) -> String {
        let now = self.now();
        format!("{}.{:06}", now.timestamp(), now.timestamp_subsec_micros())
    }
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Source of the per-agent nonce mixed into `origin_0`.
pub trait NonceSource: Send + Sync {
    fn next_nonce(&self) -> u64;
}

/// Operating-system randomness.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsNonce;

impl NonceSource for OsNonce {
    fn next_nonce(&self) -> u64 {
        OsRng.next_u64()
    }
}

/// Reproducible nonce stream from a fixed seed.
pub struct SeededNonce {
    rng: Mutex<StdRng>,
}

impl SeededNonce {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl NonceSource for SeededNonce {
    fn next_nonce(&self) -> u64 {
        self.rng
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .next_u64()
    }
}
