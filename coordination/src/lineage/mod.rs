//! Agent lineage: hash-chained identifiers and their information content.
//!
//! Every run is seeded by a genesis digest. Each agent derives its own
//! origin from the genesis and a nonce, then advances it once per round:
//!
//! ```text
//! genesis   = H("GENESIS" ‖ time ‖ context)
//! origin_0  = H(genesis ‖ agent_id ‖ nonce)
//! origin_r+1 = H(origin_r ‖ genesis ‖ r)
//! ```
//!
//! The chain only moves forward; an origin can be recomputed from its
//! predecessor, the genesis and the round index alone.

pub mod entropy;
pub mod hash_chain;

pub use entropy::{round3, shannon_entropy};
pub use hash_chain::{
    advance_origin, agent_origin, digest, genesis_hash, Clock, FixedClock, HashDigest,
    NonceSource, OsNonce, SeededNonce, SystemClock,
};
