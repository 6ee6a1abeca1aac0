//! Eviction policies.
//!
//! | Policy | Victim                                         | Expiry          |
//! |--------|------------------------------------------------|-----------------|
//! | LFU    | lowest use count, then earliest access         | per-entry TTL   |
//! | LRU    | least recently put or taken                    | none            |

pub mod lfu;
pub mod lru;
