//! Cache-stampede mitigation engine.
//!
//! Five composable cache-access strategies share one contract: given a key
//! and a loader, return a value while honoring the strategy's
//! stampede-mitigation guarantees. The strategies sit between request
//! handlers and two external services: a remote key-value store and an
//! opaque, caller-supplied origin loader.
//!
//! # Strategies
//!
//! | Name | Protection |
//! |---|---|
//! | `basic` | None; fixed TTL read-through baseline |
//! | `jitter` | Randomized TTL de-synchronizes mass expirations |
//! | `jitter-swr` | Soft/hard TTL envelope, stale-while-revalidate |
//! | `jitter-lock` | Hard-TTL single flight via a distributed lock |
//! | `full-protection` | SWR plus locked revalidation on every path |
//!
//! # Failure policy
//!
//! The engine is fail-open: remote-store failures read as misses, dropped
//! writes are retried implicitly by the next caller, and an unavailable lock
//! degrades to a direct origin load. Only the loader's own failure surfaces
//! to the caller.

pub mod inflight;
pub mod lock;
pub mod store;
pub mod strategy;

pub use inflight::{RefreshGate, RefreshTicket};
pub use lock::{DistributedLock, LockGuard};
pub use store::{MemoryStore, RedisStore, RedisStoreConfig, RemoteStore};
pub use strategy::{
    BasicStrategy, CacheStrategy, CacheValue, FnLoader, FullProtectionStrategy,
    JitterLockStrategy, JitterStrategy, JitterSwrStrategy, StrategyCore, ValueLoader,
};
