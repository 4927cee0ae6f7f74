//! Two-tier expiration envelope for SWR-aware cache strategies.
//!
//! `CachedValue<T>` wraps a payload with a soft and a hard expiration
//! instant. Between the two the entry is *stale*: still servable, but due
//! for an asynchronous refresh. Freshness is derived from wall-clock time at
//! read time; the derived predicates are never persisted.
//!
//! # Lifecycle
//!
//! ```text
//! written ── now < soft ──→ Fresh ── soft ≤ now < hard ──→ Stale ── hard ≤ now ──→ Expired
//! ```

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};

/// Derived lifecycle state of an envelope at a point in time.
///
/// Exactly one state holds for any `now`; the states become true in
/// declaration order as time advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnvelopeState {
    /// `now < soft_expire_at`: serve without side effects.
    Fresh,
    /// `soft_expire_at ≤ now < hard_expire_at`: serve, refresh asynchronously.
    Stale,
    /// `hard_expire_at ≤ now`: must not be served.
    Expired,
}

/// The envelope stored by SWR-aware strategies.
///
/// Immutable once written: a replacement envelope is produced by the next
/// loader invocation, never by mutating this one. Instants serialize as
/// ISO-8601 strings. Unknown fields are ignored on read, so legacy encodings
/// that persisted the derived predicates deserialize cleanly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedValue<T> {
    /// The cached payload.
    pub value: T,
    /// Past this instant the entry is stale and should be revalidated.
    pub soft_expire_at: DateTime<Utc>,
    /// Past this instant the entry must not be returned.
    pub hard_expire_at: DateTime<Utc>,
}

impl<T> CachedValue<T> {
    /// Seal a value into an envelope.
    ///
    /// `total_ttl = base_ttl_seconds + jitter_seconds`, and the soft window
    /// is `floor(total_ttl × soft_ttl_ratio)` seconds. Returns the envelope
    /// together with `total_ttl`, which the caller MUST use as the remote
    /// store TTL so the record vanishes no later than its own
    /// `hard_expire_at`.
    pub fn seal(
        value: T,
        base_ttl_seconds: u64,
        soft_ttl_ratio: f64,
        jitter_seconds: u64,
    ) -> (Self, u64) {
        let total_ttl = base_ttl_seconds + jitter_seconds;
        let soft_ttl = (total_ttl as f64 * soft_ttl_ratio.clamp(0.0, 1.0)).floor() as u64;
        let now = Utc::now();

        let envelope = Self {
            value,
            soft_expire_at: now + ChronoDuration::seconds(soft_ttl as i64),
            hard_expire_at: now + ChronoDuration::seconds(total_ttl as i64),
        };
        (envelope, total_ttl)
    }

    /// Build an envelope with explicit expiration instants.
    ///
    /// Used by seed tooling and tests to fabricate entries at arbitrary
    /// lifecycle positions. The `soft_expire_at ≤ hard_expire_at` invariant
    /// is enforced by clamping.
    pub fn with_expirations(
        value: T,
        soft_expire_at: DateTime<Utc>,
        hard_expire_at: DateTime<Utc>,
    ) -> Self {
        Self {
            value,
            soft_expire_at: soft_expire_at.min(hard_expire_at),
            hard_expire_at,
        }
    }

    /// Evaluate the lifecycle state at `now`.
    pub fn state(&self, now: DateTime<Utc>) -> EnvelopeState {
        if now < self.soft_expire_at {
            EnvelopeState::Fresh
        } else if now < self.hard_expire_at {
            EnvelopeState::Stale
        } else {
            EnvelopeState::Expired
        }
    }

    /// `now < soft_expire_at`.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.state(now) == EnvelopeState::Fresh
    }

    /// `soft_expire_at ≤ now < hard_expire_at`.
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        self.state(now) == EnvelopeState::Stale
    }

    /// `hard_expire_at ≤ now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.state(now) == EnvelopeState::Expired
    }

    /// Consume the envelope and return the payload.
    pub fn into_value(self) -> T {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_seal_splits_ttl() {
        let (envelope, total_ttl) = CachedValue::seal("v".to_string(), 60, 0.8, 10);
        assert_eq!(total_ttl, 70);

        let soft_window = envelope.soft_expire_at - Utc::now();
        let hard_window = envelope.hard_expire_at - Utc::now();
        // floor(70 * 0.8) = 56
        assert!(soft_window <= ChronoDuration::seconds(56));
        assert!(soft_window > ChronoDuration::seconds(54));
        assert!(hard_window <= ChronoDuration::seconds(70));
        assert!(hard_window > ChronoDuration::seconds(68));
    }

    #[test]
    fn test_seal_invariant_soft_le_hard() {
        let (envelope, _) = CachedValue::seal(1u32, 60, 1.0, 0);
        assert!(envelope.soft_expire_at <= envelope.hard_expire_at);

        let (envelope, _) = CachedValue::seal(1u32, 0, 0.5, 0);
        assert!(envelope.soft_expire_at <= envelope.hard_expire_at);
    }

    #[test]
    fn test_state_transitions() {
        let now = Utc::now();
        let envelope = CachedValue::with_expirations(
            "v",
            now + ChronoDuration::seconds(10),
            now + ChronoDuration::seconds(20),
        );

        assert_eq!(envelope.state(now), EnvelopeState::Fresh);
        assert_eq!(
            envelope.state(now + ChronoDuration::seconds(10)),
            EnvelopeState::Stale
        );
        assert_eq!(
            envelope.state(now + ChronoDuration::seconds(15)),
            EnvelopeState::Stale
        );
        assert_eq!(
            envelope.state(now + ChronoDuration::seconds(20)),
            EnvelopeState::Expired
        );
    }

    #[test]
    fn test_with_expirations_clamps_inverted_bounds() {
        let now = Utc::now();
        let envelope = CachedValue::with_expirations(
            "v",
            now + ChronoDuration::seconds(30),
            now + ChronoDuration::seconds(10),
        );
        assert!(envelope.soft_expire_at <= envelope.hard_expire_at);
    }

    #[test]
    fn test_predicates_not_serialized() {
        let (envelope, _) = CachedValue::seal("v".to_string(), 60, 0.8, 0);
        let json = serde_json::to_value(&envelope).expect("envelope serializes");
        let object = json.as_object().expect("envelope is a JSON object");

        assert_eq!(object.len(), 3);
        assert!(object.contains_key("value"));
        assert!(object.contains_key("soft_expire_at"));
        assert!(object.contains_key("hard_expire_at"));
    }

    #[test]
    fn test_instants_serialize_as_iso8601() {
        let (envelope, _) = CachedValue::seal(42u32, 60, 0.8, 0);
        let json = serde_json::to_value(&envelope).expect("envelope serializes");
        let soft = json["soft_expire_at"].as_str().expect("instant is a string");
        assert!(soft.contains('T'), "expected ISO-8601 timestamp, got {soft}");
    }

    #[test]
    fn test_legacy_predicate_fields_ignored() {
        // Some legacy writers persisted the derived predicates; readers must
        // tolerate them.
        let json = r#"{
            "value": "old",
            "soft_expire_at": "2024-01-01T00:00:00Z",
            "hard_expire_at": "2024-01-01T01:00:00Z",
            "fresh": false,
            "stale": true,
            "expired": false
        }"#;
        let envelope: CachedValue<String> =
            serde_json::from_str(json).expect("legacy encoding deserializes");
        assert_eq!(envelope.value, "old");
    }

    proptest! {
        // Exactly one of {fresh, stale, expired} holds at any instant, and
        // the three become true in temporal order.
        #[test]
        fn prop_exactly_one_state(
            base_ttl in 0u64..86_400,
            ratio in 0.0f64..=1.0,
            jitter in 0u64..3_600,
            offset_secs in -1i64..=172_800,
        ) {
            let (envelope, total_ttl) = CachedValue::seal((), base_ttl, ratio, jitter);
            let sealed_at = envelope.hard_expire_at - ChronoDuration::seconds(total_ttl as i64);
            let now = sealed_at + ChronoDuration::seconds(offset_secs);

            let states = [
                envelope.is_fresh(now),
                envelope.is_stale(now),
                envelope.is_expired(now),
            ];
            prop_assert_eq!(states.iter().filter(|held| **held).count(), 1);
        }

        #[test]
        fn prop_states_in_temporal_order(
            base_ttl in 1u64..600,
            ratio in 0.0f64..=1.0,
            jitter in 0u64..60,
        ) {
            let (envelope, total_ttl) = CachedValue::seal((), base_ttl, ratio, jitter);
            let sealed_at = envelope.hard_expire_at - ChronoDuration::seconds(total_ttl as i64);

            let mut last_rank = 0u8;
            for offset in 0..=(total_ttl as i64 + 1) {
                let rank = match envelope.state(sealed_at + ChronoDuration::seconds(offset)) {
                    EnvelopeState::Fresh => 0,
                    EnvelopeState::Stale => 1,
                    EnvelopeState::Expired => 2,
                };
                prop_assert!(rank >= last_rank, "state regressed at offset {}", offset);
                last_rank = rank;
            }
            prop_assert_eq!(last_rank, 2);
        }
    }
}
