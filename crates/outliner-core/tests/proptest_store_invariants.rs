//! Property-based invariant tests for the identity store.
//!
//! 1. Within one generation, no two claims return the same record.
//! 2. Replaying the same claim sequence in the next generation returns the
//!    same records, in the same order.
//! 3. A record is never removed by the sweep that directly follows the
//!    generation in which it was last claimed.
//! 4. After any sweep, every surviving record is reachable through the index.

use std::collections::HashSet;

use outliner_core::{DomainId, IdentityStore, RecordKey, SweepOutcome, TypeTag};
use proptest::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────────

fn keys(max_len: usize) -> impl Strategy<Value = Vec<RecordKey>> {
    proptest::collection::vec((0u64..12, 0i16..3, any::<bool>()), 1..=max_len).prop_map(
        |raw| {
            raw.into_iter()
                .map(|(id, index, sub)| {
                    let tag = if sub { TypeTag::Modifier } else { TypeTag::Id };
                    RecordKey::new(tag, index, Some(DomainId::from_raw(id)))
                })
                .collect()
        },
    )
}

fn rebuild(store: &mut IdentityStore, keys: &[RecordKey]) -> (SweepOutcome, Vec<outliner_core::RecordRef>) {
    let outcome = store.sweep_unused();
    store.reset_marks();
    let claimed = keys.iter().map(|k| store.claim_or_create(*k)).collect();
    (outcome, claimed)
}

// ═════════════════════════════════════════════════════════════════════════
// 1 + 2. Distinct claims, stable replay
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn claims_are_distinct_and_replay_stably(seq in keys(64)) {
        let mut store = IdentityStore::new();
        let (_, first) = rebuild(&mut store, &seq);

        let unique: HashSet<_> = first.iter().copied().collect();
        prop_assert_eq!(unique.len(), first.len());

        let (outcome, second) = rebuild(&mut store, &seq);
        prop_assert!(matches!(outcome, SweepOutcome::Untouched));
        prop_assert_eq!(first, second);
        prop_assert_eq!(store.len(), seq.len());
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Grace period
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn records_survive_one_unused_generation(a in keys(32), b in keys(32)) {
        let mut store = IdentityStore::new();
        rebuild(&mut store, &a);
        // Generation 2 shows `b` only; everything from `a` is still present.
        let (outcome, _) = rebuild(&mut store, &b);
        prop_assert_eq!(outcome.removed(), 0);
        for key in &a {
            prop_assert!(store.lookup(key).next().is_some());
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Index consistency after sweeps
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn survivors_remain_indexed(rounds in proptest::collection::vec(keys(24), 1..6)) {
        let mut store = IdentityStore::new();
        for round in &rounds {
            rebuild(&mut store, round);
        }
        store.sweep_unused();
        let live: Vec<_> = store.iter().map(|(r, rec)| (r, *rec.key())).collect();
        prop_assert_eq!(live.len(), store.len());
        for (handle, key) in live {
            prop_assert!(store.lookup(&key).any(|r| r == handle));
        }
    }
}
