//! Dirty-flag bookkeeping: deciding when cached totals can be trusted.
//!
//! Each roster is a two-state machine. `Fresh` means the cached fields
//! were produced by a persisting recompute or an unbroken run of applied
//! actions since one; `Dirty` means something happened that the
//! incremental path could not account for. Transitions:
//!
//! ```text
//! Fresh -> Dirty   mark_dirty (any event the propagation guard rejects)
//! Dirty -> Fresh   recompute_persist only
//! ```
//!
//! Application code reads totals exclusively through
//! [`facts_with_fallback`], which hides the choice between the cached
//! fast path and the full-tree walk.

use underhive_types::{EquipmentAssignment, Fighter, Roster, Totals};

use crate::recompute::recompute;
use crate::LedgerError;

/// Return the cached totals if they are trustworthy.
///
/// Trustworthy means the dirty flag is clear *and* the roster has ledger
/// history backing the caches. Returns `None` otherwise, signaling the
/// caller to fall back to a recompute.
pub const fn facts(roster: &Roster) -> Option<Totals> {
    if roster.dirty || roster.latest_action.is_none() {
        return None;
    }
    Some(roster.cached_totals())
}

/// Return trustworthy totals, recomputing when the caches cannot be used.
///
/// The single safe read API: always produces a result, trading a possible
/// full-tree walk for correctness. The fallback recompute does not
/// persist -- the roster stays dirty until something runs
/// [`recompute_persist`](crate::recompute_persist).
///
/// # Errors
///
/// Returns [`LedgerError::Overflow`] if the fallback recompute overflows.
pub fn facts_with_fallback(
    roster: &Roster,
    fighters: &[Fighter],
    assignments: &[EquipmentAssignment],
) -> Result<Totals, LedgerError> {
    if let Some(totals) = facts(roster) {
        return Ok(totals);
    }
    tracing::debug!(roster = %roster.id, "facts fallback: recomputing");
    recompute(roster, fighters, assignments)
}

/// Mark a roster's caches untrustworthy.
///
/// The `Fresh -> Dirty` transition. Called when a mutation bypasses the
/// propagation path (guard rejection handled out-of-band, bulk edits,
/// content updates touching base costs).
pub fn mark_dirty(roster: &mut Roster) {
    if !roster.dirty {
        tracing::debug!(roster = %roster.id, "marking roster dirty");
    }
    roster.dirty = true;
}

/// Compare cached totals against a fresh recompute.
///
/// Diagnostics only -- never on a hot path. Returns `true` when the two
/// subsystems agree. A `false` here means drift crept in between the
/// incremental and the pull path and the roster needs a resync.
///
/// # Errors
///
/// Returns [`LedgerError::Overflow`] if the recompute overflows.
pub fn debug_consistency_check(
    roster: &Roster,
    fighters: &[Fighter],
    assignments: &[EquipmentAssignment],
) -> Result<bool, LedgerError> {
    let fresh = recompute(roster, fighters, assignments)?;
    let cached = roster.cached_totals();
    let consistent = fresh == cached;
    if !consistent {
        tracing::warn!(
            roster = %roster.id,
            cached_rating = cached.rating,
            fresh_rating = fresh.rating,
            cached_stash = cached.stash,
            fresh_stash = fresh.stash,
            "cached totals drifted from recompute"
        );
    }
    Ok(consistent)
}
