//! Pull-based facts recomputation.
//!
//! Derives a roster's true totals purely from the underlying fighter and
//! assignment records, with no dependency on the ledger. This is the path
//! of last resort and of first use: object creation, cloning, explicit
//! resync, and every read whose caches cannot be trusted land here.
//!
//! Credits are not derived from the fighter tree -- the roster's persisted
//! credit balance is authoritative and is read straight through.
//!
//! # Ordering
//!
//! A newly created child fighter must have its `linked_parent` set
//! *before* recomputation runs, or its base cost is erroneously included.
//! Callers sequence: create fighter, attach the child link, recompute.

use underhive_types::{EquipmentAssignment, Fighter, Roster, Totals};

use crate::cost::fighter_cost;
use crate::LedgerError;

/// Derive a roster's totals from scratch.
///
/// Partitions the roster's non-archived fighters into stash and active
/// sets, sums each side's cost contributions, and reads the credit balance
/// off the roster. Pure and idempotent: two calls with no intervening
/// mutation return identical totals.
///
/// # Errors
///
/// Returns [`LedgerError::Overflow`] if any cost sum is not representable.
pub fn recompute(
    roster: &Roster,
    fighters: &[Fighter],
    assignments: &[EquipmentAssignment],
) -> Result<Totals, LedgerError> {
    let mut rating: i64 = 0;
    let mut stash: i64 = 0;

    for fighter in fighters
        .iter()
        .filter(|f| f.roster == roster.id && !f.archived)
    {
        let cost = fighter_cost(fighter, assignments)?;
        if fighter.is_stash {
            stash = stash.checked_add(cost).ok_or(LedgerError::Overflow {
                quantity: "stash",
                before: stash,
                delta: cost,
            })?;
        } else {
            rating = rating.checked_add(cost).ok_or(LedgerError::Overflow {
                quantity: "rating",
                before: rating,
                delta: cost,
            })?;
        }
    }

    Ok(Totals::new(rating, stash, roster.credits_current))
}

/// Derive totals and write them back, clearing the dirty flag.
///
/// The only transition from `Dirty` back to `Fresh`. Idempotent: a second
/// call with no intervening mutation leaves the roster unchanged.
///
/// This does not touch the ledger; use
/// [`Engine::resync`](crate::Engine::resync) when the correction itself
/// should be recorded as an action.
///
/// # Errors
///
/// Returns [`LedgerError::Overflow`] if any cost sum is not representable;
/// the roster is left unmodified in that case.
pub fn recompute_persist(
    roster: &mut Roster,
    fighters: &[Fighter],
    assignments: &[EquipmentAssignment],
) -> Result<Totals, LedgerError> {
    let totals = recompute(roster, fighters, assignments)?;

    roster.rating_current = totals.rating;
    roster.stash_current = totals.stash;
    roster.dirty = false;

    tracing::debug!(
        roster = %roster.id,
        rating = totals.rating,
        stash = totals.stash,
        "recomputed roster totals"
    );

    Ok(totals)
}

#[cfg(test)]
mod tests {
    use underhive_types::{EquipmentId, FighterState, UserId};

    use super::*;

    fn roster() -> Roster {
        Roster::new(UserId::new(), "Sump Dogs", None)
    }

    #[test]
    fn empty_roster_totals_are_credits_only() {
        let mut r = roster();
        r.credits_current = 1000;
        let totals = recompute(&r, &[], &[]);
        assert_eq!(totals.ok(), Some(Totals::new(0, 0, 1000)));
    }

    #[test]
    fn active_and_stash_fighters_partition() {
        let r = roster();
        let ganger = Fighter::new(r.id, "Scrag", 115);
        let stash = Fighter::new(r.id, "Stash", 30).as_stash();

        let totals = recompute(&r, &[ganger, stash], &[]);
        assert_eq!(totals.ok(), Some(Totals::new(115, 30, 0)));
    }

    #[test]
    fn equipment_counts_toward_owning_fighter() {
        let r = roster();
        let ganger = Fighter::new(r.id, "Scrag", 115);
        let gear = EquipmentAssignment::new(ganger.id, EquipmentId::new(), 25);

        let totals = recompute(&r, &[ganger], &[gear]);
        assert_eq!(totals.ok(), Some(Totals::new(140, 0, 0)));
    }

    #[test]
    fn archived_and_foreign_fighters_are_excluded() {
        let r = roster();
        let mut archived = Fighter::new(r.id, "Gone", 100);
        archived.archived = true;
        let foreign = Fighter::new(underhive_types::RosterId::new(), "Other", 200);

        let totals = recompute(&r, &[archived, foreign], &[]);
        assert_eq!(totals.ok(), Some(Totals::new(0, 0, 0)));
    }

    #[test]
    fn captured_fighter_contributes_zero() {
        let r = roster();
        let mut captured = Fighter::new(r.id, "Scrag", 115);
        captured.state = FighterState::Captured;

        let totals = recompute(&r, &[captured], &[]);
        assert_eq!(totals.ok(), Some(Totals::new(0, 0, 0)));
    }

    #[test]
    fn recompute_is_idempotent() {
        let r = roster();
        let fighters = vec![
            Fighter::new(r.id, "Scrag", 115),
            Fighter::new(r.id, "Stash", 30).as_stash(),
        ];

        let first = recompute(&r, &fighters, &[]);
        let second = recompute(&r, &fighters, &[]);
        assert!(first.is_ok());
        assert_eq!(first.ok(), second.ok());
    }

    #[test]
    fn persist_writes_caches_and_clears_dirty() {
        let mut r = roster();
        assert!(r.dirty);
        let fighters = vec![Fighter::new(r.id, "Scrag", 115)];

        let totals = recompute_persist(&mut r, &fighters, &[]);
        assert_eq!(totals.ok(), Some(Totals::new(115, 0, 0)));
        assert_eq!(r.rating_current, 115);
        assert_eq!(r.stash_current, 0);
        assert!(!r.dirty);
    }

    #[test]
    fn persist_is_idempotent() {
        let mut r = roster();
        let fighters = vec![Fighter::new(r.id, "Scrag", 115)];

        let first = recompute_persist(&mut r, &fighters, &[]);
        let snapshot = r.clone();
        let second = recompute_persist(&mut r, &fighters, &[]);

        assert_eq!(first.ok(), second.ok());
        assert_eq!(r, snapshot);
    }

    #[test]
    fn persist_does_not_touch_credits() {
        let mut r = roster();
        r.credits_current = 700;
        let totals = recompute_persist(&mut r, &[], &[]);
        assert_eq!(totals.ok(), Some(Totals::new(0, 0, 700)));
        assert_eq!(r.credits_current, 700);
    }
}
