//! Pure cost derivation for fighters and equipment assignments.
//!
//! Both the incremental and the recompute path ultimately rest on the two
//! functions here. They take plain data and return results, with no
//! dependency on the ledger or on storage.
//!
//! The zero-cost rule: a fighter that is the child of an equipment
//! assignment (its cost is absorbed by the parent), or that is captured or
//! sold to the guilders, contributes exactly 0 to every roster total --
//! regardless of its intrinsic base, advancement, and equipment costs.

use underhive_types::{EquipmentAssignment, Fighter, FighterState};

use crate::LedgerError;

/// Report an overflow while summing cost components.
const fn overflow(quantity: &'static str, before: i64, delta: i64) -> LedgerError {
    LedgerError::Overflow {
        quantity,
        before,
        delta,
    }
}

/// Total cost contribution of one equipment assignment.
///
/// Either the manual override, or the sum of base + profile + accessory +
/// upgrade costs -- never both combined.
///
/// # Errors
///
/// Returns [`LedgerError::Overflow`] if the component sum is not
/// representable (component costs are non-negative by database constraint,
/// so this is corruption, not data).
pub const fn assignment_cost(assignment: &EquipmentAssignment) -> Result<i64, LedgerError> {
    if let Some(total) = assignment.total_override {
        return Ok(total);
    }

    let mut total = assignment.base_cost;
    total = match total.checked_add(assignment.profile_cost) {
        Some(v) => v,
        None => return Err(overflow("assignment cost", total, assignment.profile_cost)),
    };
    total = match total.checked_add(assignment.accessory_cost) {
        Some(v) => v,
        None => {
            return Err(overflow(
                "assignment cost",
                total,
                assignment.accessory_cost,
            ));
        }
    };
    match total.checked_add(assignment.upgrade_cost) {
        Some(v) => Ok(v),
        None => Err(overflow("assignment cost", total, assignment.upgrade_cost)),
    }
}

/// Whether the zero-cost rule applies to this fighter.
pub const fn should_have_zero_cost(fighter: &Fighter) -> bool {
    fighter.linked_parent.is_some()
        || matches!(
            fighter.state,
            FighterState::Captured | FighterState::SoldToGuilders
        )
}

/// Total cost contribution of one fighter.
///
/// Zero under the zero-cost rule; otherwise the manual override if set,
/// else `base_cost + advancement_cost + sum(assignment costs)` over the
/// assignments belonging to this fighter. The `assignments` slice may
/// contain other fighters' rows; they are filtered out here.
///
/// # Errors
///
/// Returns [`LedgerError::Overflow`] if the sum is not representable.
pub fn fighter_cost(
    fighter: &Fighter,
    assignments: &[EquipmentAssignment],
) -> Result<i64, LedgerError> {
    if should_have_zero_cost(fighter) {
        return Ok(0);
    }
    if let Some(cost) = fighter.cost_override {
        return Ok(cost);
    }

    let mut total = fighter
        .base_cost
        .checked_add(fighter.advancement_cost)
        .ok_or_else(|| overflow("fighter cost", fighter.base_cost, fighter.advancement_cost))?;

    for assignment in assignments.iter().filter(|a| a.fighter == fighter.id) {
        let cost = assignment_cost(assignment)?;
        total = total
            .checked_add(cost)
            .ok_or_else(|| overflow("fighter cost", total, cost))?;
    }

    Ok(total)
}
