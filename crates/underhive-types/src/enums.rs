//! Enumeration types for the Underhive roster engine.
//!
//! Covers the closed set of ledger action kinds, the fighter lifecycle
//! state, and the tagged subject reference carried on ledger entries.

use serde::{Deserialize, Serialize};

use crate::ids::{AssignmentId, FighterId};

// ---------------------------------------------------------------------------
// Action kinds
// ---------------------------------------------------------------------------

/// The category of change a ledger [`Action`](crate::Action) records.
///
/// One domain event produces exactly one action per affected roster, and
/// every action carries one of these kinds. The set is closed: persistence
/// maps each variant to a database enum string, so adding a variant means
/// adding a migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    // --- Fighter lifecycle ---
    /// A fighter was hired onto the roster.
    HireFighter,
    /// A fighter was cloned onto this roster from another.
    CloneFighter,
    /// A fighter's intrinsic cost changed (override edit, stat bump).
    UpdateFighter,
    /// A fighter was marked captured by an enemy roster.
    CaptureFighter,
    /// A captured fighter was returned to its original roster.
    ReturnFighter,
    /// A captured fighter was sold to the guilders.
    SellFighter,

    // --- Equipment ---
    /// An equipment assignment was added to a fighter.
    AddAssignment,
    /// An equipment assignment was removed from a fighter.
    RemoveAssignment,
    /// An equipment assignment's cost changed in place.
    UpdateAssignment,
    /// Equipment moved between two fighters on the same roster.
    ReassignEquipment,
    /// Equipment was sold off the roster for credits.
    SellEquipment,

    // --- Progression and campaign ---
    /// An advancement was applied to a fighter.
    ApplyAdvancement,
    /// Campaign start budget was credited to the roster.
    CampaignBudget,
    /// Cached totals were rebuilt from scratch by a full recompute.
    Resync,
}

// ---------------------------------------------------------------------------
// Fighter state
// ---------------------------------------------------------------------------

/// Lifecycle state of a fighter with respect to its roster.
///
/// Only `Active` fighters contribute to roster totals. The other states
/// force a zero cost contribution regardless of intrinsic cost.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FighterState {
    /// On the roster and counted toward rating (or stash).
    #[default]
    Active,
    /// Held captive by another roster.
    Captured,
    /// Sold to the guilders by a capturing roster; never returns.
    SoldToGuilders,
}

// ---------------------------------------------------------------------------
// Action subject
// ---------------------------------------------------------------------------

/// The entity a ledger action is about.
///
/// A closed tagged union over the two entity kinds the engine touches,
/// rather than a generic app/model/id triple -- the compiler rules out
/// dangling subject kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Subject {
    /// The action concerns a fighter.
    Fighter(FighterId),
    /// The action concerns an equipment assignment.
    Assignment(AssignmentId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fighter_state_defaults_to_active() {
        assert_eq!(FighterState::default(), FighterState::Active);
    }

    #[test]
    fn subject_roundtrip_serde() {
        let subject = Subject::Fighter(FighterId::new());
        let json = serde_json::to_string(&subject).ok();
        assert!(json.is_some());
        let restored: Result<Subject, _> =
            serde_json::from_str(json.as_deref().unwrap_or(""));
        assert_eq!(restored.ok(), Some(subject));
    }

    #[test]
    fn action_kinds_are_ordered() {
        // Ord is derived so kinds can key BTreeMaps in diagnostics.
        assert!(ActionKind::HireFighter < ActionKind::Resync);
    }
}
