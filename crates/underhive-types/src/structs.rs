//! Core entity structs for the Underhive roster engine.
//!
//! Covers the roster aggregate with its cached totals, fighters and their
//! equipment assignments, the directional [`Delta`] value, and the
//! immutable [`Action`] ledger entry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::enums::{ActionKind, FighterState, Subject};
use crate::ids::{ActionId, AssignmentId, CampaignId, EquipmentId, FighterId, RosterId, UserId};

// ---------------------------------------------------------------------------
// Delta
// ---------------------------------------------------------------------------

/// A signed directional change to one roster's tracked quantities.
///
/// Deltas are not persisted on their own; they are the argument to the
/// propagation functions and the payload recorded inside an [`Action`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delta {
    /// Change to the active-fighter rating.
    pub rating: i64,
    /// Change to the stash value.
    pub stash: i64,
    /// Change to the spendable credit balance.
    pub credits: i64,
}

impl Delta {
    /// The identity delta (no change to any quantity).
    pub const ZERO: Self = Self {
        rating: 0,
        stash: 0,
        credits: 0,
    };

    /// A delta touching only the rating.
    pub const fn rating(value: i64) -> Self {
        Self {
            rating: value,
            stash: 0,
            credits: 0,
        }
    }

    /// A delta touching only the stash.
    pub const fn stash(value: i64) -> Self {
        Self {
            rating: 0,
            stash: value,
            credits: 0,
        }
    }

    /// A delta touching only the credits.
    pub const fn credits(value: i64) -> Self {
        Self {
            rating: 0,
            stash: 0,
            credits: value,
        }
    }

    /// Return a copy with the credits component replaced.
    #[must_use]
    pub const fn with_credits(mut self, value: i64) -> Self {
        self.credits = value;
        self
    }

    /// Whether every component is zero.
    pub const fn is_zero(&self) -> bool {
        self.rating == 0 && self.stash == 0 && self.credits == 0
    }
}

// ---------------------------------------------------------------------------
// Totals
// ---------------------------------------------------------------------------

/// A roster's derived totals: rating, stash, credits, and wealth.
///
/// `wealth` is a display-only quantity: rating + stash + credits. The sum
/// saturates at the `i64` bounds rather than wrapping; the tracked
/// quantities themselves always use checked arithmetic upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    /// Total point value of active (non-stash) fighters.
    pub rating: i64,
    /// Point value held in the stash.
    pub stash: i64,
    /// Spendable in-game currency.
    pub credits: i64,
    /// rating + stash + credits.
    pub wealth: i64,
}

impl Totals {
    /// Build totals from the three tracked quantities, deriving wealth.
    pub const fn new(rating: i64, stash: i64, credits: i64) -> Self {
        Self {
            rating,
            stash,
            credits,
            wealth: rating.saturating_add(stash).saturating_add(credits),
        }
    }
}

// ---------------------------------------------------------------------------
// Roster
// ---------------------------------------------------------------------------

/// A user-owned collection of fighters (a gang) with cached totals.
///
/// The cached fields are trustworthy only while `dirty` is false; a dirty
/// roster must be recomputed before its totals are shown. The roster also
/// remembers its most recent ledger action, which the propagation guard
/// uses as evidence that the incremental path has ever run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
    /// Roster identifier.
    pub id: RosterId,
    /// Owning user.
    pub owner: UserId,
    /// Display name of the gang.
    pub name: String,
    /// Campaign the roster is enrolled in, if any. Credit deltas apply
    /// only while this is set.
    pub campaign: Option<CampaignId>,
    /// Cached total point value of active fighters.
    pub rating_current: i64,
    /// Cached point value held in the stash.
    pub stash_current: i64,
    /// Spendable credit balance. Authoritative here; never derived from
    /// the fighter tree.
    pub credits_current: i64,
    /// Whether the cached fields are untrustworthy.
    pub dirty: bool,
    /// The most recent ledger action applied to this roster.
    pub latest_action: Option<ActionId>,
    /// Soft-delete marker. Archived rosters are never mutated.
    pub archived: bool,
}

impl Roster {
    /// Create a new roster with zeroed caches.
    ///
    /// New rosters start dirty with no ledger history: their first totals
    /// must come from a persisting recompute, never from propagation.
    pub fn new(owner: UserId, name: impl Into<String>, campaign: Option<CampaignId>) -> Self {
        Self {
            id: RosterId::new(),
            owner,
            name: name.into(),
            campaign,
            rating_current: 0,
            stash_current: 0,
            credits_current: 0,
            dirty: true,
            latest_action: None,
            archived: false,
        }
    }

    /// Whether credit deltas apply to this roster.
    pub const fn is_campaign_mode(&self) -> bool {
        self.campaign.is_some()
    }

    /// Snapshot the cached fields as a [`Totals`] value.
    ///
    /// The caller is responsible for having checked `dirty` first; prefer
    /// the facts API over calling this directly.
    pub const fn cached_totals(&self) -> Totals {
        Totals::new(self.rating_current, self.stash_current, self.credits_current)
    }
}

// ---------------------------------------------------------------------------
// Fighter
// ---------------------------------------------------------------------------

/// One roster member.
///
/// A fighter's cost contribution is derived in `underhive-ledger`; the
/// struct itself only carries the inputs (base cost, override, accumulated
/// advancement cost) and the cached result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fighter {
    /// Fighter identifier.
    pub id: FighterId,
    /// Owning roster.
    pub roster: RosterId,
    /// Display name.
    pub name: String,
    /// Base point cost from the content template.
    pub base_cost: i64,
    /// Manual cost override. When set, replaces the computed cost entirely.
    pub cost_override: Option<i64>,
    /// Accumulated cost of applied advancements.
    pub advancement_cost: i64,
    /// Unspent experience points.
    pub xp_current: i64,
    /// Cached total cost, refreshed on every structural change.
    pub cost_cached: i64,
    /// Whether this is the roster's stash fighter (holds reserve gear).
    pub is_stash: bool,
    /// Lifecycle state. Non-active fighters contribute zero cost.
    pub state: FighterState,
    /// The roster currently holding this fighter captive, if captured.
    pub capturing_roster: Option<RosterId>,
    /// Set when this fighter is the crew/child of an equipment assignment
    /// (e.g. a vehicle); the parent assignment absorbs its cost.
    pub linked_parent: Option<AssignmentId>,
    /// Soft-delete marker.
    pub archived: bool,
}

impl Fighter {
    /// Create a new active fighter with the given base cost.
    pub fn new(roster: RosterId, name: impl Into<String>, base_cost: i64) -> Self {
        Self {
            id: FighterId::new(),
            roster,
            name: name.into(),
            base_cost,
            cost_override: None,
            advancement_cost: 0,
            xp_current: 0,
            cost_cached: base_cost,
            is_stash: false,
            state: FighterState::Active,
            capturing_roster: None,
            linked_parent: None,
            archived: false,
        }
    }

    /// Mark this fighter as the roster's stash fighter.
    #[must_use]
    pub const fn as_stash(mut self) -> Self {
        self.is_stash = true;
        self
    }
}

// ---------------------------------------------------------------------------
// Equipment assignment
// ---------------------------------------------------------------------------

/// Links a fighter to one piece of equipment and carries its cost.
///
/// Total contribution is either `total_override` or the sum of the four
/// component costs -- never both combined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquipmentAssignment {
    /// Assignment identifier.
    pub id: AssignmentId,
    /// The fighter carrying the equipment.
    pub fighter: FighterId,
    /// Catalog reference of the equipment itself.
    pub equipment: EquipmentId,
    /// Base cost of the equipment.
    pub base_cost: i64,
    /// Cost of the selected weapon profiles.
    pub profile_cost: i64,
    /// Cost of attached accessories.
    pub accessory_cost: i64,
    /// Cost of applied upgrades.
    pub upgrade_cost: i64,
    /// Manual total override. When set, replaces the component sum.
    pub total_override: Option<i64>,
    /// Cached total cost, refreshed on every structural change.
    pub cost_cached: i64,
    /// A fighter whose cost this assignment absorbs (e.g. vehicle crew).
    pub child_fighter: Option<FighterId>,
}

impl EquipmentAssignment {
    /// Create a new assignment with only a base cost.
    pub fn new(fighter: FighterId, equipment: EquipmentId, base_cost: i64) -> Self {
        Self {
            id: AssignmentId::new(),
            fighter,
            equipment,
            base_cost,
            profile_cost: 0,
            accessory_cost: 0,
            upgrade_cost: 0,
            total_override: None,
            cost_cached: base_cost,
            child_fighter: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Action (ledger entry)
// ---------------------------------------------------------------------------

/// An immutable ledger entry recording one applied change.
///
/// For each tracked quantity, `before + delta == after` -- validated at
/// construction by the action builder and never revisited. Actions are
/// append-only: once created they are never mutated or deleted, which
/// makes the log a replayable audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    /// Action identifier (UUID v7, so ids are insertion-ordered).
    pub id: ActionId,
    /// The roster whose totals this action changed.
    pub roster: RosterId,
    /// What category of change this records.
    pub kind: ActionKind,
    /// Signed change to the rating.
    pub rating_delta: i64,
    /// Signed change to the stash value.
    pub stash_delta: i64,
    /// Signed change to the credit balance.
    pub credits_delta: i64,
    /// Rating before the change.
    pub rating_before: i64,
    /// Stash value before the change.
    pub stash_before: i64,
    /// Credit balance before the change.
    pub credits_before: i64,
    /// The entity the change is about, when there is one.
    pub subject: Option<Subject>,
    /// Free-text description for the audit trail.
    pub description: String,
    /// Whether the delta has been applied to the roster's cached fields.
    pub is_applied: bool,
    /// Optional link to a campaign-level action record.
    pub campaign_action: Option<Uuid>,
    /// The acting user, for audit attribution.
    pub user: UserId,
    /// Real-world creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Action {
    /// The action's delta as a single value.
    pub const fn delta(&self) -> Delta {
        Delta {
            rating: self.rating_delta,
            stash: self.stash_delta,
            credits: self.credits_delta,
        }
    }

    /// The roster totals before this action, as recorded.
    pub const fn before(&self) -> Totals {
        Totals::new(self.rating_before, self.stash_before, self.credits_before)
    }

    /// Rating after the change, or `None` on overflow.
    pub const fn rating_after(&self) -> Option<i64> {
        self.rating_before.checked_add(self.rating_delta)
    }

    /// Stash value after the change, or `None` on overflow.
    pub const fn stash_after(&self) -> Option<i64> {
        self.stash_before.checked_add(self.stash_delta)
    }

    /// Credit balance after the change, or `None` on overflow.
    pub const fn credits_after(&self) -> Option<i64> {
        self.credits_before.checked_add(self.credits_delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_delta_is_identity() {
        assert!(Delta::ZERO.is_zero());
        assert!(!Delta::rating(5).is_zero());
    }

    #[test]
    fn totals_derive_wealth() {
        let totals = Totals::new(100, 30, 250);
        assert_eq!(totals.wealth, 380);
    }

    #[test]
    fn wealth_saturates_instead_of_wrapping() {
        let totals = Totals::new(i64::MAX, 1, 0);
        assert_eq!(totals.wealth, i64::MAX);
    }

    #[test]
    fn new_roster_starts_dirty_with_no_history() {
        let roster = Roster::new(UserId::new(), "Sump Dogs", None);
        assert!(roster.dirty);
        assert!(roster.latest_action.is_none());
        assert_eq!(roster.cached_totals(), Totals::new(0, 0, 0));
        assert!(!roster.is_campaign_mode());
    }

    #[test]
    fn campaign_mode_follows_campaign_link() {
        let roster = Roster::new(UserId::new(), "Sump Dogs", Some(CampaignId::new()));
        assert!(roster.is_campaign_mode());
    }

    #[test]
    fn fighter_constructor_caches_base_cost() {
        let fighter = Fighter::new(RosterId::new(), "Scrag", 115);
        assert_eq!(fighter.cost_cached, 115);
        assert_eq!(fighter.state, FighterState::Active);
        assert!(!fighter.is_stash);
    }

    #[test]
    fn stash_fighter_builder() {
        let fighter = Fighter::new(RosterId::new(), "Stash", 0).as_stash();
        assert!(fighter.is_stash);
    }

    #[test]
    fn action_after_values_use_checked_arithmetic() {
        let action = Action {
            id: ActionId::new(),
            roster: RosterId::new(),
            kind: ActionKind::HireFighter,
            rating_delta: 115,
            stash_delta: 0,
            credits_delta: -115,
            rating_before: 0,
            stash_before: 0,
            credits_before: 1000,
            subject: None,
            description: String::new(),
            is_applied: true,
            campaign_action: None,
            user: UserId::new(),
            created_at: Utc::now(),
        };
        assert_eq!(action.rating_after(), Some(115));
        assert_eq!(action.credits_after(), Some(885));
        assert_eq!(action.delta(), Delta::rating(115).with_credits(-115));
    }

    #[test]
    fn action_after_overflow_is_none() {
        let action = Action {
            id: ActionId::new(),
            roster: RosterId::new(),
            kind: ActionKind::UpdateFighter,
            rating_delta: 1,
            stash_delta: 0,
            credits_delta: 0,
            rating_before: i64::MAX,
            stash_before: 0,
            credits_before: 0,
            subject: None,
            description: String::new(),
            is_applied: false,
            campaign_action: None,
            user: UserId::new(),
            created_at: Utc::now(),
        };
        assert_eq!(action.rating_after(), None);
    }
}
