//! The propagation engine: guard, generic writers, and per-event handlers.
//!
//! Each handler translates one domain event into exactly one [`Action`]
//! per affected roster and an O(1) patch to the cached totals of the
//! entities it touches -- no tree walks. The handlers all follow the same
//! discipline:
//!
//! 1. Check the propagation guard for every affected roster.
//! 2. Validate and compute every new value (costs, cache patches).
//! 3. Build every action -- `before + delta == after` proven here.
//! 4. Only then mutate: apply actions to rosters, patch entity caches.
//!
//! Because no mutation happens before step 4 and step 4 cannot fail on
//! values step 3 already proved, a failed event leaves all state exactly
//! as it was. The persistence layer gives the same sequence the same
//! guarantee across processes by running it inside one transaction.
//!
//! # The guard
//!
//! Propagation runs only when the engine is configured ready, the roster
//! has at least one prior action, and its dirty flag is clear. A rejected
//! event is a hard error, not a silent cache patch -- the caller falls
//! back to [`recompute_persist`](crate::recompute_persist) or
//! [`Engine::resync`].

use uuid::Uuid;

use underhive_types::{
    Action, ActionId, ActionKind, Delta, EquipmentAssignment, Fighter, FighterId, FighterState,
    Roster, RosterId, Subject, Totals, UserId,
};

use crate::action::{checked_after, ActionBuilder};
use crate::config::PropagationConfig;
use crate::cost::fighter_cost;
use crate::ledger::ActionLog;
use crate::recompute::recompute;
use crate::{LedgerError, RejectionReason};

// ---------------------------------------------------------------------------
// Event parameter types
// ---------------------------------------------------------------------------

/// Audit attribution shared by every event.
#[derive(Debug, Clone, Copy)]
pub struct EventContext {
    /// The acting user.
    pub user: UserId,
    /// Optional link to a campaign-level action record.
    pub campaign_action: Option<Uuid>,
}

impl EventContext {
    /// Context for an event performed by the given user.
    pub const fn new(user: UserId) -> Self {
        Self {
            user,
            campaign_action: None,
        }
    }

    /// Attach a campaign-level action record link.
    #[must_use]
    pub const fn with_campaign_action(mut self, id: Uuid) -> Self {
        self.campaign_action = Some(id);
        self
    }
}

/// Parameters for the generic [`Engine::create_action`] writer.
///
/// Packs the arguments into a single struct to keep call sites readable;
/// the `before` snapshot must have been captured prior to any mutation.
#[derive(Debug, Clone)]
pub struct ActionParams {
    /// What category of change this records.
    pub kind: ActionKind,
    /// The directional change to apply.
    pub delta: Delta,
    /// Roster totals captured before any mutation.
    pub before: Totals,
    /// The entity the change is about.
    pub subject: Option<Subject>,
    /// Free-text audit description.
    pub description: String,
}

/// An incremental cost change flowing up from an equipment assignment.
#[derive(Debug, Clone)]
pub struct AssignmentChange {
    /// What category of change this records.
    pub kind: ActionKind,
    /// Signed change to the assignment's cost.
    pub delta: i64,
    /// Free-text audit description.
    pub description: String,
}

/// An incremental cost change applied directly to a fighter.
#[derive(Debug, Clone)]
pub struct FighterChange {
    /// What category of change this records.
    pub kind: ActionKind,
    /// Signed change to the fighter's cost.
    pub delta: i64,
    /// Free-text audit description.
    pub description: String,
}

/// Parameters for applying one advancement to a fighter.
#[derive(Debug, Clone)]
pub struct AdvancementParams {
    /// How much the advancement raises the fighter's cost.
    pub cost_increase: i64,
    /// Experience points the advancement consumes. In campaign mode the
    /// same amount is also debited from the roster's credits.
    pub xp_cost: i64,
    /// What was advanced, for the audit trail.
    pub description: String,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// The propagation engine.
///
/// Holds the injected [`PropagationConfig`]; all write APIs hang off this
/// struct so the readiness decision is made in exactly one place.
#[derive(Debug, Clone)]
pub struct Engine {
    config: PropagationConfig,
}

impl Engine {
    /// Create an engine with the given configuration.
    pub const fn new(config: PropagationConfig) -> Self {
        Self { config }
    }

    /// The engine's configuration.
    pub const fn config(&self) -> &PropagationConfig {
        &self.config
    }

    /// Whether the incremental path may run for this roster.
    pub fn should_propagate(&self, roster: &Roster) -> bool {
        self.rejection(roster).is_none()
    }

    fn rejection(&self, roster: &Roster) -> Option<RejectionReason> {
        if !self.config.enabled {
            return Some(RejectionReason::Disabled);
        }
        if roster.latest_action.is_none() {
            return Some(RejectionReason::NoHistory);
        }
        if roster.dirty {
            return Some(RejectionReason::Dirty);
        }
        None
    }

    /// The hard form of [`Self::should_propagate`].
    fn guard(&self, roster: &Roster) -> Result<(), LedgerError> {
        match self.rejection(roster) {
            None => Ok(()),
            Some(reason) => Err(LedgerError::PropagationRejected {
                roster: roster.id,
                reason,
            }),
        }
    }

    // -----------------------------------------------------------------------
    // Generic writers
    // -----------------------------------------------------------------------

    /// Validate, persist, and apply one action to one roster.
    ///
    /// Validates that the supplied before snapshot matches the roster's
    /// current cached values and that `before + delta` is representable,
    /// appends the action, applies the delta to the roster's three cached
    /// fields, and moves the latest-action pointer -- one logical unit.
    ///
    /// This writer does not consult the guard: it is also the substrate
    /// for [`Self::resync`], which legitimately runs on rosters without
    /// history. Event handlers guard before calling it.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::DeltaMismatch`] if the before snapshot is
    /// stale, [`LedgerError::Overflow`] if the delta cannot be applied.
    pub fn create_action(
        &self,
        roster: &mut Roster,
        log: &mut ActionLog,
        params: ActionParams,
        ctx: &EventContext,
    ) -> Result<ActionId, LedgerError> {
        let action = Self::build(roster, &params, ctx)?;
        Self::apply(roster, log, action)
    }

    /// Build a validated, unapplied action against a roster's current state.
    fn build(
        roster: &Roster,
        params: &ActionParams,
        ctx: &EventContext,
    ) -> Result<Action, LedgerError> {
        validate_before(roster, params.before)?;

        let mut builder = ActionBuilder::new(roster.id, params.kind, ctx.user)
            .delta(params.delta)
            .before(params.before.rating, params.before.stash, params.before.credits)
            .description(params.description.clone());
        if let Some(subject) = params.subject {
            builder = builder.subject(subject);
        }
        if let Some(id) = ctx.campaign_action {
            builder = builder.campaign_action(id);
        }
        builder.build()
    }

    /// Apply a built action: patch the roster caches, mark it applied,
    /// append it to the log.
    fn apply(
        roster: &mut Roster,
        log: &mut ActionLog,
        mut action: Action,
    ) -> Result<ActionId, LedgerError> {
        let rating = checked_after("rating", action.rating_before, action.rating_delta)?;
        let stash = checked_after("stash", action.stash_before, action.stash_delta)?;
        let credits = checked_after("credits", action.credits_before, action.credits_delta)?;

        roster.rating_current = rating;
        roster.stash_current = stash;
        roster.credits_current = credits;
        roster.latest_action = Some(action.id);
        action.is_applied = true;

        tracing::debug!(
            roster = %roster.id,
            action = %action.id,
            kind = ?action.kind,
            rating_delta = action.rating_delta,
            stash_delta = action.stash_delta,
            credits_delta = action.credits_delta,
            "applied action"
        );

        let id = action.id;
        log.append(action);
        Ok(id)
    }

    // -----------------------------------------------------------------------
    // Resync
    // -----------------------------------------------------------------------

    /// Recompute a roster's totals from scratch and record the correction.
    ///
    /// The ledger-aware form of
    /// [`recompute_persist`](crate::recompute_persist): derives fresh
    /// totals off the fighter tree, records a [`ActionKind::Resync`]
    /// action whose delta is the correction from the old cached values,
    /// and clears the dirty flag. Because the resync action seeds
    /// `latest_action`, this is also how a freshly created roster
    /// bootstraps the guard.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Overflow`] if the recompute or the
    /// correction delta overflows; the roster is left unmodified.
    pub fn resync(
        &self,
        roster: &mut Roster,
        fighters: &[Fighter],
        assignments: &[EquipmentAssignment],
        log: &mut ActionLog,
        ctx: &EventContext,
    ) -> Result<(Totals, ActionId), LedgerError> {
        let before = roster.cached_totals();
        let totals = recompute(roster, fighters, assignments)?;

        let delta = Delta {
            rating: delta_between("rating", before.rating, totals.rating)?,
            stash: delta_between("stash", before.stash, totals.stash)?,
            credits: 0,
        };

        let id = self.create_action(
            roster,
            log,
            ActionParams {
                kind: ActionKind::Resync,
                delta,
                before,
                subject: None,
                description: "full recompute".to_owned(),
            },
            ctx,
        )?;
        roster.dirty = false;

        Ok((totals, id))
    }

    // -----------------------------------------------------------------------
    // Fighter lifecycle events
    // -----------------------------------------------------------------------

    /// Hire a fighter onto its roster.
    ///
    /// Rating (or stash, for the stash fighter) rises by the fighter's
    /// cost; in campaign mode the hire price is debited from credits.
    pub fn hire_fighter(
        &self,
        roster: &mut Roster,
        fighter: &mut Fighter,
        assignments: &[EquipmentAssignment],
        log: &mut ActionLog,
        ctx: &EventContext,
    ) -> Result<ActionId, LedgerError> {
        self.guard(roster)?;
        check_membership(roster, fighter)?;

        let cost = fighter_cost(fighter, assignments)?;
        let delta = campaign_debit(roster, cost_delta(fighter, cost), cost)?;

        let id = self.create_action(
            roster,
            log,
            ActionParams {
                kind: ActionKind::HireFighter,
                delta,
                before: roster.cached_totals(),
                subject: Some(Subject::Fighter(fighter.id)),
                description: format!("hired {}", fighter.name),
            },
            ctx,
        )?;
        fighter.cost_cached = cost;
        Ok(id)
    }

    /// Clone a fighter onto a target roster.
    ///
    /// Only the target roster is touched; the source roster and fighter
    /// are read-only during the event. Returns the new fighter, which the
    /// caller owns (the engine does not store entities).
    pub fn clone_fighter(
        &self,
        target: &mut Roster,
        source: &Fighter,
        log: &mut ActionLog,
        ctx: &EventContext,
    ) -> Result<(Fighter, ActionId), LedgerError> {
        self.guard(target)?;

        let mut clone = source.clone();
        clone.id = FighterId::new();
        clone.roster = target.id;

        let cost = clone.cost_cached;
        let delta = campaign_debit(target, cost_delta(&clone, cost), cost)?;

        let id = self.create_action(
            target,
            log,
            ActionParams {
                kind: ActionKind::CloneFighter,
                delta,
                before: target.cached_totals(),
                subject: Some(Subject::Fighter(clone.id)),
                description: format!("cloned {}", source.name),
            },
            ctx,
        )?;
        Ok((clone, id))
    }

    /// Mark a fighter captured by another roster.
    ///
    /// The fighter's current contribution leaves its roster's totals and
    /// its cached cost drops to zero; no credits move at capture time.
    pub fn capture_fighter(
        &self,
        roster: &mut Roster,
        fighter: &mut Fighter,
        captor: RosterId,
        log: &mut ActionLog,
        ctx: &EventContext,
    ) -> Result<ActionId, LedgerError> {
        self.guard(roster)?;
        check_membership(roster, fighter)?;

        let contribution = fighter.cost_cached;
        let delta = cost_delta(fighter, negated("rating", contribution)?);

        let id = self.create_action(
            roster,
            log,
            ActionParams {
                kind: ActionKind::CaptureFighter,
                delta,
                before: roster.cached_totals(),
                subject: Some(Subject::Fighter(fighter.id)),
                description: format!("{} captured", fighter.name),
            },
            ctx,
        )?;
        fighter.state = FighterState::Captured;
        fighter.capturing_roster = Some(captor);
        fighter.cost_cached = 0;
        Ok(id)
    }

    /// Return a captured fighter to its roster with no payment.
    ///
    /// The fighter's cost is rederived (equipment may have changed while
    /// held) and rejoins the roster's totals.
    pub fn return_from_capture(
        &self,
        original: &mut Roster,
        fighter: &mut Fighter,
        assignments: &[EquipmentAssignment],
        log: &mut ActionLog,
        ctx: &EventContext,
    ) -> Result<ActionId, LedgerError> {
        self.guard(original)?;
        check_membership(original, fighter)?;
        check_captured(fighter, None)?;

        let cost = restored_cost(fighter, assignments)?;
        let delta = cost_delta(fighter, cost);

        let id = self.create_action(
            original,
            log,
            ActionParams {
                kind: ActionKind::ReturnFighter,
                delta,
                before: original.cached_totals(),
                subject: Some(Subject::Fighter(fighter.id)),
                description: format!("{} returned from capture", fighter.name),
            },
            ctx,
        )?;
        fighter.state = FighterState::Active;
        fighter.capturing_roster = None;
        fighter.cost_cached = cost;
        Ok(id)
    }

    /// Return a captured fighter against a ransom payment.
    ///
    /// Two actions in one atomic unit: the capturing roster gains the
    /// ransom, the original roster regains the fighter and pays it.
    /// Both actions are validated before either roster is touched.
    pub fn return_with_ransom(
        &self,
        original: &mut Roster,
        captor: &mut Roster,
        fighter: &mut Fighter,
        assignments: &[EquipmentAssignment],
        ransom: i64,
        log: &mut ActionLog,
        ctx: &EventContext,
    ) -> Result<[ActionId; 2], LedgerError> {
        self.guard(original)?;
        self.guard(captor)?;
        check_membership(original, fighter)?;
        check_captured(fighter, Some(captor.id))?;

        let cost = restored_cost(fighter, assignments)?;
        let original_params = ActionParams {
            kind: ActionKind::ReturnFighter,
            delta: cost_delta(fighter, cost).with_credits(negated("credits", ransom)?),
            before: original.cached_totals(),
            subject: Some(Subject::Fighter(fighter.id)),
            description: format!("{} ransomed back", fighter.name),
        };
        let captor_params = ActionParams {
            kind: ActionKind::ReturnFighter,
            delta: Delta::credits(ransom),
            before: captor.cached_totals(),
            subject: Some(Subject::Fighter(fighter.id)),
            description: format!("ransom received for {}", fighter.name),
        };

        // Build both before applying either: a validation failure on the
        // second must leave the first unapplied.
        let original_action = Self::build(original, &original_params, ctx)?;
        let captor_action = Self::build(captor, &captor_params, ctx)?;

        let original_id = Self::apply(original, log, original_action)?;
        let captor_id = Self::apply(captor, log, captor_action)?;

        fighter.state = FighterState::Active;
        fighter.capturing_roster = None;
        fighter.cost_cached = cost;
        Ok([original_id, captor_id])
    }

    /// Sell a captured fighter to the guilders.
    ///
    /// Two actions in one atomic unit: the capturing roster pockets the
    /// sale price; the original roster loses the fighter's remaining
    /// contribution (zero in the normal flow, since capture already
    /// removed it) and is credited nothing. The fighter is archived.
    pub fn sell_to_guilders(
        &self,
        original: &mut Roster,
        captor: &mut Roster,
        fighter: &mut Fighter,
        sale_price: i64,
        log: &mut ActionLog,
        ctx: &EventContext,
    ) -> Result<[ActionId; 2], LedgerError> {
        self.guard(original)?;
        self.guard(captor)?;
        check_membership(original, fighter)?;
        check_captured(fighter, Some(captor.id))?;

        let contribution = fighter.cost_cached;
        let original_params = ActionParams {
            kind: ActionKind::SellFighter,
            delta: cost_delta(fighter, negated("rating", contribution)?),
            before: original.cached_totals(),
            subject: Some(Subject::Fighter(fighter.id)),
            description: format!("{} sold to the guilders", fighter.name),
        };
        let captor_params = ActionParams {
            kind: ActionKind::SellFighter,
            delta: Delta::credits(sale_price),
            before: captor.cached_totals(),
            subject: Some(Subject::Fighter(fighter.id)),
            description: format!("sale proceeds for {}", fighter.name),
        };

        let original_action = Self::build(original, &original_params, ctx)?;
        let captor_action = Self::build(captor, &captor_params, ctx)?;

        let original_id = Self::apply(original, log, original_action)?;
        let captor_id = Self::apply(captor, log, captor_action)?;

        fighter.state = FighterState::SoldToGuilders;
        fighter.cost_cached = 0;
        fighter.archived = true;
        Ok([original_id, captor_id])
    }

    // -----------------------------------------------------------------------
    // Equipment events
    // -----------------------------------------------------------------------

    /// Move an equipment assignment between two fighters on one roster.
    ///
    /// Value crosses the rating/stash boundary only when the two fighters
    /// differ in stash classification; a same-classification move records
    /// a zero-delta action for the audit trail.
    pub fn reassign_equipment(
        &self,
        roster: &mut Roster,
        assignment: &mut EquipmentAssignment,
        from: &mut Fighter,
        to: &mut Fighter,
        log: &mut ActionLog,
        ctx: &EventContext,
    ) -> Result<ActionId, LedgerError> {
        self.guard(roster)?;
        check_membership(roster, from)?;
        check_membership(roster, to)?;
        check_carrier(assignment, from)?;

        let cost = assignment.cost_cached;
        let delta = match (from.is_stash, to.is_stash) {
            (true, false) => Delta {
                rating: cost,
                stash: negated("stash", cost)?,
                credits: 0,
            },
            (false, true) => Delta {
                rating: negated("rating", cost)?,
                stash: cost,
                credits: 0,
            },
            _ => Delta::ZERO,
        };

        let from_cached = checked_sub("fighter cost", from.cost_cached, cost)?;
        let to_cached = checked_after("fighter cost", to.cost_cached, cost)?;

        let id = self.create_action(
            roster,
            log,
            ActionParams {
                kind: ActionKind::ReassignEquipment,
                delta,
                before: roster.cached_totals(),
                subject: Some(Subject::Assignment(assignment.id)),
                description: format!("equipment moved from {} to {}", from.name, to.name),
            },
            ctx,
        )?;
        from.cost_cached = from_cached;
        to.cost_cached = to_cached;
        assignment.fighter = to.id;
        Ok(id)
    }

    /// Sell an equipment assignment off the roster.
    ///
    /// The assignment's value leaves rating (or stash) and the sale
    /// proceeds are credited. The caller must delete the assignment row
    /// *after* this returns -- the removal delta has to be recorded while
    /// the row still exists.
    pub fn sell_equipment(
        &self,
        roster: &mut Roster,
        fighter: &mut Fighter,
        assignment: &EquipmentAssignment,
        sale_price: i64,
        log: &mut ActionLog,
        ctx: &EventContext,
    ) -> Result<ActionId, LedgerError> {
        self.guard(roster)?;
        check_membership(roster, fighter)?;
        check_carrier(assignment, fighter)?;

        let cost = assignment.cost_cached;
        let delta = cost_delta(fighter, negated("rating", cost)?).with_credits(sale_price);
        let fighter_cached = checked_sub("fighter cost", fighter.cost_cached, cost)?;

        let id = self.create_action(
            roster,
            log,
            ActionParams {
                kind: ActionKind::SellEquipment,
                delta,
                before: roster.cached_totals(),
                subject: Some(Subject::Assignment(assignment.id)),
                description: format!("equipment sold off {}", fighter.name),
            },
            ctx,
        )?;
        fighter.cost_cached = fighter_cached;
        Ok(id)
    }

    /// Generic writer: a cost change originating at an assignment.
    ///
    /// Applies the change to the assignment's cached cost, the owning
    /// fighter's cached cost, and -- through the action -- the roster's
    /// rating or stash (selected by the fighter's stash classification).
    pub fn propagate_from_assignment(
        &self,
        roster: &mut Roster,
        fighter: &mut Fighter,
        assignment: &mut EquipmentAssignment,
        change: AssignmentChange,
        log: &mut ActionLog,
        ctx: &EventContext,
    ) -> Result<ActionId, LedgerError> {
        self.guard(roster)?;
        check_membership(roster, fighter)?;
        check_carrier(assignment, fighter)?;

        let assignment_cached =
            checked_after("assignment cost", assignment.cost_cached, change.delta)?;
        let fighter_cached = checked_after("fighter cost", fighter.cost_cached, change.delta)?;

        let id = self.create_action(
            roster,
            log,
            ActionParams {
                kind: change.kind,
                delta: cost_delta(fighter, change.delta),
                before: roster.cached_totals(),
                subject: Some(Subject::Assignment(assignment.id)),
                description: change.description,
            },
            ctx,
        )?;
        assignment.cost_cached = assignment_cached;
        fighter.cost_cached = fighter_cached;
        Ok(id)
    }

    /// Generic writer: a cost change applied directly to a fighter.
    pub fn propagate_from_fighter(
        &self,
        roster: &mut Roster,
        fighter: &mut Fighter,
        change: FighterChange,
        log: &mut ActionLog,
        ctx: &EventContext,
    ) -> Result<ActionId, LedgerError> {
        self.guard(roster)?;
        check_membership(roster, fighter)?;

        let fighter_cached = checked_after("fighter cost", fighter.cost_cached, change.delta)?;

        let id = self.create_action(
            roster,
            log,
            ActionParams {
                kind: change.kind,
                delta: cost_delta(fighter, change.delta),
                before: roster.cached_totals(),
                subject: Some(Subject::Fighter(fighter.id)),
                description: change.description,
            },
            ctx,
        )?;
        fighter.cost_cached = fighter_cached;
        Ok(id)
    }

    // -----------------------------------------------------------------------
    // Progression and campaign events
    // -----------------------------------------------------------------------

    /// Apply one advancement to a fighter.
    ///
    /// Captured fighters are ineligible -- this is the structural
    /// invariant that rules out "cost changed while captured" ambiguity.
    pub fn apply_advancement(
        &self,
        roster: &mut Roster,
        fighter: &mut Fighter,
        params: AdvancementParams,
        log: &mut ActionLog,
        ctx: &EventContext,
    ) -> Result<ActionId, LedgerError> {
        self.guard(roster)?;
        check_membership(roster, fighter)?;
        if fighter.state == FighterState::Captured {
            return Err(LedgerError::FighterCaptured {
                fighter: fighter.id,
            });
        }
        if fighter.xp_current < params.xp_cost {
            return Err(LedgerError::InsufficientXp {
                fighter: fighter.id,
                have: fighter.xp_current,
                need: params.xp_cost,
            });
        }

        let xp_remaining = checked_sub("xp", fighter.xp_current, params.xp_cost)?;
        let advancement_cost =
            checked_after("advancement cost", fighter.advancement_cost, params.cost_increase)?;
        let fighter_cached =
            checked_after("fighter cost", fighter.cost_cached, params.cost_increase)?;

        let mut delta = cost_delta(fighter, params.cost_increase);
        if roster.is_campaign_mode() {
            delta = delta.with_credits(negated("credits", params.xp_cost)?);
        }

        let id = self.create_action(
            roster,
            log,
            ActionParams {
                kind: ActionKind::ApplyAdvancement,
                delta,
                before: roster.cached_totals(),
                subject: Some(Subject::Fighter(fighter.id)),
                description: params.description,
            },
            ctx,
        )?;
        fighter.xp_current = xp_remaining;
        fighter.advancement_cost = advancement_cost;
        fighter.cost_cached = fighter_cached;
        Ok(id)
    }

    /// Credit the campaign starting budget to every participating roster.
    ///
    /// One action per roster, all validated before any is applied.
    pub fn distribute_campaign_budget(
        &self,
        rosters: &mut [Roster],
        budget: i64,
        log: &mut ActionLog,
        ctx: &EventContext,
    ) -> Result<Vec<ActionId>, LedgerError> {
        for roster in rosters.iter() {
            self.guard(roster)?;
        }

        let mut actions = Vec::with_capacity(rosters.len());
        for roster in rosters.iter() {
            actions.push(Self::build(
                roster,
                &ActionParams {
                    kind: ActionKind::CampaignBudget,
                    delta: Delta::credits(budget),
                    before: roster.cached_totals(),
                    subject: None,
                    description: format!("campaign starting budget {budget}"),
                },
                ctx,
            )?);
        }

        let mut ids = Vec::with_capacity(rosters.len());
        for (roster, action) in rosters.iter_mut().zip(actions) {
            ids.push(Self::apply(roster, log, action)?);
        }
        Ok(ids)
    }
}

// ---------------------------------------------------------------------------
// Shared validation and arithmetic helpers
// ---------------------------------------------------------------------------

/// Reject a before snapshot that disagrees with the roster's cached values.
fn validate_before(roster: &Roster, before: Totals) -> Result<(), LedgerError> {
    let mismatch = |quantity: &'static str, supplied: i64, actual: i64| {
        Err(LedgerError::DeltaMismatch {
            roster: roster.id,
            quantity,
            supplied,
            actual,
        })
    };
    if before.rating != roster.rating_current {
        return mismatch("rating", before.rating, roster.rating_current);
    }
    if before.stash != roster.stash_current {
        return mismatch("stash", before.stash, roster.stash_current);
    }
    if before.credits != roster.credits_current {
        return mismatch("credits", before.credits, roster.credits_current);
    }
    Ok(())
}

/// Reject a fighter that belongs to a different roster.
fn check_membership(roster: &Roster, fighter: &Fighter) -> Result<(), LedgerError> {
    if fighter.roster == roster.id {
        Ok(())
    } else {
        Err(LedgerError::WrongRoster {
            fighter: fighter.id,
            expected: roster.id,
            actual: fighter.roster,
        })
    }
}

/// Reject an assignment carried by a different fighter.
fn check_carrier(
    assignment: &EquipmentAssignment,
    fighter: &Fighter,
) -> Result<(), LedgerError> {
    if assignment.fighter == fighter.id {
        Ok(())
    } else {
        Err(LedgerError::WrongFighter {
            assignment: assignment.id,
            expected: fighter.id,
            actual: assignment.fighter,
        })
    }
}

/// Reject a fighter that is not captured, or is held by someone else.
fn check_captured(fighter: &Fighter, captor: Option<RosterId>) -> Result<(), LedgerError> {
    let held_by_expected = match captor {
        Some(expected) => fighter.capturing_roster == Some(expected),
        None => true,
    };
    if fighter.state == FighterState::Captured && held_by_expected {
        Ok(())
    } else {
        Err(LedgerError::NotCaptured {
            fighter: fighter.id,
        })
    }
}

/// The fighter's cost as it will be once restored to active duty.
///
/// Computed on a probe copy so the fighter itself stays untouched until
/// the event's actions have been validated.
fn restored_cost(
    fighter: &Fighter,
    assignments: &[EquipmentAssignment],
) -> Result<i64, LedgerError> {
    let mut probe = fighter.clone();
    probe.state = FighterState::Active;
    probe.capturing_roster = None;
    fighter_cost(&probe, assignments)
}

/// Route an amount to stash or rating by the fighter's classification.
const fn cost_delta(fighter: &Fighter, amount: i64) -> Delta {
    if fighter.is_stash {
        Delta::stash(amount)
    } else {
        Delta::rating(amount)
    }
}

/// Debit the cost from credits when the roster is in campaign mode.
fn campaign_debit(roster: &Roster, delta: Delta, cost: i64) -> Result<Delta, LedgerError> {
    if roster.is_campaign_mode() {
        Ok(delta.with_credits(negated("credits", cost)?))
    } else {
        Ok(delta)
    }
}

/// Checked negation.
const fn negated(quantity: &'static str, value: i64) -> Result<i64, LedgerError> {
    match value.checked_neg() {
        Some(v) => Ok(v),
        None => Err(LedgerError::Overflow {
            quantity,
            before: 0,
            delta: value,
        }),
    }
}

/// Checked subtraction.
const fn checked_sub(
    quantity: &'static str,
    from: i64,
    amount: i64,
) -> Result<i64, LedgerError> {
    match from.checked_sub(amount) {
        Some(v) => Ok(v),
        None => Err(LedgerError::Overflow {
            quantity,
            before: from,
            delta: amount,
        }),
    }
}

/// The signed difference `to - from`.
const fn delta_between(
    quantity: &'static str,
    from: i64,
    to: i64,
) -> Result<i64, LedgerError> {
    checked_sub(quantity, to, from)
}
