//! The action log: an append-only record of every applied change.
//!
//! The [`ActionLog`] holds [`Action`] entries and provides query methods
//! plus replay verification. Entries are never modified or deleted; the
//! log is the audit trail the incremental path is judged against.
//!
//! # Replay verification
//!
//! Because every action records its before values, the log for one roster
//! forms a chain: each action's before snapshot must equal the running
//! totals produced by replaying everything before it. [`ActionLog::replay`]
//! walks that chain and either returns the final totals or a
//! [`LedgerAnomaly`] naming the first broken link. Well-formed use of the
//! engine cannot break the chain -- the check exists as defense-in-depth
//! against cache corruption and misuse of the write APIs.

use underhive_types::{Action, ActionId, RosterId, Subject, Totals};

use crate::action::checked_after;

// ---------------------------------------------------------------------------
// Anomaly type
// ---------------------------------------------------------------------------

/// A broken link in a roster's action chain found during replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerAnomaly {
    /// The roster whose chain is broken.
    pub roster: RosterId,
    /// The action at the broken link.
    pub action: ActionId,
    /// Which tracked quantity broke the chain.
    pub quantity: &'static str,
    /// The running total replay expected the action to have recorded.
    pub expected: i64,
    /// The before value the action actually recorded.
    pub recorded: i64,
    /// Human-readable description of the anomaly.
    pub message: String,
}

impl core::fmt::Display for LedgerAnomaly {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// The result of replaying one roster's action chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplayResult {
    /// Every link held; these are the totals the chain produces.
    Intact(Totals),
    /// The chain is broken.
    Anomaly(LedgerAnomaly),
}

// ---------------------------------------------------------------------------
// Action log
// ---------------------------------------------------------------------------

/// Append-only log of applied actions.
///
/// The log enforces nothing on append -- validation happens in the
/// [`ActionBuilder`](crate::ActionBuilder) and the engine -- but it never
/// exposes mutation of stored entries.
#[derive(Debug, Default)]
pub struct ActionLog {
    /// All entries, in insertion order.
    entries: Vec<Action>,
}

impl ActionLog {
    /// Create a new empty log.
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Return the number of entries in the log.
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    /// Return whether the log has no entries.
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append an action to the log.
    ///
    /// Actions loaded from the database and actions freshly produced by
    /// the engine both arrive here; entries are stored as given.
    pub fn append(&mut self, action: Action) {
        self.entries.push(action);
    }

    /// Return all entries, in insertion order.
    pub fn all_entries(&self) -> &[Action] {
        &self.entries
    }

    /// Look up one action by id.
    pub fn get(&self, id: ActionId) -> Option<&Action> {
        self.entries.iter().find(|a| a.id == id)
    }

    /// Return all entries for a given roster, in insertion order.
    pub fn entries_for_roster(&self, roster: RosterId) -> Vec<&Action> {
        self.entries.iter().filter(|a| a.roster == roster).collect()
    }

    /// Return all entries about a given subject, in insertion order.
    pub fn entries_for_subject(&self, subject: Subject) -> Vec<&Action> {
        self.entries
            .iter()
            .filter(|a| a.subject == Some(subject))
            .collect()
    }

    /// Return the most recent entry for a roster.
    pub fn latest_for_roster(&self, roster: RosterId) -> Option<&Action> {
        self.entries.iter().rev().find(|a| a.roster == roster)
    }

    /// Replay a roster's applied actions from the given initial totals.
    ///
    /// Each applied action's recorded before values must equal the running
    /// totals at that point in the chain. Unapplied actions (built but
    /// never committed) are skipped -- they never touched the caches.
    pub fn replay(&self, roster: RosterId, initial: Totals) -> ReplayResult {
        let mut rating = initial.rating;
        let mut stash = initial.stash;
        let mut credits = initial.credits;

        for action in self.entries.iter().filter(|a| a.roster == roster) {
            if !action.is_applied {
                continue;
            }

            if let Some(anomaly) = chain_mismatch(action, "rating", rating, action.rating_before) {
                return ReplayResult::Anomaly(anomaly);
            }
            if let Some(anomaly) = chain_mismatch(action, "stash", stash, action.stash_before) {
                return ReplayResult::Anomaly(anomaly);
            }
            if let Some(anomaly) =
                chain_mismatch(action, "credits", credits, action.credits_before)
            {
                return ReplayResult::Anomaly(anomaly);
            }

            rating = match checked_after("rating", rating, action.rating_delta) {
                Ok(v) => v,
                Err(_) => return ReplayResult::Anomaly(overflow(action, "rating", rating)),
            };
            stash = match checked_after("stash", stash, action.stash_delta) {
                Ok(v) => v,
                Err(_) => return ReplayResult::Anomaly(overflow(action, "stash", stash)),
            };
            credits = match checked_after("credits", credits, action.credits_delta) {
                Ok(v) => v,
                Err(_) => return ReplayResult::Anomaly(overflow(action, "credits", credits)),
            };
        }

        ReplayResult::Intact(Totals::new(rating, stash, credits))
    }
}

/// Build an anomaly when an action's recorded before value disagrees with
/// the replayed running total, or `None` when the link holds.
fn chain_mismatch(
    action: &Action,
    quantity: &'static str,
    expected: i64,
    recorded: i64,
) -> Option<LedgerAnomaly> {
    if expected == recorded {
        return None;
    }
    Some(LedgerAnomaly {
        roster: action.roster,
        action: action.id,
        quantity,
        expected,
        recorded,
        message: format!(
            "broken action chain for roster {roster}: action {id} recorded {quantity} before {recorded}, replay expected {expected}",
            roster = action.roster,
            id = action.id,
        ),
    })
}

/// Build an anomaly for arithmetic overflow while replaying a delta.
fn overflow(action: &Action, quantity: &'static str, running: i64) -> LedgerAnomaly {
    LedgerAnomaly {
        roster: action.roster,
        action: action.id,
        quantity,
        expected: running,
        recorded: running,
        message: format!(
            "replay overflow for roster {roster}: action {id} overflows {quantity} at {running}",
            roster = action.roster,
            id = action.id,
        ),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use underhive_types::{ActionKind, Delta, FighterId, UserId};

    use super::*;

    /// Helper to create an applied action without going through the engine.
    fn applied(
        roster: RosterId,
        kind: ActionKind,
        delta: Delta,
        before: (i64, i64, i64),
    ) -> Action {
        Action {
            id: ActionId::new(),
            roster,
            kind,
            rating_delta: delta.rating,
            stash_delta: delta.stash,
            credits_delta: delta.credits,
            rating_before: before.0,
            stash_before: before.1,
            credits_before: before.2,
            subject: None,
            description: String::new(),
            is_applied: true,
            campaign_action: None,
            user: UserId::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn new_log_is_empty() {
        let log = ActionLog::new();
        assert!(log.is_empty());
        assert_eq!(log.len(), 0);
    }

    #[test]
    fn entries_for_roster_filters() {
        let mut log = ActionLog::new();
        let roster_a = RosterId::new();
        let roster_b = RosterId::new();

        log.append(applied(
            roster_a,
            ActionKind::HireFighter,
            Delta::rating(115),
            (0, 0, 0),
        ));
        log.append(applied(
            roster_b,
            ActionKind::HireFighter,
            Delta::rating(90),
            (0, 0, 0),
        ));

        assert_eq!(log.entries_for_roster(roster_a).len(), 1);
        assert_eq!(log.entries_for_roster(roster_b).len(), 1);
        assert_eq!(log.entries_for_roster(RosterId::new()).len(), 0);
    }

    #[test]
    fn entries_for_subject_filters() {
        let mut log = ActionLog::new();
        let roster = RosterId::new();
        let fighter = FighterId::new();

        let mut action = applied(roster, ActionKind::HireFighter, Delta::rating(115), (0, 0, 0));
        action.subject = Some(Subject::Fighter(fighter));
        log.append(action);
        log.append(applied(
            roster,
            ActionKind::CampaignBudget,
            Delta::credits(1000),
            (115, 0, 0),
        ));

        assert_eq!(log.entries_for_subject(Subject::Fighter(fighter)).len(), 1);
        assert_eq!(
            log.entries_for_subject(Subject::Fighter(FighterId::new()))
                .len(),
            0
        );
    }

    #[test]
    fn latest_for_roster_is_most_recent() {
        let mut log = ActionLog::new();
        let roster = RosterId::new();

        log.append(applied(
            roster,
            ActionKind::HireFighter,
            Delta::rating(115),
            (0, 0, 0),
        ));
        log.append(applied(
            roster,
            ActionKind::AddAssignment,
            Delta::rating(25),
            (115, 0, 0),
        ));

        let latest = log.latest_for_roster(roster);
        assert_eq!(latest.map(|a| a.kind), Some(ActionKind::AddAssignment));
    }

    #[test]
    fn replay_of_empty_log_returns_initial() {
        let log = ActionLog::new();
        let result = log.replay(RosterId::new(), Totals::new(10, 20, 30));
        assert_eq!(result, ReplayResult::Intact(Totals::new(10, 20, 30)));
    }

    #[test]
    fn replay_intact_chain_produces_final_totals() {
        let mut log = ActionLog::new();
        let roster = RosterId::new();

        log.append(applied(
            roster,
            ActionKind::HireFighter,
            Delta::rating(115).with_credits(-115),
            (0, 0, 1000),
        ));
        log.append(applied(
            roster,
            ActionKind::AddAssignment,
            Delta::rating(25).with_credits(-25),
            (115, 0, 885),
        ));

        let result = log.replay(roster, Totals::new(0, 0, 1000));
        assert_eq!(result, ReplayResult::Intact(Totals::new(140, 0, 860)));
    }

    #[test]
    fn replay_detects_broken_chain() {
        let mut log = ActionLog::new();
        let roster = RosterId::new();

        log.append(applied(
            roster,
            ActionKind::HireFighter,
            Delta::rating(115),
            (0, 0, 0),
        ));
        // Wrong before value: claims rating was still 0.
        log.append(applied(
            roster,
            ActionKind::AddAssignment,
            Delta::rating(25),
            (0, 0, 0),
        ));

        let result = log.replay(roster, Totals::new(0, 0, 0));
        assert!(matches!(result, ReplayResult::Anomaly(_)));
        if let ReplayResult::Anomaly(anomaly) = result {
            assert_eq!(anomaly.quantity, "rating");
            assert_eq!(anomaly.expected, 115);
            assert_eq!(anomaly.recorded, 0);
            assert!(anomaly.message.contains("broken action chain"));
        }
    }

    #[test]
    fn replay_skips_unapplied_actions() {
        let mut log = ActionLog::new();
        let roster = RosterId::new();

        let mut unapplied = applied(roster, ActionKind::HireFighter, Delta::rating(115), (0, 0, 0));
        unapplied.is_applied = false;
        log.append(unapplied);

        let result = log.replay(roster, Totals::new(0, 0, 0));
        assert_eq!(result, ReplayResult::Intact(Totals::new(0, 0, 0)));
    }

    #[test]
    fn replay_ignores_other_rosters() {
        let mut log = ActionLog::new();
        let roster = RosterId::new();

        log.append(applied(
            RosterId::new(),
            ActionKind::HireFighter,
            Delta::rating(500),
            (0, 0, 0),
        ));

        let result = log.replay(roster, Totals::new(0, 0, 0));
        assert_eq!(result, ReplayResult::Intact(Totals::new(0, 0, 0)));
    }
}
