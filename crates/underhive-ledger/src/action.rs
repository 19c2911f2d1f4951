//! Validated construction of immutable [`Action`] ledger entries.
//!
//! Provides an [`ActionBuilder`] that enforces the ledger invariant at the
//! only place an entry can come into existence: for each of rating, stash,
//! and credits, `before + delta` must be representable, and the resulting
//! after values are derived here rather than supplied by the caller.

use chrono::Utc;
use uuid::Uuid;

use underhive_types::{Action, ActionId, ActionKind, Delta, RosterId, Subject, UserId};

use crate::LedgerError;

/// Compute `before + delta` for one tracked quantity, or report overflow.
pub(crate) const fn checked_after(
    quantity: &'static str,
    before: i64,
    delta: i64,
) -> Result<i64, LedgerError> {
    match before.checked_add(delta) {
        Some(after) => Ok(after),
        None => Err(LedgerError::Overflow {
            quantity,
            before,
            delta,
        }),
    }
}

/// Builder for constructing validated [`Action`] values.
///
/// Enforces that every entry carries a delta and a before snapshot, and
/// that applying the delta to the snapshot cannot overflow. The built
/// action has `is_applied == false`; the engine flips it when the delta is
/// actually applied to the roster's cached fields.
///
/// # Examples
///
/// ```
/// use underhive_ledger::ActionBuilder;
/// use underhive_types::{ActionKind, Delta, RosterId, UserId};
///
/// let action = ActionBuilder::new(RosterId::new(), ActionKind::HireFighter, UserId::new())
///     .delta(Delta::rating(115).with_credits(-115))
///     .before(0, 0, 1000)
///     .description("hired Scrag".to_owned())
///     .build();
///
/// assert!(action.is_ok());
/// ```
#[derive(Debug)]
pub struct ActionBuilder {
    roster: RosterId,
    kind: ActionKind,
    user: UserId,
    delta: Option<Delta>,
    before: Option<(i64, i64, i64)>,
    subject: Option<Subject>,
    description: Option<String>,
    campaign_action: Option<Uuid>,
}

impl ActionBuilder {
    /// Start building an action for the given roster, kind, and acting user.
    pub const fn new(roster: RosterId, kind: ActionKind, user: UserId) -> Self {
        Self {
            roster,
            kind,
            user,
            delta: None,
            before: None,
            subject: None,
            description: None,
            campaign_action: None,
        }
    }

    /// Set the directional change this action records.
    #[must_use]
    pub const fn delta(mut self, delta: Delta) -> Self {
        self.delta = Some(delta);
        self
    }

    /// Set the roster totals captured before any mutation.
    #[must_use]
    pub const fn before(mut self, rating: i64, stash: i64, credits: i64) -> Self {
        self.before = Some((rating, stash, credits));
        self
    }

    /// Set the entity this action is about.
    #[must_use]
    pub const fn subject(mut self, subject: Subject) -> Self {
        self.subject = Some(subject);
        self
    }

    /// Set the free-text audit description.
    #[must_use]
    pub fn description(mut self, description: String) -> Self {
        self.description = Some(description);
        self
    }

    /// Link this action to a campaign-level action record.
    #[must_use]
    pub const fn campaign_action(mut self, id: Uuid) -> Self {
        self.campaign_action = Some(id);
        self
    }

    /// Validate inputs and produce an [`Action`].
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::MissingField`] if the delta or before
    /// snapshot was not set, and [`LedgerError::Overflow`] if any
    /// `before + delta` is not representable in `i64`.
    pub fn build(self) -> Result<Action, LedgerError> {
        let delta = self.delta.ok_or(LedgerError::MissingField("delta"))?;
        let (rating_before, stash_before, credits_before) =
            self.before.ok_or(LedgerError::MissingField("before"))?;

        // The after values are not stored, but building them proves the
        // entry can be applied without overflow.
        checked_after("rating", rating_before, delta.rating)?;
        checked_after("stash", stash_before, delta.stash)?;
        checked_after("credits", credits_before, delta.credits)?;

        Ok(Action {
            id: ActionId::new(),
            roster: self.roster,
            kind: self.kind,
            rating_delta: delta.rating,
            stash_delta: delta.stash,
            credits_delta: delta.credits,
            rating_before,
            stash_before,
            credits_before,
            subject: self.subject,
            description: self.description.unwrap_or_default(),
            is_applied: false,
            campaign_action: self.campaign_action,
            user: self.user,
            created_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder(kind: ActionKind) -> ActionBuilder {
        ActionBuilder::new(RosterId::new(), kind, UserId::new())
    }

    #[test]
    fn builder_produces_valid_entry() {
        let result = builder(ActionKind::HireFighter)
            .delta(Delta::rating(115).with_credits(-115))
            .before(0, 0, 1000)
            .description("hired Scrag".to_owned())
            .build();

        assert!(result.is_ok());
        if let Ok(action) = result {
            assert_eq!(action.kind, ActionKind::HireFighter);
            assert_eq!(action.rating_delta, 115);
            assert_eq!(action.credits_delta, -115);
            assert_eq!(action.rating_after(), Some(115));
            assert_eq!(action.credits_after(), Some(885));
            assert!(!action.is_applied);
        }
    }

    #[test]
    fn missing_delta_rejected() {
        let result = builder(ActionKind::HireFighter).before(0, 0, 0).build();
        assert!(matches!(
            result.err(),
            Some(LedgerError::MissingField("delta"))
        ));
    }

    #[test]
    fn missing_before_rejected() {
        let result = builder(ActionKind::HireFighter)
            .delta(Delta::rating(10))
            .build();
        assert!(matches!(
            result.err(),
            Some(LedgerError::MissingField("before"))
        ));
    }

    #[test]
    fn overflow_rejected() {
        let result = builder(ActionKind::UpdateFighter)
            .delta(Delta::rating(1))
            .before(i64::MAX, 0, 0)
            .build();
        assert!(matches!(
            result.err(),
            Some(LedgerError::Overflow {
                quantity: "rating",
                ..
            })
        ));
    }

    #[test]
    fn zero_delta_is_allowed() {
        // Audit-only entries (e.g. same-classification reassignment)
        // legitimately carry an all-zero delta.
        let result = builder(ActionKind::ReassignEquipment)
            .delta(Delta::ZERO)
            .before(140, 0, 885)
            .build();
        assert!(result.is_ok());
    }

    #[test]
    fn subject_and_campaign_link_are_optional() {
        let subject = Subject::Fighter(underhive_types::FighterId::new());
        let campaign_action = Uuid::now_v7();
        let result = builder(ActionKind::CaptureFighter)
            .delta(Delta::rating(-140))
            .before(140, 0, 885)
            .subject(subject)
            .campaign_action(campaign_action)
            .build();

        assert!(result.is_ok());
        if let Ok(action) = result {
            assert_eq!(action.subject, Some(subject));
            assert_eq!(action.campaign_action, Some(campaign_action));
        }
    }
}
