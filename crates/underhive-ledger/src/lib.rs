//! Cost/facts propagation engine for Underhive rosters.
//!
//! A roster's aggregate totals -- rating, stash value, and credit balance --
//! must stay consistent as fighters, equipment, advancements, injuries, and
//! campaign events mutate the underlying records. Recomputing the whole
//! fighter tree on every read is correct but wasteful; patching caches ad
//! hoc is cheap but drifts. This crate keeps both paths behind one guard so
//! they never disagree and never both run for the same event.
//!
//! # Architecture
//!
//! Three layers, read leaf-first:
//!
//! - [`action`] -- The [`ActionBuilder`]: validated construction of
//!   immutable ledger entries (`before + delta == after` for every tracked
//!   quantity).
//! - [`ledger`] -- The [`ActionLog`]: append-only log with query and
//!   replay-verification methods.
//! - [`propagation`] -- The [`Engine`]: the readiness guard and the
//!   per-event handlers that translate one domain event into one action
//!   per affected roster plus an O(1) cache patch.
//!
//! Supporting modules: [`cost`] (pure cost derivation), [`recompute`]
//! (pull-based full rederivation), [`facts`] (dirty-flag bookkeeping and
//! the single safe read API), [`config`] (engine configuration).
//!
//! # The central invariant
//!
//! For every domain event exactly one of two paths runs:
//!
//! 1. **Propagation** -- allowed only when the roster has ledger history
//!    and its caches are clean; appends an action and patches caches
//!    incrementally.
//! 2. **Recompute** -- derives totals from scratch off the fighter tree;
//!    the only transition from `dirty` back to trustworthy.
//!
//! A guard rejection is a hard error ([`LedgerError::PropagationRejected`]),
//! not a silent cache patch. The ledger never panics; it returns errors.

pub mod action;
pub mod config;
pub mod cost;
pub mod facts;
pub mod ledger;
pub mod propagation;
pub mod recompute;

// Re-export primary types at crate root.
pub use action::ActionBuilder;
pub use config::{ConfigError, EngineConfig, PropagationConfig};
pub use facts::{debug_consistency_check, facts, facts_with_fallback, mark_dirty};
pub use ledger::{ActionLog, LedgerAnomaly, ReplayResult};
pub use propagation::{
    ActionParams, AdvancementParams, AssignmentChange, Engine, EventContext, FighterChange,
};
pub use recompute::{recompute, recompute_persist};

use underhive_types::{AssignmentId, FighterId, RosterId};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Why the propagation guard refused to run the incremental path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionReason {
    /// Propagation is disabled in the engine configuration.
    Disabled,
    /// The roster has no prior action, so its caches have never been
    /// proven by the ledger.
    NoHistory,
    /// The roster's dirty flag is set.
    Dirty,
}

impl core::fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Disabled => write!(f, "propagation disabled by configuration"),
            Self::NoHistory => write!(f, "roster has no ledger history"),
            Self::Dirty => write!(f, "roster caches are marked dirty"),
        }
    }
}

/// Errors that can occur in the propagation engine.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// A required field was not set on the builder.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// Checked arithmetic failed while deriving an after value or a cost.
    #[error("arithmetic overflow on {quantity}: {before} + {delta}")]
    Overflow {
        /// Which tracked quantity overflowed.
        quantity: &'static str,
        /// The value before the change.
        before: i64,
        /// The delta being applied.
        delta: i64,
    },

    /// The before values supplied with a delta do not match the roster's
    /// current cached values. This is a programmer error -- the caller
    /// captured its snapshot at the wrong time -- and aborts the event.
    #[error(
        "stale before value for {quantity} on roster {roster}: supplied {supplied}, roster has {actual}"
    )]
    DeltaMismatch {
        /// The affected roster.
        roster: RosterId,
        /// Which tracked quantity mismatched.
        quantity: &'static str,
        /// The before value the caller supplied.
        supplied: i64,
        /// The roster's actual cached value.
        actual: i64,
    },

    /// The propagation guard refused to run. Callers must fall back to a
    /// full recompute.
    #[error("propagation rejected for roster {roster}: {reason}")]
    PropagationRejected {
        /// The roster the event targeted.
        roster: RosterId,
        /// Why the guard refused.
        reason: RejectionReason,
    },

    /// Advancement was requested for a captured fighter.
    #[error("fighter {fighter} is captured and cannot advance")]
    FighterCaptured {
        /// The captured fighter.
        fighter: FighterId,
    },

    /// A capture-flow event was requested for a fighter that is not
    /// currently captured.
    #[error("fighter {fighter} is not captured")]
    NotCaptured {
        /// The fighter in question.
        fighter: FighterId,
    },

    /// An entity passed to a handler belongs to a different roster.
    #[error("fighter {fighter} belongs to roster {actual}, not {expected}")]
    WrongRoster {
        /// The misrouted fighter.
        fighter: FighterId,
        /// The roster the handler was invoked for.
        expected: RosterId,
        /// The roster the fighter actually belongs to.
        actual: RosterId,
    },

    /// An assignment passed to a handler belongs to a different fighter.
    #[error("assignment {assignment} belongs to fighter {actual}, not {expected}")]
    WrongFighter {
        /// The misrouted assignment.
        assignment: AssignmentId,
        /// The fighter the handler was invoked for.
        expected: FighterId,
        /// The fighter the assignment actually belongs to.
        actual: FighterId,
    },

    /// A fighter does not have enough experience for an advancement.
    #[error("fighter {fighter} has {have} XP, advancement needs {need}")]
    InsufficientXp {
        /// The fighter in question.
        fighter: FighterId,
        /// Current unspent XP.
        have: i64,
        /// XP the advancement requires.
        need: i64,
    },
}
