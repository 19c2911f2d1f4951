//! The atomic apply: actions and cache updates in one transaction.
//!
//! The engine's in-memory discipline (validate everything, then mutate)
//! extends across processes here: one transaction locks every affected
//! roster row, inserts every action, applies every cached-field update,
//! and commits. Multi-roster events -- ransom returns, guilder sales --
//! either land on both rosters or on neither.
//!
//! Roster rows are locked in ascending id order so two concurrent
//! multi-roster events touching the same pair cannot deadlock against
//! each other.

use sqlx::PgPool;

use underhive_types::{Action, ActionId, RosterId};

use crate::action_store::insert_chunk;
use crate::error::DbError;
use crate::roster_store::fetch_for_update;

/// The new cached-field values for one roster, to be written together
/// with the actions that justify them.
#[derive(Debug, Clone)]
pub struct RosterCacheUpdate {
    /// The roster to update.
    pub roster: RosterId,
    /// New cached rating.
    pub rating_current: i64,
    /// New cached stash value.
    pub stash_current: i64,
    /// New credit balance.
    pub credits_current: i64,
    /// New dirty flag (false after a persisting recompute).
    pub dirty: bool,
    /// New latest-action pointer.
    pub latest_action: Option<ActionId>,
}

/// Persist one domain event: all its actions plus all its roster cache
/// updates, atomically.
///
/// Locks the affected roster rows (ascending id order), inserts the
/// actions, applies the updates, commits. If anything fails -- including
/// a CHECK constraint rejecting a malformed value -- the transaction
/// rolls back and no roster is touched.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if an updated roster does not exist, or
/// [`DbError::Postgres`] if any statement fails.
pub async fn apply_atomic(
    pool: &PgPool,
    updates: &[RosterCacheUpdate],
    actions: &[Action],
) -> Result<(), DbError> {
    let mut tx = pool.begin().await?;

    // Lock every affected roster row first, in a stable order.
    let mut roster_ids: Vec<RosterId> = updates.iter().map(|u| u.roster).collect();
    roster_ids.sort_unstable();
    roster_ids.dedup();
    for id in &roster_ids {
        fetch_for_update(&mut *tx, *id).await?;
    }

    insert_chunk(&mut *tx, actions).await?;

    for update in updates {
        let result = sqlx::query(
            r"UPDATE rosters
              SET rating_current = $2, stash_current = $3, credits_current = $4, dirty = $5, latest_action_id = $6
              WHERE id = $1",
        )
        .bind(update.roster.into_inner())
        .bind(update.rating_current)
        .bind(update.stash_current)
        .bind(update.credits_current)
        .bind(update.dirty)
        .bind(update.latest_action.map(ActionId::into_inner))
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("roster {}", update.roster)));
        }
    }

    tx.commit().await?;

    tracing::debug!(
        rosters = roster_ids.len(),
        actions = actions.len(),
        "Applied event atomically"
    );
    Ok(())
}
