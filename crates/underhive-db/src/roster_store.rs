//! Persistence for roster rows and their cached totals.
//!
//! The roster row is the unit of mutation for the propagation engine:
//! every write to the cached fields happens inside the same transaction
//! as the action that justifies it (see [`apply_atomic`]). This store
//! provides the simple pool-level operations plus the row-locking fetch
//! the atomic apply builds on.
//!
//! [`apply_atomic`]: crate::apply_atomic

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use underhive_types::{Roster, RosterId};

use crate::error::DbError;

/// Operations on the `rosters` table.
pub struct RosterStore<'a> {
    pool: &'a PgPool,
}

impl<'a> RosterStore<'a> {
    /// Create a new roster store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a roster row.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the insert fails.
    pub async fn insert(&self, roster: &Roster) -> Result<(), DbError> {
        sqlx::query(
            r"INSERT INTO rosters (id, owner_id, name, campaign_id, rating_current, stash_current, credits_current, dirty, latest_action_id, archived)
              VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(roster.id.into_inner())
        .bind(roster.owner.into_inner())
        .bind(&roster.name)
        .bind(roster.campaign.map(underhive_types::CampaignId::into_inner))
        .bind(roster.rating_current)
        .bind(roster.stash_current)
        .bind(roster.credits_current)
        .bind(roster.dirty)
        .bind(roster.latest_action.map(underhive_types::ActionId::into_inner))
        .bind(roster.archived)
        .execute(self.pool)
        .await?;

        tracing::debug!(roster = %roster.id, "Inserted roster");
        Ok(())
    }

    /// Fetch a roster by id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if no row exists, or
    /// [`DbError::Postgres`] if the query fails.
    pub async fn fetch(&self, id: RosterId) -> Result<Roster, DbError> {
        let row = sqlx::query_as::<_, RosterRow>(
            r"SELECT id, owner_id, name, campaign_id, rating_current, stash_current, credits_current, dirty, latest_action_id, archived
              FROM rosters
              WHERE id = $1",
        )
        .bind(id.into_inner())
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::NotFound(format!("roster {id}")))?;

        Ok(row.into_roster())
    }

    /// Set a roster's dirty flag.
    ///
    /// The `Fresh -> Dirty` transition in storage; the reverse direction
    /// only happens through a persisting recompute via [`apply_atomic`].
    ///
    /// [`apply_atomic`]: crate::apply_atomic
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the update fails.
    pub async fn mark_dirty(&self, id: RosterId) -> Result<(), DbError> {
        sqlx::query(r"UPDATE rosters SET dirty = TRUE WHERE id = $1")
            .bind(id.into_inner())
            .execute(self.pool)
            .await?;

        tracing::debug!(roster = %id, "Marked roster dirty");
        Ok(())
    }
}

/// Fetch a roster row under `SELECT ... FOR UPDATE`.
///
/// Must run on a connection inside an open transaction; the lock is held
/// until that transaction commits or rolls back. Concurrent propagation
/// on the same roster serializes here.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists, or
/// [`DbError::Postgres`] if the query fails.
pub async fn fetch_for_update(
    conn: &mut PgConnection,
    id: RosterId,
) -> Result<Roster, DbError> {
    let row = sqlx::query_as::<_, RosterRow>(
        r"SELECT id, owner_id, name, campaign_id, rating_current, stash_current, credits_current, dirty, latest_action_id, archived
          FROM rosters
          WHERE id = $1
          FOR UPDATE",
    )
    .bind(id.into_inner())
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| DbError::NotFound(format!("roster {id}")))?;

    Ok(row.into_roster())
}

/// A row from the `rosters` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RosterRow {
    /// Roster UUID.
    pub id: Uuid,
    /// Owning user UUID.
    pub owner_id: Uuid,
    /// Gang name.
    pub name: String,
    /// Campaign UUID, when enrolled.
    pub campaign_id: Option<Uuid>,
    /// Cached rating.
    pub rating_current: i64,
    /// Cached stash value.
    pub stash_current: i64,
    /// Credit balance.
    pub credits_current: i64,
    /// Dirty flag.
    pub dirty: bool,
    /// Latest applied action UUID.
    pub latest_action_id: Option<Uuid>,
    /// Soft-delete marker.
    pub archived: bool,
}

impl RosterRow {
    /// Convert the row into a domain [`Roster`].
    pub fn into_roster(self) -> Roster {
        Roster {
            id: self.id.into(),
            owner: self.owner_id.into(),
            name: self.name,
            campaign: self.campaign_id.map(Into::into),
            rating_current: self.rating_current,
            stash_current: self.stash_current,
            credits_current: self.credits_current,
            dirty: self.dirty,
            latest_action: self.latest_action_id.map(Into::into),
            archived: self.archived,
        }
    }
}
