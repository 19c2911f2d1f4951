//! Persistence for the append-only `actions` ledger table.
//!
//! Actions are inserted in batches and never updated or deleted -- no
//! UPDATE or DELETE statement for this table exists anywhere in the crate.
//! Rows are keyed by UUID v7 action ids, so primary-key order is
//! insertion order and the audit trail reads back in sequence.

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use underhive_types::{Action, ActionKind, AssignmentId, FighterId, RosterId, Subject};

use crate::error::DbError;

/// Default batch size for action inserts.
const DEFAULT_BATCH_SIZE: usize = 100;

/// Operations on the `actions` table.
pub struct ActionStore<'a> {
    pool: &'a PgPool,
    batch_size: usize,
}

impl<'a> ActionStore<'a> {
    /// Create a new action store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            pool,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Set the batch size for inserts.
    #[must_use]
    pub const fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Batch-insert actions into the `actions` table.
    ///
    /// Entries are inserted using multi-row UNNEST for efficiency; each
    /// batch is wrapped in a transaction. For inserts that must commit
    /// together with roster cache updates, use
    /// [`apply_atomic`](crate::apply_atomic) instead.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the insert fails.
    pub async fn batch_insert(&self, actions: &[Action]) -> Result<(), DbError> {
        if actions.is_empty() {
            return Ok(());
        }

        for chunk in actions.chunks(self.batch_size) {
            let mut tx = self.pool.begin().await?;
            insert_chunk(&mut *tx, chunk).await?;
            tx.commit().await?;
        }

        tracing::debug!(count = actions.len(), "Inserted actions (batch UNNEST)");
        Ok(())
    }

    /// Query all actions for a roster, in ledger order.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn by_roster(&self, roster: RosterId) -> Result<Vec<ActionRow>, DbError> {
        let rows = sqlx::query_as::<_, ActionRow>(
            r"SELECT id, roster_id, kind::TEXT as kind, rating_delta, stash_delta, credits_delta, rating_before, stash_before, credits_before, subject_kind::TEXT as subject_kind, subject_id, description, is_applied, campaign_action_id, user_id, created_at
              FROM actions
              WHERE roster_id = $1
              ORDER BY id",
        )
        .bind(roster.into_inner())
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    /// Query all actions about a given subject, in ledger order.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn by_subject(&self, subject: Subject) -> Result<Vec<ActionRow>, DbError> {
        let (kind, id) = subject_to_db(subject);
        let rows = sqlx::query_as::<_, ActionRow>(
            r"SELECT id, roster_id, kind::TEXT as kind, rating_delta, stash_delta, credits_delta, rating_before, stash_before, credits_before, subject_kind::TEXT as subject_kind, subject_id, description, is_applied, campaign_action_id, user_id, created_at
              FROM actions
              WHERE subject_kind = $1::subject_kind AND subject_id = $2
              ORDER BY id",
        )
        .bind(kind)
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }
}

/// Insert one chunk of actions on an open connection.
///
/// Shared between [`ActionStore::batch_insert`] and the atomic apply,
/// which must insert inside a caller-owned transaction.
pub(crate) async fn insert_chunk(
    conn: &mut PgConnection,
    chunk: &[Action],
) -> Result<(), DbError> {
    let len = chunk.len();
    let mut ids = Vec::with_capacity(len);
    let mut roster_ids = Vec::with_capacity(len);
    let mut kinds = Vec::with_capacity(len);
    let mut rating_deltas = Vec::with_capacity(len);
    let mut stash_deltas = Vec::with_capacity(len);
    let mut credits_deltas = Vec::with_capacity(len);
    let mut rating_befores = Vec::with_capacity(len);
    let mut stash_befores = Vec::with_capacity(len);
    let mut credits_befores = Vec::with_capacity(len);
    let mut subject_kinds: Vec<Option<String>> = Vec::with_capacity(len);
    let mut subject_ids: Vec<Option<Uuid>> = Vec::with_capacity(len);
    let mut descriptions = Vec::with_capacity(len);
    let mut applied_flags = Vec::with_capacity(len);
    let mut campaign_action_ids: Vec<Option<Uuid>> = Vec::with_capacity(len);
    let mut user_ids = Vec::with_capacity(len);
    let mut timestamps = Vec::with_capacity(len);

    for action in chunk {
        ids.push(action.id.into_inner());
        roster_ids.push(action.roster.into_inner());
        kinds.push(kind_to_db(action.kind).to_owned());
        rating_deltas.push(action.rating_delta);
        stash_deltas.push(action.stash_delta);
        credits_deltas.push(action.credits_delta);
        rating_befores.push(action.rating_before);
        stash_befores.push(action.stash_before);
        credits_befores.push(action.credits_before);
        let (subject_kind, subject_id) = match action.subject {
            Some(subject) => {
                let (kind, id) = subject_to_db(subject);
                (Some(kind.to_owned()), Some(id))
            }
            None => (None, None),
        };
        subject_kinds.push(subject_kind);
        subject_ids.push(subject_id);
        descriptions.push(action.description.clone());
        applied_flags.push(action.is_applied);
        campaign_action_ids.push(action.campaign_action);
        user_ids.push(action.user.into_inner());
        timestamps.push(action.created_at);
    }

    sqlx::query(
        r"INSERT INTO actions (id, roster_id, kind, rating_delta, stash_delta, credits_delta, rating_before, stash_before, credits_before, subject_kind, subject_id, description, is_applied, campaign_action_id, user_id, created_at)
          SELECT * FROM UNNEST($1::UUID[], $2::UUID[], $3::action_kind[], $4::BIGINT[], $5::BIGINT[], $6::BIGINT[], $7::BIGINT[], $8::BIGINT[], $9::BIGINT[], $10::subject_kind[], $11::UUID[], $12::TEXT[], $13::BOOLEAN[], $14::UUID[], $15::UUID[], $16::TIMESTAMPTZ[])",
    )
    .bind(&ids)
    .bind(&roster_ids)
    .bind(&kinds)
    .bind(&rating_deltas)
    .bind(&stash_deltas)
    .bind(&credits_deltas)
    .bind(&rating_befores)
    .bind(&stash_befores)
    .bind(&credits_befores)
    .bind(&subject_kinds)
    .bind(&subject_ids)
    .bind(&descriptions)
    .bind(&applied_flags)
    .bind(&campaign_action_ids)
    .bind(&user_ids)
    .bind(&timestamps)
    .execute(conn)
    .await?;

    Ok(())
}

/// A row from the `actions` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ActionRow {
    /// Action UUID.
    pub id: Uuid,
    /// Owning roster UUID.
    pub roster_id: Uuid,
    /// Action kind as a string (cast from the `PostgreSQL` enum).
    pub kind: String,
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
    /// Subject kind as a string, when a subject is recorded.
    pub subject_kind: Option<String>,
    /// Subject UUID.
    pub subject_id: Option<Uuid>,
    /// Free-text audit description.
    pub description: String,
    /// Whether the delta was applied to the roster caches.
    pub is_applied: bool,
    /// Campaign-level action link.
    pub campaign_action_id: Option<Uuid>,
    /// Acting user UUID.
    pub user_id: Uuid,
    /// Real-world timestamp.
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl ActionRow {
    /// Convert the row back into a domain [`Action`].
    ///
    /// # Errors
    ///
    /// Returns [`DbError::UnknownEnum`] if a stored enum string does not
    /// map to a known variant.
    pub fn into_action(self) -> Result<Action, DbError> {
        let kind = kind_from_db(&self.kind)?;
        let subject = match (self.subject_kind.as_deref(), self.subject_id) {
            (Some(kind), Some(id)) => Some(subject_from_db(kind, id)?),
            _ => None,
        };
        Ok(Action {
            id: self.id.into(),
            roster: self.roster_id.into(),
            kind,
            rating_delta: self.rating_delta,
            stash_delta: self.stash_delta,
            credits_delta: self.credits_delta,
            rating_before: self.rating_before,
            stash_before: self.stash_before,
            credits_before: self.credits_before,
            subject,
            description: self.description,
            is_applied: self.is_applied,
            campaign_action: self.campaign_action_id,
            user: self.user_id.into(),
            created_at: self.created_at,
        })
    }
}

/// Convert an [`ActionKind`] to its `PostgreSQL` enum string.
pub(crate) const fn kind_to_db(kind: ActionKind) -> &'static str {
    match kind {
        ActionKind::HireFighter => "hire_fighter",
        ActionKind::CloneFighter => "clone_fighter",
        ActionKind::UpdateFighter => "update_fighter",
        ActionKind::CaptureFighter => "capture_fighter",
        ActionKind::ReturnFighter => "return_fighter",
        ActionKind::SellFighter => "sell_fighter",
        ActionKind::AddAssignment => "add_assignment",
        ActionKind::RemoveAssignment => "remove_assignment",
        ActionKind::UpdateAssignment => "update_assignment",
        ActionKind::ReassignEquipment => "reassign_equipment",
        ActionKind::SellEquipment => "sell_equipment",
        ActionKind::ApplyAdvancement => "apply_advancement",
        ActionKind::CampaignBudget => "campaign_budget",
        ActionKind::Resync => "resync",
    }
}

/// Convert a stored enum string back to an [`ActionKind`].
fn kind_from_db(value: &str) -> Result<ActionKind, DbError> {
    match value {
        "hire_fighter" => Ok(ActionKind::HireFighter),
        "clone_fighter" => Ok(ActionKind::CloneFighter),
        "update_fighter" => Ok(ActionKind::UpdateFighter),
        "capture_fighter" => Ok(ActionKind::CaptureFighter),
        "return_fighter" => Ok(ActionKind::ReturnFighter),
        "sell_fighter" => Ok(ActionKind::SellFighter),
        "add_assignment" => Ok(ActionKind::AddAssignment),
        "remove_assignment" => Ok(ActionKind::RemoveAssignment),
        "update_assignment" => Ok(ActionKind::UpdateAssignment),
        "reassign_equipment" => Ok(ActionKind::ReassignEquipment),
        "sell_equipment" => Ok(ActionKind::SellEquipment),
        "apply_advancement" => Ok(ActionKind::ApplyAdvancement),
        "campaign_budget" => Ok(ActionKind::CampaignBudget),
        "resync" => Ok(ActionKind::Resync),
        other => Err(DbError::UnknownEnum {
            column: "kind",
            value: other.to_owned(),
        }),
    }
}

/// Split a [`Subject`] into its `PostgreSQL` enum string and UUID.
const fn subject_to_db(subject: Subject) -> (&'static str, Uuid) {
    match subject {
        Subject::Fighter(id) => ("fighter", id.into_inner()),
        Subject::Assignment(id) => ("assignment", id.into_inner()),
    }
}

/// Rebuild a [`Subject`] from its stored parts.
fn subject_from_db(kind: &str, id: Uuid) -> Result<Subject, DbError> {
    match kind {
        "fighter" => Ok(Subject::Fighter(FighterId::from(id))),
        "assignment" => Ok(Subject::Assignment(AssignmentId::from(id))),
        other => Err(DbError::UnknownEnum {
            column: "subject_kind",
            value: other.to_owned(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_mapping_roundtrips() {
        let kinds = [
            ActionKind::HireFighter,
            ActionKind::CloneFighter,
            ActionKind::UpdateFighter,
            ActionKind::CaptureFighter,
            ActionKind::ReturnFighter,
            ActionKind::SellFighter,
            ActionKind::AddAssignment,
            ActionKind::RemoveAssignment,
            ActionKind::UpdateAssignment,
            ActionKind::ReassignEquipment,
            ActionKind::SellEquipment,
            ActionKind::ApplyAdvancement,
            ActionKind::CampaignBudget,
            ActionKind::Resync,
        ];
        for kind in kinds {
            assert_eq!(kind_from_db(kind_to_db(kind)).ok(), Some(kind));
        }
    }

    #[test]
    fn unknown_kind_is_an_error() {
        assert!(matches!(
            kind_from_db("bribe_the_arbitrator").err(),
            Some(DbError::UnknownEnum { column: "kind", .. })
        ));
    }

    #[test]
    fn subject_mapping_roundtrips() {
        let fighter = Subject::Fighter(FighterId::new());
        let (kind, id) = subject_to_db(fighter);
        assert_eq!(subject_from_db(kind, id).ok(), Some(fighter));

        let assignment = Subject::Assignment(AssignmentId::new());
        let (kind, id) = subject_to_db(assignment);
        assert_eq!(subject_from_db(kind, id).ok(), Some(assignment));
    }
}
