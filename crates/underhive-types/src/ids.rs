//! Type-safe identifier wrappers around [`Uuid`].
//!
//! Every entity in the roster engine has a strongly-typed ID to prevent
//! accidental mixing of identifiers at compile time. All IDs use UUID v7
//! (time-ordered) so the append-only `actions` table stays naturally
//! ordered under its primary-key index.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for a roster (a user's gang).
    RosterId
}

define_id! {
    /// Unique identifier for a fighter on a roster.
    FighterId
}

define_id! {
    /// Unique identifier for an equipment assignment on a fighter.
    AssignmentId
}

define_id! {
    /// Unique identifier for a piece of equipment in the content catalog.
    EquipmentId
}

define_id! {
    /// Unique identifier for an action (ledger entry).
    ActionId
}

define_id! {
    /// Unique identifier for a campaign.
    CampaignId
}

define_id! {
    /// Unique identifier for the acting user, for audit attribution.
    UserId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_distinct_types() {
        let roster = RosterId::new();
        let fighter = FighterId::new();
        // These are different types -- the compiler enforces no mixing.
        assert_ne!(roster.into_inner(), Uuid::nil());
        assert_ne!(fighter.into_inner(), Uuid::nil());
    }

    #[test]
    fn id_roundtrip_serde() {
        let original = ActionId::new();
        let json = serde_json::to_string(&original).ok();
        assert!(json.is_some());
        let restored: Result<ActionId, _> =
            serde_json::from_str(json.as_deref().unwrap_or(""));
        assert!(restored.is_ok());
    }

    #[test]
    fn id_display_matches_uuid() {
        let id = RosterId::new();
        assert_eq!(id.to_string(), id.into_inner().to_string());
    }

    #[test]
    fn v7_ids_are_time_ordered() {
        let first = ActionId::new();
        let second = ActionId::new();
        assert!(first <= second);
    }
}
