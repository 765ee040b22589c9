use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::notification::Recipient;

/// The entity being followed. Only users and organizations accumulate
/// follow aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FollowableRef {
    User(i64),
    Organization(i64),
}

impl FollowableRef {
    /// Recipient of the "new followers" aggregate: the followed party itself.
    pub fn owner(self) -> Recipient {
        match self {
            Self::User(id) => Recipient::User(id),
            Self::Organization(id) => Recipient::Organization(id),
        }
    }

    pub fn type_name(self) -> &'static str {
        match self {
            Self::User(_) => "User",
            Self::Organization(_) => "Organization",
        }
    }

    pub fn id(self) -> i64 {
        match self {
            Self::User(id) | Self::Organization(id) => id,
        }
    }
}

/// Read-only follow event, owned by the upstream application. Source of
/// truth for the rolling-window aggregate; never mutated here.
#[derive(Debug, Clone)]
pub struct Follow {
    pub id: i64,
    pub follower_id: i64,
    pub followable: FollowableRef,
    pub created_at: DateTime<Utc>,
}
