use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Closed set of entity kinds a notification can point at. Free-form type
/// tags are rejected at the boundary instead of being resolved at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotifiableKind {
    Article,
    Comment,
    Follow,
    Mention,
    ListingEndorsement,
    BadgeAchievement,
}

impl NotifiableKind {
    /// Kinds that may be targeted by bulk removal. Guards spam cleanup and
    /// deletion cascades against wiping rows of unrelated kinds.
    pub fn bulk_removable(self) -> bool {
        matches!(self, Self::Article | Self::Comment | Self::Mention)
    }

    /// Kinds that can be flagged for moderator review.
    pub fn moderatable(self) -> bool {
        matches!(self, Self::Article | Self::Comment)
    }

    /// Kinds whose embedded snapshots can be rebuilt from source entities.
    pub fn resyncable(self) -> bool {
        matches!(self, Self::Article | Self::Comment)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Article => "Article",
            Self::Comment => "Comment",
            Self::Follow => "Follow",
            Self::Mention => "Mention",
            Self::ListingEndorsement => "ListingEndorsement",
            Self::BadgeAchievement => "BadgeAchievement",
        }
    }

    /// Lowercase key used for the entity's slot inside `json_data`.
    pub fn json_key(self) -> &'static str {
        match self {
            Self::Article => "article",
            Self::Comment => "comment",
            Self::Follow => "follow",
            Self::Mention => "mention",
            Self::ListingEndorsement => "listing_endorsement",
            Self::BadgeAchievement => "badge_achievement",
        }
    }
}

impl fmt::Display for NotifiableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotifiableKind {
    type Err = UnknownNotifiable;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Article" => Ok(Self::Article),
            "Comment" => Ok(Self::Comment),
            "Follow" => Ok(Self::Follow),
            "Mention" => Ok(Self::Mention),
            "ListingEndorsement" => Ok(Self::ListingEndorsement),
            "BadgeAchievement" => Ok(Self::BadgeAchievement),
            other => Err(UnknownNotifiable(other.to_string())),
        }
    }
}

/// A type tag outside the closed set, e.g. read back from a foreign row.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown notifiable type: {0}")]
pub struct UnknownNotifiable(pub String);
