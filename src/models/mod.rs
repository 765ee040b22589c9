pub mod entity;
pub mod follow;
pub mod moderator;
pub mod notifiable;
pub mod notification;

pub use entity::{Article, Comment, Organization, SpamFootprint, User};
pub use follow::{Follow, FollowableRef};
pub use moderator::Moderator;
pub use notifiable::{NotifiableKind, UnknownNotifiable};
pub use notification::{
    AggregateState, Notification, NotificationKey, NotificationWrite, Recipient, Reconciled,
};
