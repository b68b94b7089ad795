use uuid::Uuid;

pub mod prelude;

pub mod comments;
pub mod messages;
pub mod notification_kind;
pub mod notifications;
pub mod posts;
pub mod subtables;
pub mod users;
pub mod votes;

/// A type alias that represents any Entity's internal id field data type.
/// Aliased so that it's easy to change the underlying type if necessary.
pub type Id = Uuid;
