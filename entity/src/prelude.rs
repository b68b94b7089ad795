pub use super::comments::Entity as Comments;
pub use super::messages::Entity as Messages;
pub use super::notifications::Entity as Notifications;
pub use super::posts::Entity as Posts;
pub use super::subtables::Entity as Subtables;
pub use super::users::Entity as Users;
pub use super::votes::Entity as Votes;
