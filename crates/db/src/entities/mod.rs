//! Database entities.

#![allow(missing_docs)]

pub mod comment;
pub mod issue;
pub mod notification;
pub mod upvote;
pub mod user;

pub use comment::Entity as Comment;
pub use issue::Entity as Issue;
pub use notification::Entity as Notification;
pub use upvote::Entity as Upvote;
pub use user::Entity as User;
