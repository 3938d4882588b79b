//! Database repositories.

pub mod comment;
pub mod issue;
pub mod notification;
pub mod upvote;
pub mod user;

pub use comment::CommentRepository;
pub use issue::IssueRepository;
pub use notification::NotificationRepository;
pub use upvote::UpvoteRepository;
pub use user::UserRepository;
