//! Business logic services.

#![allow(missing_docs)]

pub mod ai;
pub mod duplicate;
pub mod gemini;
pub mod geocoding;
pub mod issue;
pub mod matcher;
pub mod notification;
pub mod report;
pub mod reputation;
pub mod user;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use ai::{AiService, EmbeddingTask, GenerativeModel, ImageClassification, ImageInput, UnconfiguredModel};
pub use duplicate::{DuplicateCandidate, DuplicateCheck, DuplicateService};
pub use gemini::GeminiClient;
pub use geocoding::{Geocoder, GeocodingService, NominatimGeocoder};
pub use issue::{
    CommentInput, IssueDetail, IssueService, MapIssue, ReportIssueInput, UpvoteResult,
};
pub use matcher::{SearchOutcome, SearchService};
pub use notification::{NotificationPage, NotificationPayload, NotificationService, NotificationView};
pub use report::{Analytics, ReportService};
pub use user::{LoginInput, PublicUser, RegisterInput, UserProfile, UserService};
