//! Core business logic for CommunityWatch.
//!
//! Services own the rules of the application: reporting and upvoting issues,
//! moderator status changes with their reputation side effects, geo-semantic
//! search, duplicate detection and the weekly AI report. External
//! capabilities (the generative model and the geocoder) enter through the
//! [`GenerativeModel`] and [`Geocoder`] traits so they can be swapped out.

pub mod services;

pub use services::*;
