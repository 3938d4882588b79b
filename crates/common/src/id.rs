//! Record keys and session tokens.
//!
//! Users, issues, comments and notifications are keyed by lowercase ULIDs.
//! Their creation order matches key order, so sorting by id is a stable
//! tie-break after a timestamp sort.

use ulid::Ulid;
use uuid::Uuid;

/// Length of a record key.
pub const RECORD_ID_LEN: usize = 26;

/// Issues record keys and login tokens.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdGenerator;

impl IdGenerator {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Key for a newly inserted row.
    #[must_use]
    pub fn generate(&self) -> String {
        Ulid::new().to_string().to_ascii_lowercase()
    }

    /// Session token handed out on login. Random, never time-derived.
    #[must_use]
    pub fn generate_token(&self) -> String {
        Uuid::new_v4().simple().to_string()
    }
}
