//! Issue entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Issue lifecycle status.
///
/// Moderators may move an issue between any two states; only the side
/// effects of entering `Resolved` are special.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum IssueStatus {
    #[sea_orm(string_value = "Reported")]
    #[serde(rename = "Reported")]
    Reported,
    #[sea_orm(string_value = "In Progress")]
    #[serde(rename = "In Progress")]
    InProgress,
    #[sea_orm(string_value = "Resolved")]
    #[serde(rename = "Resolved")]
    Resolved,
}

impl IssueStatus {
    /// Display label, identical to the stored value.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Reported => "Reported",
            Self::InProgress => "In Progress",
            Self::Resolved => "Resolved",
        }
    }
}

impl std::fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "issue")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// One of the fixed category labels
    pub category: String,

    /// Sanitized free-text description
    #[sea_orm(column_type = "Text")]
    pub description: String,

    pub latitude: f64,

    pub longitude: f64,

    /// Human-readable location as typed by the reporter
    #[sea_orm(nullable)]
    pub location_text: Option<String>,

    pub status: IssueStatus,

    #[sea_orm(default_value = 0)]
    pub upvote_count: i32,

    /// Text embedding of the description (array of floats)
    #[sea_orm(column_type = "JsonBinary", nullable)]
    #[serde(skip_serializing)]
    pub embedding: Option<Json>,

    /// Optional GeoJSON geometry drawn on the map
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub geojson: Option<Json>,

    pub reporter_id: String,

    pub created_at: DateTimeWithTimeZone,
}

impl Model {
    /// Decode the stored embedding, if present and well-formed.
    #[must_use]
    pub fn embedding_vector(&self) -> Option<Vec<f64>> {
        self.embedding
            .as_ref()
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::ReporterId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Reporter,

    #[sea_orm(has_many = "super::comment::Entity")]
    Comments,

    #[sea_orm(has_many = "super::upvote::Entity")]
    Upvotes,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reporter.def()
    }
}

impl Related<super::comment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comments.def()
    }
}

impl Related<super::upvote::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Upvotes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
