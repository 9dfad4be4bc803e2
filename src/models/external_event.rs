use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Aggregator record sourced outside the organizer workflow. Read-only
/// from this service's perspective.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ExternalEvent {
    pub id: i64,
    pub title: String,
    pub venue: Option<String>,
    pub city: Option<String>,
    pub source_url: Option<String>,
    pub occurs_at: DateTime<Utc>,
    pub display_priority: i32,
    pub created_at: DateTime<Utc>,
}
