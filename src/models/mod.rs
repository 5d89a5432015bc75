//! Data models for the Word Book application.
//!
//! These models match the frontend TypeScript records so exported documents
//! stay interchangeable with the browser build.

mod book;
mod export;
mod settings;
mod word;

pub use book::*;
pub use export::*;
pub use settings::*;
pub use word::*;

use chrono::{SecondsFormat, Utc};

/// Current time as a store timestamp.
///
/// Millisecond precision with a `Z` suffix so timestamps sort lexicographically.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Revision information for change detection.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionInfo {
    pub revision_id: i64,
    pub schema_version: i64,
    pub generated_at: String,
}
