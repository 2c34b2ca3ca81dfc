//! Ranked search results.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A ranked projection of an indexed document.
///
/// Highlights are filled in by the engine after ranking; they never influence
/// which documents are returned or in what order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub id: Option<i64>,
    pub title: String,
    pub body: String,
    pub category: String,
    pub author: String,
    pub tags: String,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
    pub score: f32,
    pub highlighted_title: Option<String>,
    pub highlighted_body: Option<String>,
}
