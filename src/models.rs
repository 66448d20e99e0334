use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// Fixture records carry more fields than the metric formulas consume
// (titles, bodies, tags). Anything not modeled explicitly lands in a
// flattened map so writing a file back never drops data.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreadStatus {
    Open,
    Answered,
    Resolved,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    pub id: String,
    pub course_id: String,
    pub status: ThreadStatus,
    pub created_at: DateTime<Utc>,
    #[serde(rename = "hasAIAnswer", default)]
    pub has_ai_answer: bool,
    #[serde(default)]
    pub views: u32,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub thread_id: String,
    pub author_id: String,
    #[serde(default)]
    pub endorsed: bool,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub role: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: String,
    pub enrollment_count: u32,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Citation {
    pub relevance: f64,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiAnswer {
    pub id: String,
    pub thread_id: String,
    pub confidence_score: f64,
    #[serde(default)]
    pub citations: Vec<Citation>,
    #[serde(default)]
    pub student_endorsements: u32,
    #[serde(default)]
    pub instructor_endorsements: u32,
    #[serde(default)]
    pub instructor_endorsed: bool,
    #[serde(default)]
    pub total_endorsements: u32,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}
