use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Public view of a user account. The password never leaves the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: i64,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodEntry {
    pub id: i64,
    pub emotion: String,
    pub intensity: i64,
    pub note: String,
    pub timestamp: DateTime<Utc>,
    pub user_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackEntry {
    pub id: i64,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub user_id: i64,
}

/// A record joined with its owner. `owner` is `None` for orphaned rows.
#[derive(Debug, Clone, Serialize)]
pub struct Owned<T> {
    pub record: T,
    pub owner: Option<Identity>,
}

#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct MoodForm {
    pub emotion: String,
    pub intensity: String,
    pub note: String,
    #[serde(default)]
    pub feedback: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FeedbackForm {
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmotionCount {
    pub emotion: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodSummary {
    pub histogram: Vec<EmotionCount>,
    pub dominant_emotion: Option<String>,
    pub color: String,
    pub negative_streak: usize,
    pub streak_alert: Option<String>,
    pub advice: String,
    pub chart_labels: Vec<String>,
    pub chart_intensities: Vec<i64>,
}
