// Database models - Notebook
use serde::{Deserialize, Serialize};

/// Theme colours offered when creating a notebook
pub const NOTEBOOK_COLORS: [&str; 6] = [
    "#6366f1", "#ec4899", "#f59e0b", "#10b981", "#3b82f6", "#8b5cf6",
];

/// A named collection of recordings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notebook {
    pub id: String,
    pub name: String,
    pub color: String,
    /// Milliseconds since the Unix epoch
    pub created_at: i64,
}

impl Notebook {
    pub fn new(name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            color: color.into(),
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }
}
