// crates/core/src/types.rs
use serde::{Deserialize, Serialize};

use crate::category::Category;

/// One snippet to classify, as it comes out of the row source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub text: String,
    pub created_at: String,
    pub modified_at: String,
}

impl Record {
    pub fn new(
        id: impl Into<String>,
        text: impl Into<String>,
        created_at: impl Into<String>,
        modified_at: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            created_at: created_at.into(),
            modified_at: modified_at.into(),
        }
    }
}

/// Validated result of one classification attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub reason: String,
    pub category: Category,
}

/// A finished classification as persisted in the completion store.
///
/// Field names follow the source sheet's columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionEntry {
    pub id: String,
    pub text: String,
    #[serde(rename = "created_datetime")]
    pub created_at: String,
    #[serde(rename = "modified_datetime")]
    pub modified_at: String,
    pub reason: String,
    pub category: Category,
}

impl CompletionEntry {
    /// Build the persisted tuple. The stored text has its line breaks folded
    /// into spaces so every entry stays on a single line.
    pub fn new(record: &Record, classification: Classification) -> Self {
        Self {
            id: record.id.clone(),
            text: normalize_newlines(&record.text),
            created_at: record.created_at.clone(),
            modified_at: record.modified_at.clone(),
            reason: classification.reason,
            category: classification.category,
        }
    }
}

/// Replace every line break (`\r\n`, `\n`, `\r`) with a single space.
pub fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n", " ").replace(['\n', '\r'], " ")
}
