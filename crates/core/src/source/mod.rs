// crates/core/src/source/mod.rs
//! Row sources: where the records to classify come from.

pub mod sheets;

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::SourceError;
use crate::types::Record;

pub use sheets::{SheetsConfig, SheetsRowSource};

pub const ID_COLUMN: &str = "id";
pub const TEXT_COLUMN: &str = "text";
pub const CREATED_COLUMN: &str = "created_datetime";
pub const MODIFIED_COLUMN: &str = "modified_datetime";

/// Read-only, ordered supply of records. Fetched once per run.
#[async_trait]
pub trait RowSource: Send + Sync {
    async fn fetch_all(&self) -> Result<Vec<Record>, SourceError>;
}

/// Records held in memory.
#[derive(Debug, Clone, Default)]
pub struct VecRowSource {
    records: Vec<Record>,
}

impl VecRowSource {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }
}

#[async_trait]
impl RowSource for VecRowSource {
    async fn fetch_all(&self) -> Result<Vec<Record>, SourceError> {
        Ok(self.records.clone())
    }
}

/// Turn a header-keyed grid into records.
///
/// The first row is the header and must contain the `id`, `text`,
/// `created_datetime` and `modified_datetime` columns (extra columns are
/// ignored). Short rows are padded with empty cells and rows with no
/// content at all are dropped.
pub fn records_from_values(values: Vec<Vec<String>>) -> Result<Vec<Record>, SourceError> {
    let mut rows = values.into_iter();
    let Some(header) = rows.next() else {
        return Ok(Vec::new());
    };

    let positions: HashMap<&str, usize> = header
        .iter()
        .enumerate()
        .map(|(idx, name)| (name.trim(), idx))
        .collect();
    let column = |name: &str| {
        positions
            .get(name)
            .copied()
            .ok_or_else(|| SourceError::MissingColumn(name.to_string()))
    };

    let id_col = column(ID_COLUMN)?;
    let text_col = column(TEXT_COLUMN)?;
    let created_col = column(CREATED_COLUMN)?;
    let modified_col = column(MODIFIED_COLUMN)?;

    let records = rows
        .filter(|row| row.iter().any(|c| !c.trim().is_empty()))
        .map(|row| Record {
            id: cell(&row, id_col).trim().to_string(),
            text: cell(&row, text_col),
            created_at: cell(&row, created_col),
            modified_at: cell(&row, modified_col),
        })
        .collect();
    Ok(records)
}

fn cell(row: &[String], idx: usize) -> String {
    row.get(idx).cloned().unwrap_or_default()
}
