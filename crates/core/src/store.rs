// crates/core/src/store.rs
//! Append-only completion store.
//!
//! One finished classification per line. The set of ids in the file is the
//! only resume checkpoint: a run skips every id it finds here.
//!
//! Only one process may append to a given store at a time. Nothing here
//! locks the file.

use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::category::Category;
use crate::error::StoreError;
use crate::types::CompletionEntry;

const TSV_FIELDS: usize = 6;

/// On-disk line format, picked from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreFormat {
    /// One JSON object per line.
    JsonLines,
    /// Legacy tab-separated `id, text, created, modified, reason, category`.
    Tsv,
}

impl StoreFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("tsv") => Self::Tsv,
            _ => Self::JsonLines,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompletionStore {
    path: PathBuf,
    format: StoreFormat,
}

impl CompletionStore {
    /// Open the store, creating its directory and an empty file if needed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| StoreError::io(&path, e))?;

        let format = StoreFormat::from_path(&path);
        tracing::debug!(path = %path.display(), ?format, "completion store ready");
        Ok(Self { path, format })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> StoreFormat {
        self.format
    }

    /// Ids of every entry already in the store.
    ///
    /// Any malformed non-blank line fails the whole load. Legacy TSV rows are
    /// only checked for their field count, since older runs stored whatever
    /// label the model returned.
    pub fn load_existing_ids(&self) -> Result<HashSet<String>, StoreError> {
        let mut ids = HashSet::new();
        self.for_each_line(|line_no, line| {
            let id = match self.format {
                StoreFormat::Tsv => split_tsv(line)
                    .map(|fields| fields[0].to_string())
                    .map_err(|message| self.malformed(line_no, message))?,
                StoreFormat::JsonLines => decode_json_line(line)
                    .map(|entry| entry.id)
                    .map_err(|message| self.malformed(line_no, message))?,
            };
            ids.insert(id);
            Ok(())
        })?;
        Ok(ids)
    }

    /// Every entry in file order, fully validated.
    pub fn entries(&self) -> Result<Vec<CompletionEntry>, StoreError> {
        let mut entries = Vec::new();
        self.for_each_line(|line_no, line| {
            let entry = match self.format {
                StoreFormat::Tsv => decode_tsv_line(line),
                StoreFormat::JsonLines => decode_json_line(line),
            }
            .map_err(|message| self.malformed(line_no, message))?;
            entries.push(entry);
            Ok(())
        })?;
        Ok(entries)
    }

    /// Append one entry and sync it to disk before returning.
    pub fn append(&self, entry: &CompletionEntry) -> Result<(), StoreError> {
        let mut line = self.encode(entry)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| StoreError::io(&self.path, e))?;
        file.write_all(line.as_bytes())
            .and_then(|_| file.flush())
            .and_then(|_| file.sync_data())
            .map_err(|e| StoreError::io(&self.path, e))
    }

    fn encode(&self, entry: &CompletionEntry) -> Result<String, StoreError> {
        match self.format {
            StoreFormat::JsonLines => serde_json::to_string(entry).map_err(|e| StoreError::Encode {
                id: entry.id.clone(),
                message: e.to_string(),
            }),
            StoreFormat::Tsv => Ok([
                entry.id.as_str(),
                entry.text.as_str(),
                entry.created_at.as_str(),
                entry.modified_at.as_str(),
                entry.reason.as_str(),
                entry.category.as_str(),
            ]
            .map(sanitize_tsv_field)
            .join("\t")),
        }
    }

    fn for_each_line(
        &self,
        mut f: impl FnMut(usize, &str) -> Result<(), StoreError>,
    ) -> Result<(), StoreError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(StoreError::io(&self.path, e)),
        };

        for (idx, raw) in contents.lines().enumerate() {
            let line = raw.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }
            f(idx + 1, line)?;
        }
        Ok(())
    }

    fn malformed(&self, line: usize, message: String) -> StoreError {
        StoreError::Malformed {
            path: self.path.clone(),
            line,
            message,
        }
    }
}

fn split_tsv(line: &str) -> Result<Vec<&str>, String> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() != TSV_FIELDS {
        return Err(format!(
            "expected {TSV_FIELDS} tab-separated fields, found {}",
            fields.len()
        ));
    }
    Ok(fields)
}

fn decode_tsv_line(line: &str) -> Result<CompletionEntry, String> {
    let fields = split_tsv(line)?;
    let category = Category::parse(fields[5])
        .ok_or_else(|| format!("unknown category {:?}", fields[5]))?;
    Ok(CompletionEntry {
        id: fields[0].to_string(),
        text: fields[1].to_string(),
        created_at: fields[2].to_string(),
        modified_at: fields[3].to_string(),
        reason: fields[4].to_string(),
        category,
    })
}

fn decode_json_line(line: &str) -> Result<CompletionEntry, String> {
    serde_json::from_str(line).map_err(|e| e.to_string())
}

fn sanitize_tsv_field(field: &str) -> String {
    field.replace("\r\n", " ").replace(['\t', '\n', '\r'], " ")
}
