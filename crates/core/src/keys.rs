// crates/core/src/keys.rs
//! Ordered pool of provider credentials with a rotating cursor.

use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum KeyPoolError {
    #[error("IO error reading key file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("key pool is empty")]
    Empty,
}

/// Credentials tried in order; the cursor only moves forward (mod len).
///
/// The cursor is not reset between records: a key that failed stays behind
/// the cursor until the rotation comes back around to it.
#[derive(Clone)]
pub struct KeyPool {
    keys: Vec<String>,
    cursor: usize,
}

impl KeyPool {
    pub fn new(keys: Vec<String>) -> Result<Self, KeyPoolError> {
        if keys.is_empty() {
            return Err(KeyPoolError::Empty);
        }
        Ok(Self { keys, cursor: 0 })
    }

    /// Parse a newline-delimited key list. Blank lines and `#` comments are skipped.
    pub fn parse(contents: &str) -> Result<Self, KeyPoolError> {
        let keys = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(String::from)
            .collect();
        Self::new(keys)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, KeyPoolError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| KeyPoolError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let pool = Self::parse(&contents)?;
        tracing::info!(path = %path.display(), keys = pool.len(), "loaded key pool");
        Ok(pool)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn current(&self) -> &str {
        &self.keys[self.cursor]
    }

    /// Move to the next key, wrapping around. Returns the new cursor.
    pub fn advance(&mut self) -> usize {
        self.cursor = (self.cursor + 1) % self.keys.len();
        self.cursor
    }
}

impl std::fmt::Debug for KeyPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefixes: Vec<String> = self.keys.iter().map(|k| key_prefix(k)).collect();
        f.debug_struct("KeyPool")
            .field("keys", &prefixes)
            .field("cursor", &self.cursor)
            .finish()
    }
}

const KEY_HINT_CHARS: usize = 4;

/// Loggable form of a credential: first and last 4 characters.
///
/// Short keys only show the head so most of the secret never reaches a log.
pub fn key_prefix(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    let head: String = chars.iter().take(KEY_HINT_CHARS).collect();
    if chars.len() <= KEY_HINT_CHARS * 3 {
        return format!("{head}...");
    }
    let tail: String = chars[chars.len() - KEY_HINT_CHARS..].iter().collect();
    format!("{head}...{tail}")
}
