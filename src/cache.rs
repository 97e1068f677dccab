use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::ApplyError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerCacheEntry {
    #[serde(rename = "type")]
    pub kind: String,
    pub question: String,
    pub answer: String,
}

/// Why an answer was not written to the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOutcome {
    Stored,
    AlreadyCached,
    MentionsCompany,
}

/// Canonical cache key for a question's text.
pub fn normalize_question(text: &str) -> String {
    let lowered = text.to_lowercase();
    let cleaned: String = lowered
        .trim()
        .replace(['"', '\\'], "")
        .replace("\r\n", " ")
        .replace(['\n', '\r'], " ")
        .chars()
        .filter(|c| !c.is_control())
        .collect();
    cleaned.trim_end_matches(',').trim().to_string()
}

/// Shared question → answer store backed by a flat JSON array file.
///
/// Single-writer: each store re-reads the file, appends if absent, writes it
/// back, and reloads the in-memory view.
#[derive(Debug)]
pub struct AnswerCache {
    path: PathBuf,
    entries: Vec<AnswerCacheEntry>,
}

impl AnswerCache {
    pub fn open(path: &Path) -> Result<Self, ApplyError> {
        let entries = read_entries(path)?;
        debug!(path = %path.display(), entries = entries.len(), "Loaded answer cache");
        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entries(&self) -> &[AnswerCacheEntry] {
        &self.entries
    }

    /// Exact match on both normalized question and type.
    pub fn lookup(&self, question: &str, kind: &str) -> Option<&AnswerCacheEntry> {
        let key = normalize_question(question);
        self.entries
            .iter()
            .find(|e| e.kind == kind && normalize_question(&e.question) == key)
    }

    pub fn store(
        &mut self,
        question: &str,
        kind: &str,
        answer: &str,
        company: &str,
    ) -> Result<StoreOutcome, ApplyError> {
        if mentions_company(answer, company) {
            debug!(question, company, "Answer mentions the company, not caching");
            return Ok(StoreOutcome::MentionsCompany);
        }

        let key = normalize_question(question);
        let mut on_disk = read_entries(&self.path)?;
        let exists = on_disk
            .iter()
            .any(|e| e.kind == kind && normalize_question(&e.question) == key);

        let outcome = if exists {
            debug!(question = %key, kind, "Question already cached, skipping save");
            StoreOutcome::AlreadyCached
        } else {
            on_disk.push(AnswerCacheEntry {
                kind: kind.to_string(),
                question: key,
                answer: answer.to_string(),
            });
            if let Some(parent) = self.path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&self.path, serde_json::to_string_pretty(&on_disk)?)?;
            StoreOutcome::Stored
        };

        self.entries = read_entries(&self.path)?;
        Ok(outcome)
    }
}

fn mentions_company(answer: &str, company: &str) -> bool {
    let company = company.trim();
    !company.is_empty() && answer.to_lowercase().contains(&company.to_lowercase())
}

fn read_entries(path: &Path) -> Result<Vec<AnswerCacheEntry>, ApplyError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "Answer cache not found, starting empty");
            return Ok(Vec::new());
        }
        Err(e) => return Err(e.into()),
    };
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }

    match serde_json::from_str::<serde_json::Value>(&content) {
        Ok(serde_json::Value::Array(_)) => Ok(serde_json::from_str(&content)?),
        Ok(_) => Err(ApplyError::Io(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("{}: expected a list of answers", path.display()),
        ))),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Answer cache is not valid JSON, ignoring it");
            Ok(Vec::new())
        }
    }
}
