use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, warn};

use crate::error::ApplyError;
use crate::models::Job;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerStatus {
    Success,
    Failed,
    Skipped,
}

impl LedgerStatus {
    pub fn file_name(self) -> &'static str {
        match self {
            LedgerStatus::Success => "success.json",
            LedgerStatus::Failed => "failed.json",
            LedgerStatus::Skipped => "skipped.json",
        }
    }
}

impl fmt::Display for LedgerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LedgerStatus::Success => "success",
            LedgerStatus::Failed => "failed",
            LedgerStatus::Skipped => "skipped",
        };
        f.write_str(name)
    }
}

impl FromStr for LedgerStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "success" => Ok(LedgerStatus::Success),
            "failed" => Ok(LedgerStatus::Failed),
            "skipped" => Ok(LedgerStatus::Skipped),
            other => Err(format!("unknown ledger status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub portal: String,
    pub id: String,
    pub company: String,
    pub job_title: String,
    pub link: String,
    #[serde(default)]
    pub job_location: String,
    #[serde(default)]
    pub job_recruiter: String,
    #[serde(default)]
    pub pdf_path: String,
    pub timestamp: String,
    #[serde(default)]
    pub reason: String,
}

impl LedgerEntry {
    pub fn from_job(job: &Job, reason: &str) -> Self {
        let pdf_path = job
            .resume_path
            .as_ref()
            .map(|p| format!("file://{}", p.display()))
            .unwrap_or_default();
        Self {
            portal: job.portal.clone(),
            id: job.id.clone(),
            company: job.company.clone(),
            job_title: job.title.clone(),
            link: job.link.clone(),
            job_location: job.location.clone(),
            job_recruiter: job.recruiter_link.clone(),
            pdf_path,
            timestamp: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Append-only per-status JSON logs of what happened to each job.
pub struct JobLedger {
    dir: PathBuf,
}

impl JobLedger {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    fn path(&self, status: LedgerStatus) -> PathBuf {
        self.dir.join(status.file_name())
    }

    pub fn entries(&self, status: LedgerStatus) -> Result<Vec<LedgerEntry>, ApplyError> {
        let path = self.path(status);
        match fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => Ok(Vec::new()),
            Ok(content) => match serde_json::from_str(&content) {
                Ok(entries) => Ok(entries),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Ledger is not valid JSON, treating it as empty");
                    Ok(Vec::new())
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn record(&self, job: &Job, status: LedgerStatus, reason: &str) -> Result<(), ApplyError> {
        let mut entries = self.entries(status)?;
        entries.push(LedgerEntry::from_job(job, reason));
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path(status), serde_json::to_string_pretty(&entries)?)?;
        debug!(job = %job.title, company = %job.company, status = %status, reason, "Ledger entry written");
        Ok(())
    }

    pub fn previously_failed(&self, link: &str) -> Result<bool, ApplyError> {
        Ok(self
            .entries(LedgerStatus::Failed)?
            .iter()
            .any(|e| e.link == link))
    }

    pub fn applied_to_company(&self, company: &str) -> Result<bool, ApplyError> {
        let company = company.trim().to_lowercase();
        Ok(self
            .entries(LedgerStatus::Success)?
            .iter()
            .any(|e| e.company.trim().to_lowercase() == company))
    }
}
