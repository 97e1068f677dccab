use regex::Regex;
use std::collections::HashSet;
use tracing::{debug, error, info, warn};

use crate::config::WorkPreferences;
use crate::engine::FormTraversalEngine;
use crate::error::{ApplyError, Outcome};
use crate::ledger::{JobLedger, LedgerStatus};
use crate::models::{Job, JobState};

/// Something that can take one job through an application attempt.
pub trait Applier {
    fn apply(&mut self, job: &mut Job) -> Result<Outcome, ApplyError>;
}

impl Applier for FormTraversalEngine<'_> {
    fn apply(&mut self, job: &mut Job) -> Result<Outcome, ApplyError> {
        FormTraversalEngine::apply(self, job)
    }
}

/// Whole-word, case-insensitive blacklists over title, company and location.
pub struct JobFilters {
    title: Vec<(String, Regex)>,
    company: Vec<(String, Regex)>,
    location: Vec<(String, Regex)>,
}

fn word_patterns(words: &[String]) -> Result<Vec<(String, Regex)>, regex::Error> {
    words
        .iter()
        .map(|w| w.trim())
        .filter(|w| !w.is_empty())
        .map(|w| Ok((w.to_string(), Regex::new(&format!(r"(?i)\b{}\b", regex::escape(w)))?)))
        .collect()
}

impl JobFilters {
    pub fn from_preferences(preferences: &WorkPreferences) -> Result<Self, regex::Error> {
        Ok(Self {
            title: word_patterns(&preferences.title_blacklist)?,
            company: word_patterns(&preferences.company_blacklist)?,
            location: word_patterns(&preferences.location_blacklist)?,
        })
    }

    pub fn blacklist_reason(&self, job: &Job) -> Option<String> {
        let checks = [
            ("title", &self.title, &job.title),
            ("company", &self.company, &job.company),
            ("location", &self.location, &job.location),
        ];
        for (field, patterns, value) in checks {
            if let Some((word, _)) = patterns.iter().find(|(_, re)| re.is_match(value)) {
                return Some(format!("Blacklisted {}: {}", field, word));
            }
        }
        None
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub applied: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Outer job loop: pre-filters, one application attempt per job, ledger writes.
pub struct JobRunner<'a> {
    ledger: &'a JobLedger,
    filters: JobFilters,
    apply_once_per_company: bool,
    seen_links: HashSet<String>,
}

impl<'a> JobRunner<'a> {
    pub fn new(ledger: &'a JobLedger, filters: JobFilters, apply_once_per_company: bool) -> Self {
        Self {
            ledger,
            filters,
            apply_once_per_company,
            seen_links: HashSet::new(),
        }
    }

    fn pre_filter(&self, job: &Job) -> Option<String> {
        if let Some(reason) = self.filters.blacklist_reason(job) {
            return Some(reason);
        }
        if job.state == JobState::Applied || self.seen_links.contains(&job.link) {
            return Some("Already applied".to_string());
        }
        if self.apply_once_per_company && self.applied_to_company(&job.company) {
            return Some(format!("Already applied to {}", job.company));
        }
        None
    }

    fn previously_failed(&self, job: &Job) -> bool {
        self.ledger.previously_failed(&job.link).unwrap_or_else(|e| {
            warn!(link = %job.link, error = %e, "Could not read failed ledger");
            false
        })
    }

    fn applied_to_company(&self, company: &str) -> bool {
        self.ledger.applied_to_company(company).unwrap_or_else(|e| {
            warn!(company, error = %e, "Could not read success ledger");
            false
        })
    }

    fn record(&self, job: &Job, status: LedgerStatus, reason: &str) {
        if let Err(e) = self.ledger.record(job, status, reason) {
            warn!(job = %job.title, company = %job.company, status = %status, error = %e, "Could not write ledger entry");
        }
    }

    pub fn run(&mut self, applier: &mut dyn Applier, jobs: &mut [Job]) -> Result<RunSummary, ApplyError> {
        let mut summary = RunSummary::default();

        for job in jobs.iter_mut() {
            if self.previously_failed(job) {
                debug!(link = %job.link, "Previously failed, skipping");
                continue;
            }
            if let Some(reason) = self.pre_filter(job) {
                info!(job = %job.title, company = %job.company, reason = %reason, "Skipping job");
                job.state = JobState::Skipped;
                self.record(job, LedgerStatus::Skipped, &reason);
                summary.skipped += 1;
                continue;
            }

            self.seen_links.insert(job.link.clone());
            info!(job = %job.title, company = %job.company, "Starting application");
            match applier.apply(job) {
                Ok(Outcome::Applied) => {
                    self.record(job, LedgerStatus::Success, "");
                    summary.applied += 1;
                }
                Ok(Outcome::Skipped(reason)) => {
                    self.record(job, LedgerStatus::Skipped, &reason);
                    summary.skipped += 1;
                }
                Err(e) => {
                    error!(job = %job.title, company = %job.company, error = %e, "Application failed");
                    self.record(job, LedgerStatus::Failed, &e.to_string());
                    summary.failed += 1;
                    if e.is_fatal_for_run() {
                        return Err(e);
                    }
                }
            }
        }

        info!(
            applied = summary.applied,
            skipped = summary.skipped,
            failed = summary.failed,
            "Run finished"
        );
        Ok(summary)
    }
}
