use serde_yaml::{Mapping, Value};
use tracing::{debug, info, warn};

use crate::answerer::Answerer;
use crate::config::WorkPreferences;
use crate::error::ApplyError;
use crate::models::Job;
use crate::profile::{Profile, ResumeSection};

pub const NO_KEYWORDS_REASON: &str = "No matching keywords found in job description";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuitabilityVerdict {
    pub is_suitable: bool,
    pub score: Option<u32>,
    pub reasoning: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Proceed(SuitabilityVerdict),
    Skip(String),
}

/// Case-insensitive substring match; an empty whitelist always passes.
pub fn matches_keywords(description: &str, whitelist: &[String]) -> bool {
    if whitelist.iter().all(|k| k.trim().is_empty()) {
        return true;
    }
    let description = description.to_lowercase();
    whitelist
        .iter()
        .filter(|k| !k.trim().is_empty())
        .any(|k| description.contains(&k.trim().to_lowercase()))
}

/// Pre-application filter. Runs the keyword check first so a mismatch costs no LLM call.
pub struct SuitabilityGate<'a> {
    answerer: &'a dyn Answerer,
    profile: &'a Profile,
    threshold: u32,
    fail_open: bool,
}

impl<'a> SuitabilityGate<'a> {
    pub fn new(answerer: &'a dyn Answerer, profile: &'a Profile, threshold: u32, fail_open: bool) -> Self {
        Self {
            answerer,
            profile,
            threshold,
            fail_open,
        }
    }

    pub fn evaluate(&self, job: &Job, preferences: &WorkPreferences) -> Result<GateDecision, ApplyError> {
        if !matches_keywords(&job.description, &preferences.keywords_whitelist) {
            info!(job = %job.title, company = %job.company, "Skipping: no whitelisted keyword");
            return Ok(GateDecision::Skip(NO_KEYWORDS_REASON.to_string()));
        }

        let combined = self.combined_preferences(preferences);

        if let Some(reason) = self.check_work_preferences(job, &combined)? {
            return Ok(GateDecision::Skip(reason));
        }

        self.check_score(job, &combined)
    }

    /// Explicit preferences, overridden key by key by the profile's own stated preferences.
    pub fn combined_preferences(&self, preferences: &WorkPreferences) -> String {
        let mut merged = match serde_yaml::to_value(preferences) {
            Ok(Value::Mapping(map)) => map,
            _ => Mapping::new(),
        };
        if let Some(Value::Mapping(stated)) = self.profile.section_value(ResumeSection::WorkPreferences) {
            for (key, value) in stated {
                merged.insert(key.clone(), value.clone());
            }
        }
        serde_yaml::to_string(&merged).unwrap_or_default()
    }

    fn check_work_preferences(&self, job: &Job, preferences: &str) -> Result<Option<String>, ApplyError> {
        let mut brief = job.clone();
        brief.description.clear();
        let job_json = serde_json::to_string_pretty(&brief)?;

        match self.answerer.match_work_preferences(&job_json, preferences) {
            Ok(Some(m)) if m.is_match => {
                debug!(job = %job.title, reason = %m.reason, "Work preferences match");
                Ok(None)
            }
            Ok(Some(m)) => {
                info!(job = %job.title, company = %job.company, reason = %m.reason, "Skipping: work preferences mismatch");
                Ok(Some(format!("Work preferences mismatch: {}", m.reason)))
            }
            Ok(None) if self.fail_open => {
                warn!(job = %job.title, "Unparseable work-preference response, treating as a match");
                Ok(None)
            }
            Ok(None) => Ok(Some("Work-preference match could not be determined".to_string())),
            Err(e) if self.fail_open => {
                warn!(job = %job.title, error = %e, "Work-preference check failed, treating as a match");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn check_score(&self, job: &Job, preferences: &str) -> Result<GateDecision, ApplyError> {
        let result = self.answerer.score_suitability(
            &self.profile.resume_text(),
            &job.description,
            preferences,
        )?;

        let Some(score) = result.score else {
            if self.fail_open {
                warn!(job = %job.title, "No score in suitability response, proceeding");
                return Ok(GateDecision::Proceed(SuitabilityVerdict {
                    is_suitable: true,
                    score: None,
                    reasoning: None,
                }));
            }
            return Ok(GateDecision::Skip("Suitability score could not be determined".to_string()));
        };

        let reasoning = result.reasoning.unwrap_or_default();
        if score < self.threshold {
            info!(job = %job.title, company = %job.company, score, threshold = self.threshold, "Skipping: below suitability threshold");
            return Ok(GateDecision::Skip(format!(
                "Suitability score {} is below threshold {}: {}",
                score, self.threshold, reasoning
            )));
        }

        info!(job = %job.title, score, "Job is suitable");
        Ok(GateDecision::Proceed(SuitabilityVerdict {
            is_suitable: true,
            score: Some(score),
            reasoning: Some(reasoning),
        }))
    }
}
