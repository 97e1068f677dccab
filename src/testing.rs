// Shared fakes for unit tests.

use std::cell::RefCell;

use crate::answerer::{Answerer, PreferenceMatch, SuitabilityScore, UploadIntent};
use crate::error::LlmError;
use crate::profile::ResumeSection;

pub struct FakeAnswerer {
    pub summary: String,
    pub section: String,
    pub free_text: String,
    pub cover_letter: String,
    pub numeric: String,
    pub option: String,
    pub score: SuitabilityScore,
    pub score_unavailable: bool,
    pub preference: Option<PreferenceMatch>,
    pub preference_unavailable: bool,
    pub upload_intent: UploadIntent,
    pub calls: RefCell<Vec<&'static str>>,
}

impl Default for FakeAnswerer {
    fn default() -> Self {
        Self {
            summary: "Summary".to_string(),
            section: "Personal information".to_string(),
            free_text: "Jane Doe".to_string(),
            cover_letter: "Dear hiring team,\n\nI would love to join.".to_string(),
            numeric: "4".to_string(),
            option: "Yes".to_string(),
            score: SuitabilityScore {
                score: Some(8),
                reasoning: Some("Good fit".to_string()),
            },
            score_unavailable: false,
            preference: Some(PreferenceMatch {
                is_match: true,
                reason: "remote".to_string(),
            }),
            preference_unavailable: false,
            upload_intent: UploadIntent::Resume,
            calls: RefCell::new(Vec::new()),
        }
    }
}

impl FakeAnswerer {
    pub fn calls_to(&self, name: &str) -> usize {
        self.calls.borrow().iter().filter(|c| **c == name).count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.borrow().len()
    }

    fn record(&self, name: &'static str) {
        self.calls.borrow_mut().push(name);
    }
}

impl Answerer for FakeAnswerer {
    fn summarize_job_description(&self, _description: &str) -> Result<String, LlmError> {
        self.record("summarize");
        Ok(self.summary.clone())
    }

    fn classify_resume_section(&self, _question: &str) -> Result<String, LlmError> {
        self.record("section");
        Ok(self.section.clone())
    }

    fn answer_free_text(
        &self,
        _question: &str,
        _section: ResumeSection,
        _context: &str,
    ) -> Result<String, LlmError> {
        self.record("free_text");
        Ok(self.free_text.clone())
    }

    fn write_cover_letter(
        &self,
        _job_description: &str,
        _company: &str,
        _resume: &str,
    ) -> Result<String, LlmError> {
        self.record("cover_letter");
        Ok(self.cover_letter.clone())
    }

    fn answer_numeric(&self, _question: &str, _context: &str) -> Result<String, LlmError> {
        self.record("numeric");
        Ok(self.numeric.clone())
    }

    fn answer_from_options(
        &self,
        _question: &str,
        _options: &[String],
        _context: &str,
    ) -> Result<String, LlmError> {
        self.record("options");
        Ok(self.option.clone())
    }

    fn score_suitability(
        &self,
        _resume: &str,
        _description: &str,
        _preferences: &str,
    ) -> Result<SuitabilityScore, LlmError> {
        self.record("score");
        if self.score_unavailable {
            return Err(LlmError::Unavailable("offline".to_string()));
        }
        Ok(self.score.clone())
    }

    fn match_work_preferences(
        &self,
        _job: &str,
        _preferences: &str,
    ) -> Result<Option<PreferenceMatch>, LlmError> {
        self.record("preferences");
        if self.preference_unavailable {
            return Err(LlmError::Unavailable("offline".to_string()));
        }
        Ok(self.preference.clone())
    }

    fn classify_upload_intent(&self, _heading: &str) -> Result<UploadIntent, LlmError> {
        self.record("upload_intent");
        Ok(self.upload_intent)
    }
}
