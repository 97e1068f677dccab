use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;
use tracing::debug;

use crate::ai::AIProvider;
use crate::error::LlmError;
use crate::profile::ResumeSection;
use crate::prompts::{self, fill};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadIntent {
    Resume,
    CoverLetter,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PreferenceMatch {
    #[serde(rename = "match")]
    pub is_match: bool,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuitabilityScore {
    pub score: Option<u32>,
    pub reasoning: Option<String>,
}

/// LLM-backed answering capability. Every call is a blocking network round trip.
pub trait Answerer {
    fn summarize_job_description(&self, description: &str) -> Result<String, LlmError>;

    /// Raw classifier output naming one resume section.
    fn classify_resume_section(&self, question: &str) -> Result<String, LlmError>;

    fn answer_free_text(
        &self,
        question: &str,
        section: ResumeSection,
        context: &str,
    ) -> Result<String, LlmError>;

    fn write_cover_letter(
        &self,
        job_description: &str,
        company: &str,
        resume: &str,
    ) -> Result<String, LlmError>;

    /// Raw output; the caller extracts the number.
    fn answer_numeric(&self, question: &str, context: &str) -> Result<String, LlmError>;

    /// Raw output; the caller snaps it to one of `options`.
    fn answer_from_options(
        &self,
        question: &str,
        options: &[String],
        context: &str,
    ) -> Result<String, LlmError>;

    fn score_suitability(
        &self,
        resume: &str,
        description: &str,
        preferences: &str,
    ) -> Result<SuitabilityScore, LlmError>;

    /// `Ok(None)` when the response could not be parsed.
    fn match_work_preferences(
        &self,
        job: &str,
        preferences: &str,
    ) -> Result<Option<PreferenceMatch>, LlmError>;

    fn classify_upload_intent(&self, heading: &str) -> Result<UploadIntent, LlmError>;
}

pub fn clean_llm_output(output: &str) -> String {
    output.replace(['*', '#'], "").trim().to_string()
}

pub fn parse_suitability(output: &str) -> SuitabilityScore {
    static SCORE: OnceLock<Regex> = OnceLock::new();
    static REASONING: OnceLock<Regex> = OnceLock::new();
    let score_re = SCORE.get_or_init(|| Regex::new(r"(?i)Score:\s*(\d+)").expect("valid regex"));
    let reasoning_re =
        REASONING.get_or_init(|| Regex::new(r"(?is)Reasoning:\s*(.+)").expect("valid regex"));

    SuitabilityScore {
        score: score_re
            .captures(output)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse().ok()),
        reasoning: reasoning_re
            .captures(output)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string()),
    }
}

/// Pulls the first JSON object out of a response, tolerating code fences and chatter.
pub fn parse_preference_match(output: &str) -> Option<PreferenceMatch> {
    let start = output.find('{')?;
    let end = output.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str(&output[start..=end]).ok()
}

pub fn parse_upload_intent(output: &str) -> UploadIntent {
    let lower = output.to_lowercase();
    if lower.contains("resume") {
        UploadIntent::Resume
    } else if lower.contains("cover") {
        UploadIntent::CoverLetter
    } else {
        UploadIntent::Resume
    }
}

pub struct LlmAnswerer {
    provider: Box<dyn AIProvider>,
}

impl LlmAnswerer {
    pub fn new(provider: Box<dyn AIProvider>) -> Self {
        Self { provider }
    }

    fn ask(&self, prompt: &str, max_tokens: u32) -> Result<String, LlmError> {
        let raw = self.provider.complete(prompt, max_tokens)?;
        let output = clean_llm_output(&raw);
        debug!(model = self.provider.model_name(), output = %output, "LLM answered");
        Ok(output)
    }
}

impl Answerer for LlmAnswerer {
    fn summarize_job_description(&self, description: &str) -> Result<String, LlmError> {
        self.ask(&fill(prompts::SUMMARIZE_TEMPLATE, &[("text", description)]), 1024)
    }

    fn classify_resume_section(&self, question: &str) -> Result<String, LlmError> {
        self.ask(
            &fill(prompts::DETERMINE_SECTION_TEMPLATE, &[("question", question)]),
            64,
        )
    }

    fn answer_free_text(
        &self,
        question: &str,
        section: ResumeSection,
        context: &str,
    ) -> Result<String, LlmError> {
        let prompt = fill(
            prompts::SECTION_ANSWER_TEMPLATE,
            &[("section", section.label()), ("context", context), ("question", question)],
        );
        self.ask(&prompt, 1024)
    }

    fn write_cover_letter(
        &self,
        job_description: &str,
        company: &str,
        resume: &str,
    ) -> Result<String, LlmError> {
        let prompt = fill(
            prompts::COVER_LETTER_TEMPLATE,
            &[("company", company), ("job_description", job_description), ("resume", resume)],
        );
        self.ask(&prompt, 2048)
    }

    fn answer_numeric(&self, question: &str, context: &str) -> Result<String, LlmError> {
        let prompt = fill(prompts::NUMERIC_TEMPLATE, &[("context", context), ("question", question)]);
        self.ask(&prompt, 32)
    }

    fn answer_from_options(
        &self,
        question: &str,
        options: &[String],
        context: &str,
    ) -> Result<String, LlmError> {
        let options = serde_json::to_string(options).unwrap_or_default();
        let prompt = fill(
            prompts::OPTIONS_TEMPLATE,
            &[("context", context), ("question", question), ("options", &options)],
        );
        self.ask(&prompt, 128)
    }

    fn score_suitability(
        &self,
        resume: &str,
        description: &str,
        preferences: &str,
    ) -> Result<SuitabilityScore, LlmError> {
        let prompt = fill(
            prompts::IS_RELEVANT_POSITION_TEMPLATE,
            &[("work_preferences", preferences), ("resume", resume), ("job_description", description)],
        );
        Ok(parse_suitability(&self.ask(&prompt, 512)?))
    }

    fn match_work_preferences(
        &self,
        job: &str,
        preferences: &str,
    ) -> Result<Option<PreferenceMatch>, LlmError> {
        let prompt = fill(
            prompts::WORK_PREFERENCES_MATCH_TEMPLATE,
            &[("work_preferences", preferences), ("job", job)],
        );
        let raw = self.provider.complete(&prompt, 256)?;
        Ok(parse_preference_match(&raw))
    }

    fn classify_upload_intent(&self, heading: &str) -> Result<UploadIntent, LlmError> {
        let output = self.ask(&fill(prompts::RESUME_OR_COVER_TEMPLATE, &[("phrase", heading)]), 16)?;
        Ok(parse_upload_intent(&output))
    }
}
