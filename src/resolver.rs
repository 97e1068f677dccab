use regex::Regex;
use std::sync::OnceLock;
use tracing::{debug, info, warn};

use crate::answerer::Answerer;
use crate::cache::{AnswerCache, StoreOutcome};
use crate::error::ApplyError;
use crate::models::{Job, TextBoxKind, TextBoxQuestion};
use crate::profile::{Profile, ResumeSection};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerSource {
    Cache,
    Answerer,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub answer: String,
    pub source: AnswerSource,
}

/// Cover letters are job-specific and always generated fresh.
fn is_cover_letter_question(question: &str) -> bool {
    question.to_lowercase().contains("cover letter")
}

/// First run of digits in the output, if any.
pub fn extract_number(output: &str) -> Option<String> {
    static DIGITS: OnceLock<Regex> = OnceLock::new();
    let re = DIGITS.get_or_init(|| Regex::new(r"\d+").expect("valid regex"));
    re.find(output).map(|m| m.as_str().to_string())
}

/// Option with the smallest edit distance to the raw output, compared case-insensitively.
pub fn closest_option(output: &str, options: &[String]) -> Option<String> {
    let target = output.trim().to_lowercase();
    options
        .iter()
        .min_by_key(|option| strsim::levenshtein(&option.to_lowercase(), &target))
        .cloned()
}

pub struct AnswerResolver<'a> {
    cache: AnswerCache,
    answerer: &'a dyn Answerer,
    profile: &'a Profile,
    cache_enabled: bool,
    default_numeric: String,
}

impl<'a> AnswerResolver<'a> {
    pub fn new(
        cache: AnswerCache,
        answerer: &'a dyn Answerer,
        profile: &'a Profile,
        cache_enabled: bool,
        default_numeric: &str,
    ) -> Self {
        Self {
            cache,
            answerer,
            profile,
            cache_enabled,
            default_numeric: default_numeric.to_string(),
        }
    }

    pub fn cache(&self) -> &AnswerCache {
        &self.cache
    }

    pub fn resolve_text(
        &mut self,
        question: &TextBoxQuestion,
        job: &Job,
    ) -> Result<Resolution, ApplyError> {
        let kind = match question.kind {
            TextBoxKind::Text => "text",
            TextBoxKind::Numeric => "numeric",
        };
        let fresh = is_cover_letter_question(&question.question);
        if let Some(hit) = self.lookup(&question.question, kind, fresh) {
            return Ok(hit);
        }

        let answer = match question.kind {
            TextBoxKind::Numeric => self.answer_numeric(&question.question)?,
            TextBoxKind::Text => self.answer_free_text(&question.question, job)?,
        };

        if !fresh {
            self.persist(&question.question, kind, &answer, &job.company)?;
        }
        Ok(Resolution {
            answer,
            source: AnswerSource::Answerer,
        })
    }

    /// Resolves a radio/checkbox/dropdown question to one of `options`.
    pub fn resolve_choice(
        &mut self,
        question: &str,
        kind: &str,
        options: &[String],
        job: &Job,
    ) -> Result<Resolution, ApplyError> {
        if options.is_empty() {
            return Err(ApplyError::UnanswerableQuestion {
                question: question.to_string(),
            });
        }
        if let Some(hit) = self.lookup(question, kind, false) {
            return Ok(hit);
        }

        let raw = self
            .answerer
            .answer_from_options(question, options, &self.profile.resume_text())?;
        let answer = closest_option(&raw, options).unwrap_or(raw);
        debug!(question, answer = %answer, "Snapped answer to option");

        self.persist(question, kind, &answer, &job.company)?;
        Ok(Resolution {
            answer,
            source: AnswerSource::Answerer,
        })
    }

    fn lookup(&self, question: &str, kind: &str, fresh: bool) -> Option<Resolution> {
        if !self.cache_enabled || fresh {
            return None;
        }
        let entry = self.cache.lookup(question, kind)?;
        debug!(question, kind, answer = %entry.answer, "Answer cache hit");
        Some(Resolution {
            answer: entry.answer.clone(),
            source: AnswerSource::Cache,
        })
    }

    fn persist(
        &mut self,
        question: &str,
        kind: &str,
        answer: &str,
        company: &str,
    ) -> Result<(), ApplyError> {
        if self.cache.store(question, kind, answer, company)? == StoreOutcome::Stored {
            info!(question, kind, "Cached new answer");
        }
        Ok(())
    }

    fn answer_numeric(&self, question: &str) -> Result<String, ApplyError> {
        let context = [
            ResumeSection::EducationDetails,
            ResumeSection::ExperienceDetails,
            ResumeSection::Projects,
        ]
        .into_iter()
        .filter_map(|s| self.profile.section(s))
        .collect::<Vec<_>>()
        .join("\n");

        let raw = self.answerer.answer_numeric(question, &context)?;
        Ok(extract_number(&raw).unwrap_or_else(|| {
            warn!(question, output = %raw, default = %self.default_numeric, "No number in answer, using default");
            self.default_numeric.clone()
        }))
    }

    fn answer_free_text(&self, question: &str, job: &Job) -> Result<String, ApplyError> {
        let raw = self.answerer.classify_resume_section(question)?;
        let section = ResumeSection::parse(&raw).ok_or_else(|| {
            warn!(question, output = %raw, company = %job.company, "No resume section matches question");
            ApplyError::UnanswerableQuestion {
                question: question.to_string(),
            }
        })?;
        debug!(question, section = %section, "Routed question to resume section");

        if section == ResumeSection::CoverLetter {
            let description = if job.description.is_empty() {
                &job.summary
            } else {
                &job.description
            };
            return Ok(self.answerer.write_cover_letter(
                description,
                &job.company,
                &self.profile.resume_text(),
            )?);
        }

        let context = self.profile.section(section).ok_or_else(|| {
            warn!(question, section = %section, "Profile has no data for section");
            ApplyError::UnanswerableQuestion {
                question: question.to_string(),
            }
        })?;
        Ok(self.answerer.answer_free_text(question, section, &context)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeAnswerer;
    use std::fs;
    use tempfile::TempDir;

    const PROFILE: &str = "personal_information:\n  name: Jane Doe\nexperience_details:\n  - company: Initech\n    years: 4\n";

    fn job() -> Job {
        Job::new("greenhouse", "42", "Rust Engineer", "Acme", "https://boards.greenhouse.io/acme/jobs/42")
    }

    fn resolver<'a>(
        dir: &TempDir,
        answerer: &'a FakeAnswerer,
        profile: &'a Profile,
    ) -> AnswerResolver<'a> {
        let cache = AnswerCache::open(&dir.path().join("answers.json")).unwrap();
        AnswerResolver::new(cache, answerer, profile, true, "3")
    }

    fn text(question: &str, kind: TextBoxKind) -> TextBoxQuestion {
        TextBoxQuestion {
            question: question.to_string(),
            kind,
            required: true,
        }
    }

    #[test]
    fn test_visa_sponsorship_snaps_and_caches() {
        let dir = TempDir::new().unwrap();
        let profile = Profile::from_yaml(PROFILE).unwrap();
        let answerer = FakeAnswerer {
            option: "No, I do not".to_string(),
            ..Default::default()
        };
        let mut resolver = resolver(&dir, &answerer, &profile);
        let options = vec!["Yes".to_string(), "No".to_string()];

        let resolved = resolver
            .resolve_choice("Do you require visa sponsorship?", "radio", &options, &job())
            .unwrap();

        assert_eq!(resolved.answer, "No");
        let saved: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join("answers.json")).unwrap()).unwrap();
        assert_eq!(
            saved,
            serde_json::json!([{"question": "do you require visa sponsorship?", "type": "radio", "answer": "No"}])
        );
    }

    #[test]
    fn test_noisy_option_snaps_by_edit_distance() {
        let options: Vec<String> = ["Yes", "No", "Maybe"].iter().map(|s| s.to_string()).collect();
        assert_eq!(closest_option("yess", &options).as_deref(), Some("Yes"));
        assert_eq!(closest_option("  MAYBE ", &options).as_deref(), Some("Maybe"));
    }

    #[test]
    fn test_cached_question_is_never_reasked() {
        let dir = TempDir::new().unwrap();
        let profile = Profile::from_yaml(PROFILE).unwrap();
        let answerer = FakeAnswerer::default();
        let mut resolver = resolver(&dir, &answerer, &profile);
        let options = vec!["Yes".to_string(), "No".to_string()];

        let first = resolver
            .resolve_choice("Are you 18 or older?", "radio", &options, &job())
            .unwrap();
        let second = resolver
            .resolve_choice("ARE YOU 18 OR OLDER?,", "radio", &options, &job())
            .unwrap();

        assert_eq!(first.source, AnswerSource::Answerer);
        assert_eq!(second.source, AnswerSource::Cache);
        assert_eq!(second.answer, "Yes");
        assert_eq!(answerer.calls_to("options"), 1);
    }

    #[test]
    fn test_radio_answer_does_not_satisfy_dropdown() {
        let dir = TempDir::new().unwrap();
        let profile = Profile::from_yaml(PROFILE).unwrap();
        let answerer = FakeAnswerer::default();
        let mut resolver = resolver(&dir, &answerer, &profile);
        let options = vec!["Yes".to_string(), "No".to_string()];

        resolver.resolve_choice("Relocate?", "radio", &options, &job()).unwrap();
        let dropdown = resolver.resolve_choice("Relocate?", "dropdown", &options, &job()).unwrap();

        assert_eq!(dropdown.source, AnswerSource::Answerer);
        assert_eq!(answerer.calls_to("options"), 2);
    }

    #[test]
    fn test_numeric_extracts_first_number_or_defaults() {
        let dir = TempDir::new().unwrap();
        let profile = Profile::from_yaml(PROFILE).unwrap();
        let answerer = FakeAnswerer {
            numeric: "About 4 years, maybe 5".to_string(),
            ..Default::default()
        };
        let mut resolver = resolver(&dir, &answerer, &profile);
        let years = resolver
            .resolve_text(&text("Years of Rust?", TextBoxKind::Numeric), &job())
            .unwrap();
        assert_eq!(years.answer, "4");

        let vague = FakeAnswerer {
            numeric: "several".to_string(),
            ..Default::default()
        };
        let mut resolver = AnswerResolver::new(
            AnswerCache::open(&dir.path().join("other.json")).unwrap(),
            &vague,
            &profile,
            true,
            "3",
        );
        let fallback = resolver
            .resolve_text(&text("Years of Go?", TextBoxKind::Numeric), &job())
            .unwrap();
        assert_eq!(fallback.answer, "3");
    }

    #[test]
    fn test_unknown_section_is_unanswerable() {
        let dir = TempDir::new().unwrap();
        let profile = Profile::from_yaml(PROFILE).unwrap();
        let answerer = FakeAnswerer {
            section: "Hobbies".to_string(),
            ..Default::default()
        };
        let mut resolver = resolver(&dir, &answerer, &profile);

        let err = resolver
            .resolve_text(&text("What is your favourite colour?", TextBoxKind::Text), &job())
            .unwrap_err();
        assert!(matches!(err, ApplyError::UnanswerableQuestion { .. }));
        assert_eq!(answerer.calls_to("free_text"), 0);
    }

    #[test]
    fn test_cover_letter_bypasses_cache() {
        let dir = TempDir::new().unwrap();
        let profile = Profile::from_yaml(PROFILE).unwrap();
        let answerer = FakeAnswerer {
            section: "Cover letter".to_string(),
            ..Default::default()
        };
        let mut resolver = resolver(&dir, &answerer, &profile);
        let question = text("Cover Letter", TextBoxKind::Text);

        resolver.resolve_text(&question, &job()).unwrap();
        resolver.resolve_text(&question, &job()).unwrap();

        assert_eq!(answerer.calls_to("cover_letter"), 2);
        assert!(resolver.cache().entries().is_empty());
    }

    #[test]
    fn test_company_specific_answer_is_not_cached() {
        let dir = TempDir::new().unwrap();
        let profile = Profile::from_yaml(PROFILE).unwrap();
        let answerer = FakeAnswerer {
            free_text: "I have admired Acme for years".to_string(),
            ..Default::default()
        };
        let mut resolver = resolver(&dir, &answerer, &profile);

        let resolved = resolver
            .resolve_text(&text("Why do you want this job?", TextBoxKind::Text), &job())
            .unwrap();

        assert_eq!(resolved.answer, "I have admired Acme for years");
        assert!(!dir.path().join("answers.json").exists());
    }

    #[test]
    fn test_disabled_cache_always_asks() {
        let dir = TempDir::new().unwrap();
        let profile = Profile::from_yaml(PROFILE).unwrap();
        let answerer = FakeAnswerer::default();
        let cache = AnswerCache::open(&dir.path().join("answers.json")).unwrap();
        let mut resolver = AnswerResolver::new(cache, &answerer, &profile, false, "3");
        let question = text("Full name", TextBoxKind::Text);

        resolver.resolve_text(&question, &job()).unwrap();
        resolver.resolve_text(&question, &job()).unwrap();

        assert_eq!(answerer.calls_to("free_text"), 2);
    }
}
