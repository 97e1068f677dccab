use anyhow::{Context, Result};
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

/// Resume/profile sections a free-text question can be routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResumeSection {
    PersonalInformation,
    SelfIdentification,
    LegalAuthorization,
    WorkPreferences,
    EducationDetails,
    ExperienceDetails,
    Projects,
    Availability,
    SalaryExpectations,
    Certifications,
    Languages,
    Interests,
    CoverLetter,
}

impl ResumeSection {
    pub const ALL: [ResumeSection; 13] = [
        ResumeSection::PersonalInformation,
        ResumeSection::SelfIdentification,
        ResumeSection::LegalAuthorization,
        ResumeSection::WorkPreferences,
        ResumeSection::EducationDetails,
        ResumeSection::ExperienceDetails,
        ResumeSection::Projects,
        ResumeSection::Availability,
        ResumeSection::SalaryExpectations,
        ResumeSection::Certifications,
        ResumeSection::Languages,
        ResumeSection::Interests,
        ResumeSection::CoverLetter,
    ];

    /// Human label, as the section classifier is asked to answer.
    pub fn label(self) -> &'static str {
        match self {
            ResumeSection::PersonalInformation => "Personal information",
            ResumeSection::SelfIdentification => "Self Identification",
            ResumeSection::LegalAuthorization => "Legal Authorization",
            ResumeSection::WorkPreferences => "Work Preferences",
            ResumeSection::EducationDetails => "Education Details",
            ResumeSection::ExperienceDetails => "Experience Details",
            ResumeSection::Projects => "Projects",
            ResumeSection::Availability => "Availability",
            ResumeSection::SalaryExpectations => "Salary Expectations",
            ResumeSection::Certifications => "Certifications",
            ResumeSection::Languages => "Languages",
            ResumeSection::Interests => "Interests",
            ResumeSection::CoverLetter => "Cover letter",
        }
    }

    /// Key of the section in `profile.yaml`.
    pub fn key(self) -> String {
        self.label().to_lowercase().replace(' ', "_")
    }

    /// Finds the first section label mentioned in a classifier response.
    pub fn parse(output: &str) -> Option<ResumeSection> {
        static PATTERN: OnceLock<Regex> = OnceLock::new();
        let re = PATTERN.get_or_init(|| {
            let alternatives: Vec<String> = ResumeSection::ALL
                .iter()
                .map(|s| regex::escape(s.label()).replace(' ', r"\s+"))
                .collect();
            Regex::new(&format!("(?i)({})", alternatives.join("|")))
                .expect("section pattern is valid")
        });
        let found = re.captures(output)?.get(1)?.as_str();
        let normalized = found.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
        ResumeSection::ALL
            .into_iter()
            .find(|s| s.label().to_lowercase() == normalized)
    }
}

impl fmt::Display for ResumeSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Candidate data the answers are generated from.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Profile {
    #[serde(flatten)]
    sections: BTreeMap<String, serde_yaml::Value>,
}

impl Profile {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read profile: {}", path.display()))?;
        Self::from_yaml(&content).with_context(|| format!("Invalid profile: {}", path.display()))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// YAML rendering of one section, if the profile has it.
    pub fn section(&self, section: ResumeSection) -> Option<String> {
        let value = self.sections.get(&section.key())?;
        if value.is_null() {
            return None;
        }
        serde_yaml::to_string(value).ok()
    }

    pub fn section_value(&self, section: ResumeSection) -> Option<&serde_yaml::Value> {
        self.sections.get(&section.key())
    }

    /// Whole profile as plain text, used as the "resume" context.
    pub fn resume_text(&self) -> String {
        serde_yaml::to_string(&self.sections).unwrap_or_default()
    }
}
