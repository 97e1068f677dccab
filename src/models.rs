use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    #[default]
    Discovered,
    Applying,
    Applied,
    Skipped,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub portal: String, // "greenhouse", "lever"
    pub id: String,
    pub title: String,
    pub company: String,
    #[serde(default)]
    pub location: String,
    pub link: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub recruiter_link: String,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub state: JobState,
    #[serde(default)]
    pub resume_path: Option<PathBuf>,
    #[serde(default)]
    pub cover_letter_path: Option<PathBuf>,
}

impl Job {
    pub fn new(portal: &str, id: &str, title: &str, company: &str, link: &str) -> Self {
        Self {
            portal: portal.to_string(),
            id: id.to_string(),
            title: title.to_string(),
            company: company.to_string(),
            location: String::new(),
            link: link.to_string(),
            description: String::new(),
            summary: String::new(),
            recruiter_link: String::new(),
            categories: Vec::new(),
            state: JobState::Discovered,
            resume_path: None,
            cover_letter_path: None,
        }
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {} ({})", self.title, self.company, self.link)
    }
}

/// One answered form entry, as persisted in `job_application.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRecord {
    #[serde(rename = "type")]
    pub kind: String,
    pub question: String,
    pub answer: String,
}

impl AnswerRecord {
    pub fn new(kind: &str, question: &str, answer: &str) -> Self {
        Self {
            kind: kind.to_string(),
            question: question.to_string(),
            answer: answer.to_string(),
        }
    }
}

/// A single application attempt. Both forms are append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobApplication {
    pub job: Job,
    pub empty_form: Vec<String>,
    pub application_form: Vec<AnswerRecord>,
}

impl JobApplication {
    pub fn new(job: Job) -> Self {
        Self {
            job,
            empty_form: Vec::new(),
            application_form: Vec::new(),
        }
    }

    pub fn add_question_to_form(&mut self, question: &str) {
        self.empty_form.push(question.to_string());
    }

    pub fn save_application_data(&mut self, record: AnswerRecord) {
        self.application_form.push(record);
    }

    pub fn resume_path(&self) -> Option<&PathBuf> {
        self.job.resume_path.as_ref()
    }

    pub fn cover_letter_path(&self) -> Option<&PathBuf> {
        self.job.cover_letter_path.as_ref()
    }

    /// Questions seen on screen that never received an answer.
    pub fn unanswered(&self) -> Vec<&str> {
        self.empty_form
            .iter()
            .filter(|q| !self.application_form.iter().any(|r| &r.question == *q))
            .map(String::as_str)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextBoxKind {
    Text,
    Numeric,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextBoxQuestion {
    pub question: String,
    pub kind: TextBoxKind,
    pub required: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectKind {
    SingleSelect,
    MultiSelect,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub kind: SelectKind,
    pub required: bool,
}

/// A classified form section. The variant is fixed at classification time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Question {
    Upload { heading: String },
    Agreement { text: String },
    Radio(SelectQuestion),
    TextBox(TextBoxQuestion),
    Dropdown(SelectQuestion),
}

impl Question {
    pub fn text(&self) -> &str {
        match self {
            Question::Upload { heading } => heading,
            Question::Agreement { text } => text,
            Question::Radio(q) | Question::Dropdown(q) => &q.question,
            Question::TextBox(q) => &q.question,
        }
    }

    /// Type tag used as the second half of the answer cache key.
    pub fn cache_type(&self) -> &'static str {
        match self {
            Question::Upload { .. } => "upload",
            Question::Agreement { .. } => "agreement",
            Question::Radio(_) => "radio",
            Question::Dropdown(_) => "dropdown",
            Question::TextBox(q) => match q.kind {
                TextBoxKind::Text => "text",
                TextBoxKind::Numeric => "numeric",
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unanswered_lists_abandoned_questions() {
        let mut app = JobApplication::new(Job::new("lever", "1", "Engineer", "Acme", "https://x"));
        app.add_question_to_form("Name");
        app.add_question_to_form("Years of Rust?");
        app.save_application_data(AnswerRecord::new("text", "Name", "Jane"));

        assert_eq!(app.unanswered(), vec!["Years of Rust?"]);
    }

    #[test]
    fn test_answer_record_serializes_type_field() {
        let record = AnswerRecord::new("radio", "Sponsorship?", "No");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["type"], "radio");
        assert_eq!(json["answer"], "No");
    }

    #[test]
    fn test_cache_type_per_variant() {
        let select = SelectQuestion {
            question: "Q".into(),
            options: vec!["Yes".into()],
            kind: SelectKind::SingleSelect,
            required: false,
        };
        assert_eq!(Question::Radio(select.clone()).cache_type(), "radio");
        assert_eq!(Question::Dropdown(select).cache_type(), "dropdown");
        let numeric = TextBoxQuestion {
            question: "Years?".into(),
            kind: TextBoxKind::Numeric,
            required: true,
        };
        assert_eq!(Question::TextBox(numeric).cache_type(), "numeric");
    }

    #[test]
    fn test_job_defaults_when_deserializing_minimal_entry() {
        let job: Job = serde_json::from_str(
            r#"{"portal":"greenhouse","id":"42","title":"SRE","company":"Acme","link":"https://boards.greenhouse.io/acme/jobs/42"}"#,
        )
        .unwrap();
        assert_eq!(job.state, JobState::Discovered);
        assert!(job.categories.is_empty());
        assert!(job.resume_path.is_none());
    }
}
