use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::ApplyError;
use crate::models::JobApplication;

/// Persists each application attempt into its own directory.
pub struct ApplicationRecorder {
    applications_dir: PathBuf,
}

impl ApplicationRecorder {
    pub fn new(applications_dir: &Path) -> Self {
        Self {
            applications_dir: applications_dir.to_path_buf(),
        }
    }

    /// Sibling `failed_<name>` directory for abandoned attempts.
    pub fn failed_dir(&self) -> PathBuf {
        let name = self
            .applications_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "job_applications".to_string());
        let failed = format!("failed_{}", name);
        match self.applications_dir.parent() {
            Some(parent) => parent.join(failed),
            None => PathBuf::from(failed),
        }
    }

    pub fn application_dir(&self, application: &JobApplication, failed: bool) -> PathBuf {
        let job = &application.job;
        let name = sanitize(&format!("{} - {} {}", job.id, job.company, job.title));
        let base = if failed {
            self.failed_dir()
        } else {
            self.applications_dir.clone()
        };
        base.join(name)
    }

    pub fn save(&self, application: &JobApplication, failed: bool) -> Result<PathBuf, ApplyError> {
        let dir = self.application_dir(application, failed);
        fs::create_dir_all(&dir)?;

        let json = serde_json::to_string_pretty(application)?;
        fs::write(dir.join("job_application.json"), json)?;

        let artifacts = [
            (application.resume_path(), "resume.pdf"),
            (application.cover_letter_path(), "cover_letter.pdf"),
        ];
        for (source, target) in artifacts {
            let Some(source) = source else { continue };
            if let Err(e) = fs::copy(source, dir.join(target)) {
                warn!(source = %source.display(), error = %e, "Could not copy artifact");
            }
        }

        info!(dir = %dir.display(), failed, "Saved application");
        Ok(dir)
    }

    /// Removes a success record written before the attempt turned out to fail.
    pub fn discard(&self, application: &JobApplication) -> Result<(), ApplyError> {
        let dir = self.application_dir(application, false);
        if dir.exists() {
            fs::remove_dir_all(&dir)?;
            info!(dir = %dir.display(), "Discarded success record");
        }
        Ok(())
    }
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect::<String>()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnswerRecord, Job};
    use tempfile::TempDir;

    fn application() -> JobApplication {
        let mut app = JobApplication::new(Job::new(
            "greenhouse",
            "42",
            "Rust/Go Engineer",
            "Acme",
            "https://boards.greenhouse.io/acme/jobs/42",
        ));
        app.add_question_to_form("First Name");
        app.add_question_to_form("Years of Rust?");
        app.save_application_data(AnswerRecord::new("text", "First Name", "Jane"));
        app
    }

    #[test]
    fn test_success_directory_layout() {
        let dir = TempDir::new().unwrap();
        let resume = dir.path().join("cv.pdf");
        fs::write(&resume, "%PDF").unwrap();
        let mut app = application();
        app.job.resume_path = Some(resume);

        let recorder = ApplicationRecorder::new(&dir.path().join("job_applications"));
        let saved = recorder.save(&app, false).unwrap();

        assert_eq!(
            saved,
            dir.path().join("job_applications").join("42 - Acme Rust_Go Engineer")
        );
        assert!(saved.join("resume.pdf").exists());
        assert!(!saved.join("cover_letter.pdf").exists());
    }

    #[test]
    fn test_failed_attempt_keeps_unanswered_questions() {
        let dir = TempDir::new().unwrap();
        let recorder = ApplicationRecorder::new(&dir.path().join("job_applications"));

        let saved = recorder.save(&application(), true).unwrap();

        assert!(saved.starts_with(dir.path().join("failed_job_applications")));
        let persisted: JobApplication =
            serde_json::from_str(&fs::read_to_string(saved.join("job_application.json")).unwrap())
                .unwrap();
        assert_eq!(persisted.unanswered(), vec!["Years of Rust?"]);
    }

    #[test]
    fn test_discard_removes_success_record_only() {
        let dir = TempDir::new().unwrap();
        let recorder = ApplicationRecorder::new(&dir.path().join("job_applications"));
        let app = application();
        let success = recorder.save(&app, false).unwrap();
        let failed = recorder.save(&app, true).unwrap();

        recorder.discard(&app).unwrap();

        assert!(!success.exists());
        assert!(failed.exists());
        assert!(recorder.discard(&app).is_ok());
    }

    #[test]
    fn test_missing_artifact_is_not_fatal() {
        let dir = TempDir::new().unwrap();
        let mut app = application();
        app.job.cover_letter_path = Some(dir.path().join("gone.pdf"));
        let recorder = ApplicationRecorder::new(&dir.path().join("apps"));

        assert!(recorder.save(&app, false).is_ok());
    }
}
