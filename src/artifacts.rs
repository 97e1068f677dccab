use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::ai::AIProvider;
use crate::answerer::Answerer;
use crate::error::{ApplyError, LlmError};
use crate::models::Job;
use crate::profile::Profile;
use crate::prompts::{self, fill};
use crate::render::PdfRenderer;

pub const MAX_UPLOAD_BYTES: u64 = 2 * 1024 * 1024;
pub const ALLOWED_EXTENSIONS: &[&str] = &["pdf", "doc", "docx"];
const RATE_LIMIT_FALLBACK: Duration = Duration::from_secs(20);

/// Writes a tailored resume as plain text.
pub trait ResumeGenerator {
    fn tailor_resume(&self, job_description: &str, resume: &str) -> Result<String, LlmError>;
}

pub struct LlmResumeGenerator {
    provider: Box<dyn AIProvider>,
}

impl LlmResumeGenerator {
    pub fn new(provider: Box<dyn AIProvider>) -> Self {
        Self { provider }
    }
}

impl ResumeGenerator for LlmResumeGenerator {
    fn tailor_resume(&self, job_description: &str, resume: &str) -> Result<String, LlmError> {
        let prompt = fill(
            prompts::TAILOR_RESUME_TEMPLATE,
            &[("job_description", job_description), ("resume", resume)],
        );
        self.provider.complete(&prompt, 4096)
    }
}

/// Checks size and extension before a file is handed to an upload control.
pub fn validate_upload(path: &Path) -> Result<(), ApplyError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(ApplyError::UploadConstraint(format!(
            "{}: extension must be one of {}",
            path.display(),
            ALLOWED_EXTENSIONS.join(", ")
        )));
    }

    let size = fs::metadata(path)
        .map_err(|e| ApplyError::UploadConstraint(format!("{}: {}", path.display(), e)))?
        .len();
    if size > MAX_UPLOAD_BYTES {
        return Err(ApplyError::UploadConstraint(format!(
            "{}: {} bytes exceeds the 2 MiB limit",
            path.display(),
            size
        )));
    }
    Ok(())
}

/// Retries `op` for as long as the provider reports rate limiting.
pub fn retry_rate_limited<T>(
    mut op: impl FnMut() -> Result<T, LlmError>,
    sleep: &dyn Fn(Duration),
) -> Result<T, LlmError> {
    let mut attempt = 1;
    loop {
        match op() {
            Err(LlmError::RateLimited { retry_after }) => {
                let wait = retry_after.unwrap_or(RATE_LIMIT_FALLBACK);
                warn!(attempt, wait_secs = wait.as_secs_f64(), "Rate limited, retrying");
                sleep(wait);
                attempt += 1;
            }
            other => return other,
        }
    }
}

/// Produces the resume and cover-letter files an application uploads.
pub struct ArtifactBuilder<'a> {
    generator: &'a dyn ResumeGenerator,
    renderer: &'a dyn PdfRenderer,
    answerer: &'a dyn Answerer,
    profile: &'a Profile,
    output_dir: PathBuf,
    supplied_resume: Option<PathBuf>,
    sleep: Box<dyn Fn(Duration) + 'a>,
}

impl<'a> ArtifactBuilder<'a> {
    pub fn new(
        generator: &'a dyn ResumeGenerator,
        renderer: &'a dyn PdfRenderer,
        answerer: &'a dyn Answerer,
        profile: &'a Profile,
        output_dir: &Path,
        supplied_resume: Option<PathBuf>,
    ) -> Self {
        Self {
            generator,
            renderer,
            answerer,
            profile,
            output_dir: output_dir.to_path_buf(),
            supplied_resume,
            sleep: Box::new(std::thread::sleep),
        }
    }

    pub fn with_sleep(mut self, sleep: impl Fn(Duration) + 'a) -> Self {
        self.sleep = Box::new(sleep);
        self
    }

    pub fn resume_for(&self, job: &Job) -> Result<PathBuf, ApplyError> {
        if let Some(path) = &self.supplied_resume {
            match validate_upload(path) {
                Ok(()) => return Ok(path.clone()),
                Err(e) => warn!(error = %e, "Supplied resume is unusable, generating one"),
            }
        }

        let resume = self.profile.resume_text();
        let text = retry_rate_limited(
            || self.generator.tailor_resume(&job.description, &resume),
            self.sleep.as_ref(),
        )?;
        self.write_pdf("CV", &text)
    }

    pub fn cover_letter_for(&self, job: &Job) -> Result<PathBuf, ApplyError> {
        let text = self.answerer.write_cover_letter(
            &job.description,
            &job.company,
            &self.profile.resume_text(),
        )?;
        self.write_pdf("Cover_Letter", &text)
    }

    fn write_pdf(&self, prefix: &str, text: &str) -> Result<PathBuf, ApplyError> {
        let bytes = self.renderer.render_pdf(text)?;
        fs::create_dir_all(&self.output_dir)?;
        let path = self
            .output_dir
            .join(format!("{}_{}.pdf", prefix, Local::now().timestamp_millis()));
        fs::write(&path, bytes)?;
        validate_upload(&path)?;
        info!(path = %path.display(), "Generated document");
        Ok(fs::canonicalize(&path)?)
    }
}
