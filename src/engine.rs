use std::fmt;
use std::path::PathBuf;
use tracing::{debug, error, info, warn};

use crate::answerer::{Answerer, UploadIntent};
use crate::artifacts::{ArtifactBuilder, validate_upload};
use crate::classifier;
use crate::config::WorkPreferences;
use crate::error::{ApplyError, Outcome};
use crate::models::{AnswerRecord, Job, JobApplication, JobState, Question};
use crate::pacing::Pacing;
use crate::portal::{ApplicationPage, FormSection};
use crate::recorder::ApplicationRecorder;
use crate::resolver::AnswerResolver;
use crate::security::SecurityCheck;
use crate::suitability::{GateDecision, SuitabilityGate};

/// Upper bound on "next" clicks before a form is considered stuck.
const MAX_PAGES: usize = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Navigating,
    DescriptionExtracted,
    SuitabilityChecked,
    FormFilling,
    NextPage,
    Submitting,
    Submitted,
    Skipped,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Idle => "idle",
            Stage::Navigating => "navigating",
            Stage::DescriptionExtracted => "description_extracted",
            Stage::SuitabilityChecked => "suitability_checked",
            Stage::FormFilling => "form_filling",
            Stage::NextPage => "next_page",
            Stage::Submitting => "submitting",
            Stage::Submitted => "submitted",
            Stage::Skipped => "skipped",
            Stage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Collaborators the engine drives.
pub struct EngineContext<'a> {
    pub page: &'a mut dyn ApplicationPage,
    pub answerer: &'a dyn Answerer,
    pub resolver: AnswerResolver<'a>,
    pub gate: SuitabilityGate<'a>,
    pub artifacts: ArtifactBuilder<'a>,
    pub recorder: &'a ApplicationRecorder,
    pub security: &'a dyn SecurityCheck,
    pub preferences: &'a WorkPreferences,
    pub pacing: Pacing,
}

/// Drives one job application at a time from posting to confirmation.
pub struct FormTraversalEngine<'a> {
    ctx: EngineContext<'a>,
    stage: Stage,
}

impl<'a> FormTraversalEngine<'a> {
    pub fn new(ctx: EngineContext<'a>) -> Self {
        Self {
            ctx,
            stage: Stage::Idle,
        }
    }

    fn transition(&mut self, next: Stage, job: &Job) {
        debug!(job = %job.title, company = %job.company, from = %self.stage, stage = %next, "Stage transition");
        self.stage = next;
    }

    /// Applies to `job`, updating it in place with what the posting reveals.
    pub fn apply(&mut self, job: &mut Job) -> Result<Outcome, ApplyError> {
        self.transition(Stage::Navigating, job);
        if let Err(e) = self.extract_details(job) {
            self.transition(Stage::Failed, job);
            job.state = JobState::Failed;
            return Err(e);
        }

        match self.ctx.gate.evaluate(job, self.ctx.preferences) {
            Ok(GateDecision::Skip(reason)) => {
                self.transition(Stage::Skipped, job);
                job.state = JobState::Skipped;
                return Ok(Outcome::Skipped(reason));
            }
            Ok(GateDecision::Proceed(verdict)) => {
                debug!(job = %job.title, score = ?verdict.score, "Suitability gate passed");
                self.transition(Stage::SuitabilityChecked, job);
            }
            Err(e) => {
                self.transition(Stage::Failed, job);
                job.state = JobState::Failed;
                return Err(e);
            }
        }

        job.state = JobState::Applying;
        let mut application = JobApplication::new(job.clone());
        let result = self.fill_and_submit(&mut application);
        job.resume_path = application.job.resume_path.clone();
        job.cover_letter_path = application.job.cover_letter_path.clone();

        match result {
            Ok(()) => {
                job.state = JobState::Applied;
                info!(job = %job.title, company = %job.company, "Application submitted");
                Ok(Outcome::Applied)
            }
            Err(e) => {
                self.transition(Stage::Failed, job);
                job.state = JobState::Failed;
                application.job.state = JobState::Failed;
                self.persist_failure(&application, &e);
                Err(e)
            }
        }
    }

    fn extract_details(&mut self, job: &mut Job) -> Result<(), ApplyError> {
        self.ctx.page.open(job)?;
        let details = self.ctx.page.details()?;
        job.description = details.description;
        job.location = details.location;
        job.recruiter_link = details.recruiter_link;
        job.categories = details.categories;
        self.transition(Stage::DescriptionExtracted, job);

        match self.ctx.answerer.summarize_job_description(&job.description) {
            Ok(summary) => job.summary = summary,
            Err(e) => warn!(job = %job.title, error = %e, "Could not summarize job description"),
        }
        Ok(())
    }

    fn persist_failure(&mut self, application: &JobApplication, cause: &ApplyError) {
        error!(job = %application.job.title, company = %application.job.company, error = %cause, "Application failed");
        match self.ctx.page.click_save() {
            Ok(()) => debug!("Saved partially filled form"),
            Err(e) if e.is_not_found() => debug!("No save affordance on failed form"),
            Err(e) => warn!(error = %e, "Could not save partially filled form"),
        }
        if let Err(e) = self.ctx.recorder.discard(application) {
            warn!(error = %e, "Could not discard success record");
        }
        if let Err(e) = self.ctx.recorder.save(application, true) {
            warn!(error = %e, "Could not persist failed application");
        }
    }

    fn fill_and_submit(&mut self, application: &mut JobApplication) -> Result<(), ApplyError> {
        self.transition(Stage::FormFilling, &application.job);
        self.ctx.page.click_apply()?;

        for page_number in 1..=MAX_PAGES {
            let sections = self.ctx.page.sections()?;
            debug!(page = page_number, sections = sections.len(), "Filling form page");
            for section in &sections {
                self.await_security_check("before form section")?;
                self.process_section(section, application)?;
                self.await_security_check("after form section")?;
            }

            if self.ctx.page.has_next()? {
                self.transition(Stage::NextPage, &application.job);
                self.ctx.page.click_next()?;
                self.check_validation()?;
                self.transition(Stage::FormFilling, &application.job);
                continue;
            }

            if self.ctx.page.has_submit()? {
                self.transition(Stage::Submitting, &application.job);
                self.ctx.page.click_submit()?;
                application.job.state = JobState::Applied;
                self.ctx.recorder.save(application, false)?;
                self.await_security_check("after submit")?;
                if !self.ctx.page.is_submission_confirmed()? {
                    return Err(ApplyError::MissingConfirmation(application.job.link.clone()));
                }
                self.transition(Stage::Submitted, &application.job);
                return Ok(());
            }

            return Err(ApplyError::UnrecognizedForm(application.job.link.clone()));
        }

        Err(ApplyError::UnrecognizedForm(format!(
            "{} (more than {} pages)",
            application.job.link, MAX_PAGES
        )))
    }

    fn await_security_check(&mut self, context: &str) -> Result<(), ApplyError> {
        if self.ctx.page.security_check_present()? {
            info!(context, "Security check detected");
            self.ctx.security.wait_for_human(context);
        }
        Ok(())
    }

    fn check_validation(&mut self) -> Result<(), ApplyError> {
        if self.ctx.page.validation_errors()?.is_empty() {
            return Ok(());
        }
        self.ctx.pacing.short();
        let errors = self.ctx.page.validation_errors()?;
        if errors.is_empty() {
            return Ok(());
        }
        Err(ApplyError::Validation(errors.join("; ")))
    }

    fn process_section(
        &mut self,
        section: &FormSection,
        application: &mut JobApplication,
    ) -> Result<(), ApplyError> {
        let Some(question) = classifier::classify(&section.html) else {
            return Ok(());
        };
        // Uploads are discovered under their resume/cover-letter label, once the intent is known.
        if !matches!(question, Question::Upload { .. }) {
            application.add_question_to_form(question.text());
        }

        self.answer_section(section, &question, application)
            .inspect_err(|e| {
                error!(
                    job = %application.job.title,
                    company = %application.job.company,
                    question = %question.text(),
                    error = %e,
                    "Could not answer question"
                );
            })
    }

    fn answer_section(
        &mut self,
        section: &FormSection,
        question: &Question,
        application: &mut JobApplication,
    ) -> Result<(), ApplyError> {
        let kind = question.cache_type();
        match question {
            Question::Upload { heading } => self.handle_upload(section, heading, application),
            Question::Agreement { text } => {
                self.ctx.page.accept_agreement(section)?;
                application.save_application_data(AnswerRecord::new(kind, text, "accept"));
                Ok(())
            }
            Question::Radio(q) => {
                let resolved = self
                    .ctx
                    .resolver
                    .resolve_choice(&q.question, kind, &q.options, &application.job)?;
                self.ctx.page.choose_option(section, &resolved.answer)?;
                application.save_application_data(AnswerRecord::new(kind, &q.question, &resolved.answer));
                Ok(())
            }
            Question::Dropdown(q) => {
                let resolved = self
                    .ctx
                    .resolver
                    .resolve_choice(&q.question, kind, &q.options, &application.job)?;
                self.ctx.page.choose_dropdown(section, &resolved.answer)?;
                application.save_application_data(AnswerRecord::new(kind, &q.question, &resolved.answer));
                Ok(())
            }
            Question::TextBox(q) => {
                let resolved = self.ctx.resolver.resolve_text(q, &application.job)?;
                self.ctx.page.fill_text(section, &resolved.answer)?;
                application.save_application_data(AnswerRecord::new(kind, &q.question, &resolved.answer));
                Ok(())
            }
        }
    }

    fn handle_upload(
        &mut self,
        section: &FormSection,
        heading: &str,
        application: &mut JobApplication,
    ) -> Result<(), ApplyError> {
        let intent = match self.ctx.answerer.classify_upload_intent(heading) {
            Ok(intent) => intent,
            Err(e) => {
                application.add_question_to_form(heading);
                return Err(e.into());
            }
        };
        let (path, record_kind, label): (PathBuf, &str, &str) = match intent {
            UploadIntent::Resume => {
                application.add_question_to_form("Resume");
                let path = match application.job.resume_path.clone() {
                    Some(existing) => existing,
                    None => self.ctx.artifacts.resume_for(&application.job)?,
                };
                application.job.resume_path = Some(path.clone());
                (path, "resume", "Resume")
            }
            UploadIntent::CoverLetter => {
                application.add_question_to_form("Cover Letter");
                let path = self.ctx.artifacts.cover_letter_for(&application.job)?;
                application.job.cover_letter_path = Some(path.clone());
                (path, "cover_letter", "Cover Letter")
            }
        };

        validate_upload(&path)?;
        self.ctx.page.upload(section, &path)?;
        application.save_application_data(AnswerRecord::new(
            record_kind,
            label,
            &path.display().to_string(),
        ));
        Ok(())
    }
}
