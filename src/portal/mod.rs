pub mod greenhouse;
pub mod lever;
pub mod webdriver;

use std::fmt;
use std::path::Path;

use crate::error::PageError;
use crate::models::Job;

/// One logical question plus its control, snapshotted as outer HTML.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormSection {
    /// Position on the current page, in DOM order.
    pub index: usize,
    pub html: String,
}

/// Fields pulled off a job posting. Optional ones default to empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobDetails {
    pub description: String,
    pub location: String,
    pub recruiter_link: String,
    pub categories: Vec<String>,
}

/// The posting page of a job.
pub trait JobPage {
    fn open(&mut self, job: &Job) -> Result<(), PageError>;
    fn details(&mut self) -> Result<JobDetails, PageError>;
    fn click_apply(&mut self) -> Result<(), PageError>;
}

/// The application form, one page at a time.
pub trait FormPage {
    /// Sections of the current page, in page order.
    fn sections(&mut self) -> Result<Vec<FormSection>, PageError>;
    fn fill_text(&mut self, section: &FormSection, text: &str) -> Result<(), PageError>;
    /// Clicks the radio button or checkbox labelled `option`.
    fn choose_option(&mut self, section: &FormSection, option: &str) -> Result<(), PageError>;
    fn choose_dropdown(&mut self, section: &FormSection, option: &str) -> Result<(), PageError>;
    /// Ticks every consent checkbox in the section.
    fn accept_agreement(&mut self, section: &FormSection) -> Result<(), PageError>;
    fn upload(&mut self, section: &FormSection, path: &Path) -> Result<(), PageError>;

    fn security_check_present(&mut self) -> Result<bool, PageError>;

    fn has_next(&mut self) -> Result<bool, PageError>;
    fn click_next(&mut self) -> Result<(), PageError>;
    fn has_submit(&mut self) -> Result<bool, PageError>;
    fn click_submit(&mut self) -> Result<(), PageError>;
    fn validation_errors(&mut self) -> Result<Vec<String>, PageError>;
    fn is_submission_confirmed(&mut self) -> Result<bool, PageError>;
    /// Best-effort click on a "save" affordance, if the page has one.
    fn click_save(&mut self) -> Result<(), PageError>;
}

pub trait ApplicationPage: JobPage + FormPage {}

impl<T: JobPage + FormPage> ApplicationPage for T {}

/// CSS selectors for one ATS vendor. Each list is tried in order.
#[derive(Debug)]
pub struct VendorSelectors {
    pub description: &'static [&'static str],
    pub location: &'static [&'static str],
    pub categories: &'static [&'static str],
    pub recruiter: &'static [&'static str],
    pub apply_button: &'static [&'static str],
    pub section: &'static str,
    pub next_button: &'static [&'static str],
    pub submit_button: &'static [&'static str],
    pub validation_error: &'static [&'static str],
    pub confirmation: &'static [&'static str],
    pub save_button: &'static [&'static str],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vendor {
    Greenhouse,
    Lever,
}

impl Vendor {
    pub fn from_name(name: &str) -> Option<Vendor> {
        match name.trim().to_lowercase().as_str() {
            "greenhouse" => Some(Vendor::Greenhouse),
            "lever" => Some(Vendor::Lever),
            _ => None,
        }
    }

    /// Guesses the vendor from a posting URL.
    pub fn from_link(link: &str) -> Option<Vendor> {
        if link.contains("greenhouse.io") {
            Some(Vendor::Greenhouse)
        } else if link.contains("lever.co") {
            Some(Vendor::Lever)
        } else {
            None
        }
    }

    pub fn selectors(self) -> &'static VendorSelectors {
        match self {
            Vendor::Greenhouse => &greenhouse::SELECTORS,
            Vendor::Lever => &lever::SELECTORS,
        }
    }

    pub fn job_id_from_link(self, link: &str) -> Option<String> {
        match self {
            Vendor::Greenhouse => greenhouse::job_id_from_link(link),
            Vendor::Lever => lever::job_id_from_link(link),
        }
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Vendor::Greenhouse => f.write_str("greenhouse"),
            Vendor::Lever => f.write_str("lever"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vendor_from_name_and_link() {
        assert_eq!(Vendor::from_name(" Lever "), Some(Vendor::Lever));
        assert_eq!(Vendor::from_name("workday"), None);
        assert_eq!(
            Vendor::from_link("https://boards.greenhouse.io/acme/jobs/123"),
            Some(Vendor::Greenhouse)
        );
        assert_eq!(Vendor::from_link("https://jobs.lever.co/acme/abc"), Some(Vendor::Lever));
        assert_eq!(Vendor::from_link("https://example.com"), None);
        assert_eq!(Vendor::Greenhouse.to_string(), "greenhouse");
    }
}
