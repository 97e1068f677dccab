use regex::Regex;
use std::sync::OnceLock;

use super::VendorSelectors;

pub const SELECTORS: VendorSelectors = VendorSelectors {
    description: &[".section-wrapper.page-full-width", "[data-qa='job-description']", ".content"],
    location: &[".posting-categories .location", ".sort-by-time.posting-category"],
    categories: &[".posting-categories .posting-category"],
    recruiter: &["a[href*='linkedin.com/in/']"],
    apply_button: &[".postings-btn-wrapper a", "a.postings-btn", "[data-qa='show-page-apply']"],
    section: ".application-question, .application-additional, li.custom-question",
    next_button: &[],
    submit_button: &["#btn-submit", "button[data-qa='btn-submit']"],
    validation_error: &[".error-message", ".application-error", "[data-qa='error-message']"],
    confirmation: &["[data-qa='msg-submit-success']", ".application-confirmation", ".thanks"],
    save_button: &[],
};

/// `https://jobs.lever.co/acme/5f2c…-…/apply` → the posting UUID.
pub fn job_id_from_link(link: &str) -> Option<String> {
    static ID: OnceLock<Regex> = OnceLock::new();
    let re = ID.get_or_init(|| {
        Regex::new(r"lever\.co/[^/]+/([0-9a-fA-F-]{36})").expect("valid regex")
    });
    re.captures(link)?.get(1).map(|m| m.as_str().to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_id_from_link() {
        assert_eq!(
            job_id_from_link("https://jobs.lever.co/acme/0A1B2C3D-1111-2222-3333-444455556666/apply")
                .as_deref(),
            Some("0a1b2c3d-1111-2222-3333-444455556666")
        );
        assert_eq!(job_id_from_link("https://jobs.lever.co/acme"), None);
    }
}
