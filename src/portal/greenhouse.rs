use regex::Regex;
use std::sync::OnceLock;

use super::VendorSelectors;

// Covers both boards.greenhouse.io and the newer job-boards.greenhouse.io layout.
pub const SELECTORS: VendorSelectors = VendorSelectors {
    description: &["#content", ".job__description", "#app_body .content"],
    location: &[".location", ".job__location", "#header .location"],
    categories: &[".job__tags .tag", ".departments"],
    recruiter: &["a[href*='linkedin.com/in/']"],
    apply_button: &["#apply_button", "button.btn--pill", "a[href='#app']"],
    section: "#application .field, #custom_fields .field, .application--questions .field-wrapper, fieldset.checkbox-container",
    next_button: &[],
    submit_button: &["#submit_app", "button[type='submit']", "input[type='submit']"],
    validation_error: &[".field-error-msg", ".helper-text--error", "#error_explanation li"],
    confirmation: &["#application_confirmation", ".application--confirmation", "[data-testid='confirmation']"],
    save_button: &[],
};

/// `https://boards.greenhouse.io/acme/jobs/4012345` → `4012345`.
pub fn job_id_from_link(link: &str) -> Option<String> {
    static ID: OnceLock<Regex> = OnceLock::new();
    let re = ID.get_or_init(|| {
        Regex::new(r"(?:/jobs/|[?&]gh_jid=)(\d+)").expect("valid regex")
    });
    re.captures(link)?.get(1).map(|m| m.as_str().to_string())
}
