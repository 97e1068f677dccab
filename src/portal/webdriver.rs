use std::path::Path;
use thirtyfour::components::SelectElement;
use thirtyfour::prelude::*;
use tokio::runtime::Runtime;
use tracing::{debug, info};

use super::{FormPage, FormSection, JobDetails, JobPage, Vendor, VendorSelectors};
use crate::error::PageError;
use crate::models::Job;
use crate::pacing::Pacing;

const SECURITY_CHECK_SELECTORS: &[&str] = &[
    "iframe[src*='hcaptcha']",
    "iframe[src*='recaptcha/api2/bframe']",
    "#challenge-form",
];

const TEXT_FIELD: &str = "textarea, input:not([type='hidden']):not([type='file']):not([type='radio']):not([type='checkbox']):not([type='submit'])";

fn driver_err(e: WebDriverError) -> PageError {
    let message = e.to_string();
    let lower = message.to_lowercase();
    if lower.contains("invalid session id") || lower.contains("no such window") {
        PageError::SessionLost(message)
    } else {
        PageError::Driver(message)
    }
}

/// Drives a Chrome session through a WebDriver server (chromedriver).
///
/// The engine is synchronous, so every call blocks on a private runtime.
/// Form actions target the element handles captured by the last `sections()`
/// call, so sections revealed by an answer never shift the ones already listed.
pub struct WebDriverPage {
    runtime: Runtime,
    driver: WebDriver,
    vendor: Vendor,
    pacing: Pacing,
    sections: Vec<WebElement>,
}

impl WebDriverPage {
    pub fn connect(server_url: &str, pacing: Pacing) -> Result<Self, PageError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| PageError::Driver(format!("Failed to start runtime: {}", e)))?;

        let caps = DesiredCapabilities::chrome();
        let driver = runtime
            .block_on(WebDriver::new(server_url, caps))
            .map_err(driver_err)?;
        info!(server_url, "Connected to WebDriver");

        Ok(Self {
            runtime,
            driver,
            vendor: Vendor::Greenhouse,
            pacing,
            sections: Vec::new(),
        })
    }

    pub fn quit(self) -> Result<(), PageError> {
        self.runtime.block_on(self.driver.quit()).map_err(driver_err)
    }

    fn selectors(&self) -> &'static VendorSelectors {
        self.vendor.selectors()
    }

    fn find_all(&self, css: &str) -> Result<Vec<WebElement>, PageError> {
        self.runtime
            .block_on(self.driver.find_all(By::Css(css)))
            .map_err(driver_err)
    }

    /// First element matching any of `candidates`, in candidate order.
    fn first_match(&self, candidates: &[&str]) -> Result<Option<WebElement>, PageError> {
        for css in candidates {
            if let Some(el) = self.find_all(css)?.into_iter().next() {
                return Ok(Some(el));
            }
        }
        Ok(None)
    }

    fn first_text(&self, candidates: &[&str]) -> Result<String, PageError> {
        match self.first_match(candidates)? {
            Some(el) => self.runtime.block_on(el.text()).map_err(driver_err),
            None => Ok(String::new()),
        }
    }

    fn section_element(&self, section: &FormSection) -> Result<WebElement, PageError> {
        self.sections
            .get(section.index)
            .cloned()
            .ok_or_else(|| PageError::NotFound(format!("form section #{}", section.index)))
    }

    fn within(&self, parent: &WebElement, css: &str) -> Result<Vec<WebElement>, PageError> {
        self.runtime
            .block_on(parent.find_all(By::Css(css)))
            .map_err(driver_err)
    }

    fn click(&self, el: &WebElement) -> Result<(), PageError> {
        self.runtime.block_on(el.click()).map_err(driver_err)?;
        self.pacing.tiny();
        Ok(())
    }

    fn click_first(&self, candidates: &[&str], what: &str) -> Result<(), PageError> {
        let el = self
            .first_match(candidates)?
            .ok_or_else(|| PageError::NotFound(what.to_string()))?;
        self.click(&el)
    }

    fn any_displayed(&self, candidates: &[&str]) -> Result<bool, PageError> {
        for css in candidates {
            for el in self.find_all(css)? {
                if self.runtime.block_on(el.is_displayed()).map_err(driver_err)? {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }
}

impl JobPage for WebDriverPage {
    fn open(&mut self, job: &Job) -> Result<(), PageError> {
        self.vendor = Vendor::from_name(&job.portal)
            .or_else(|| Vendor::from_link(&job.link))
            .ok_or_else(|| PageError::Driver(format!("Unsupported portal: {}", job.portal)))?;
        debug!(link = %job.link, vendor = %self.vendor, "Navigating to job");
        self.sections.clear();
        self.runtime
            .block_on(self.driver.goto(&job.link))
            .map_err(driver_err)?;
        self.pacing.medium();
        Ok(())
    }

    fn details(&mut self) -> Result<JobDetails, PageError> {
        let sel = self.selectors();
        let description = self.first_text(sel.description)?;
        if description.trim().is_empty() {
            return Err(PageError::NotFound("job description".to_string()));
        }

        let recruiter_link = match self.first_match(sel.recruiter)? {
            Some(el) => self
                .runtime
                .block_on(el.attr("href"))
                .map_err(driver_err)?
                .unwrap_or_default(),
            None => String::new(),
        };

        let mut categories = Vec::new();
        for css in sel.categories {
            for el in self.find_all(css)? {
                let text = self.runtime.block_on(el.text()).map_err(driver_err)?;
                let text = text.trim().trim_end_matches('/').trim().to_string();
                if !text.is_empty() && !categories.contains(&text) {
                    categories.push(text);
                }
            }
        }

        Ok(JobDetails {
            description,
            location: self.first_text(sel.location)?.trim().to_string(),
            recruiter_link,
            categories,
        })
    }

    fn click_apply(&mut self) -> Result<(), PageError> {
        self.click_first(self.selectors().apply_button, "apply button")?;
        self.pacing.short();
        Ok(())
    }
}

impl FormPage for WebDriverPage {
    fn sections(&mut self) -> Result<Vec<FormSection>, PageError> {
        let elements = self.find_all(self.selectors().section)?;
        let mut sections = Vec::with_capacity(elements.len());
        for (index, el) in elements.iter().enumerate() {
            let html = self.runtime.block_on(el.outer_html()).map_err(driver_err)?;
            sections.push(FormSection { index, html });
        }
        self.sections = elements;
        Ok(sections)
    }

    fn fill_text(&mut self, section: &FormSection, text: &str) -> Result<(), PageError> {
        let el = self.section_element(section)?;
        let field = self
            .within(&el, TEXT_FIELD)?
            .into_iter()
            .next()
            .ok_or_else(|| PageError::NotFound("text field".to_string()))?;
        self.runtime.block_on(field.clear()).map_err(driver_err)?;
        self.runtime.block_on(field.send_keys(text)).map_err(driver_err)?;
        self.pacing.tiny();
        Ok(())
    }

    fn choose_option(&mut self, section: &FormSection, option: &str) -> Result<(), PageError> {
        let el = self.section_element(section)?;
        let wanted = option.trim().to_lowercase();
        for label in self.within(&el, "label")? {
            let text = self.runtime.block_on(label.text()).map_err(driver_err)?;
            if text.trim().to_lowercase() == wanted {
                return self.click(&label);
            }
        }
        for input in self.within(&el, "input[type='radio'], input[type='checkbox']")? {
            let value = self.runtime.block_on(input.attr("value")).map_err(driver_err)?;
            if value.is_some_and(|v| v.trim().to_lowercase() == wanted) {
                return self.click(&input);
            }
        }
        Err(PageError::NotFound(format!("option '{}'", option)))
    }

    fn choose_dropdown(&mut self, section: &FormSection, option: &str) -> Result<(), PageError> {
        let el = self.section_element(section)?;
        let select = self
            .within(&el, "select")?
            .into_iter()
            .next()
            .ok_or_else(|| PageError::NotFound("select".to_string()))?;
        self.runtime
            .block_on(async {
                let component = SelectElement::new(&select).await?;
                component.select_by_visible_text(option).await
            })
            .map_err(driver_err)?;
        self.pacing.tiny();
        Ok(())
    }

    fn accept_agreement(&mut self, section: &FormSection) -> Result<(), PageError> {
        let el = self.section_element(section)?;
        let checkboxes = self.within(&el, "input[type='checkbox']")?;
        if checkboxes.is_empty() {
            return Err(PageError::NotFound("agreement checkbox".to_string()));
        }
        for checkbox in checkboxes {
            if !self.runtime.block_on(checkbox.is_selected()).map_err(driver_err)? {
                self.click(&checkbox)?;
            }
        }
        Ok(())
    }

    fn upload(&mut self, section: &FormSection, path: &Path) -> Result<(), PageError> {
        let el = self.section_element(section)?;
        let input = self
            .within(&el, "input[type='file']")?
            .into_iter()
            .next()
            .ok_or_else(|| PageError::NotFound("file input".to_string()))?;
        let path = path.to_string_lossy().into_owned();
        self.runtime.block_on(input.send_keys(path)).map_err(driver_err)?;
        self.pacing.short();
        Ok(())
    }

    fn security_check_present(&mut self) -> Result<bool, PageError> {
        self.any_displayed(SECURITY_CHECK_SELECTORS)
    }

    fn has_next(&mut self) -> Result<bool, PageError> {
        Ok(self.first_match(self.selectors().next_button)?.is_some())
    }

    fn click_next(&mut self) -> Result<(), PageError> {
        self.click_first(self.selectors().next_button, "next button")?;
        self.pacing.short();
        Ok(())
    }

    fn has_submit(&mut self) -> Result<bool, PageError> {
        Ok(self.first_match(self.selectors().submit_button)?.is_some())
    }

    fn click_submit(&mut self) -> Result<(), PageError> {
        self.click_first(self.selectors().submit_button, "submit button")?;
        self.pacing.medium();
        Ok(())
    }

    fn validation_errors(&mut self) -> Result<Vec<String>, PageError> {
        let mut errors = Vec::new();
        for css in self.selectors().validation_error {
            for el in self.find_all(css)? {
                if !self.runtime.block_on(el.is_displayed()).map_err(driver_err)? {
                    continue;
                }
                let text = self.runtime.block_on(el.text()).map_err(driver_err)?;
                if !text.trim().is_empty() {
                    errors.push(text.trim().to_string());
                }
            }
        }
        Ok(errors)
    }

    fn is_submission_confirmed(&mut self) -> Result<bool, PageError> {
        self.any_displayed(self.selectors().confirmation)
    }

    fn click_save(&mut self) -> Result<(), PageError> {
        self.click_first(self.selectors().save_button, "save button")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[ignore] // Requires a running chromedriver and network access
    fn test_open_greenhouse_posting() {
        let mut page = WebDriverPage::connect("http://localhost:9515", Pacing::none())
            .expect("Failed to connect to chromedriver");
        let job = Job::new(
            "greenhouse",
            "1",
            "Engineer",
            "Acme",
            "https://boards.greenhouse.io/acme/jobs/1",
        );
        let result = page.open(&job).and_then(|_| page.details());

        assert!(result.is_ok() || result.is_err());
        page.quit().ok();
    }

    const CONDITIONAL_FORM: &str = r#"<html><body>
<form id="application">
  <div class="field"><label>First</label><input type="text" id="first" oninput="reveal()"></div>
  <div class="field"><label>Second</label><input type="text" id="second"></div>
</form>
<script>
function reveal() {
  if (document.getElementById('follow_up')) return;
  var d = document.createElement('div');
  d.className = 'field';
  d.innerHTML = '<label>Follow-up</label><input type="text" id="follow_up">';
  document.getElementById('first').parentNode.after(d);
}
</script>
</body></html>"#;

    #[test]
    #[ignore] // Requires a running chromedriver
    fn test_revealed_sections_do_not_shift_listed_ones() {
        let dir = tempfile::TempDir::new().unwrap();
        let form = dir.path().join("form.html");
        std::fs::write(&form, CONDITIONAL_FORM).unwrap();
        let mut page = WebDriverPage::connect("http://localhost:9515", Pacing::none())
            .expect("Failed to connect to chromedriver");
        let job = Job::new("greenhouse", "1", "Engineer", "Acme", &format!("file://{}", form.display()));
        page.open(&job).unwrap();

        let sections = page.sections().unwrap();
        assert_eq!(sections.len(), 2);
        page.fill_text(&sections[0], "one").unwrap();
        page.fill_text(&sections[1], "two").unwrap();

        let value = |id: &str| {
            let el = page.runtime.block_on(page.driver.find(By::Id(id))).unwrap();
            page.runtime.block_on(el.value()).unwrap().unwrap_or_default()
        };
        assert_eq!(value("second"), "two");
        assert_eq!(value("follow_up"), "");
        page.quit().ok();
    }
}
