use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Candidate's job preferences, forwarded to the LLM and used by the filters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkPreferences {
    pub positions: Vec<String>,
    pub locations: Vec<String>,
    pub remote: bool,
    pub hybrid: bool,
    pub onsite: bool,
    pub experience_level: Vec<String>,
    pub company_blacklist: Vec<String>,
    pub title_blacklist: Vec<String>,
    pub location_blacklist: Vec<String>,
    pub keywords_whitelist: Vec<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub output_dir: PathBuf,
    pub applications_dir: Option<PathBuf>,
    pub answers_cache: Option<PathBuf>,
    pub cache_enabled: bool,
    pub suitability_threshold: u32,
    pub default_numeric_answer: String,
    pub apply_once_per_company: bool,
    /// Treat unparseable preference/score responses as a match.
    pub fail_open: bool,
    pub resume: Option<PathBuf>,
    pub profile: PathBuf,
    pub model: String,
    pub llm_base_url: Option<String>,
    pub webdriver_url: String,
    pub pacing: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            applications_dir: None,
            answers_cache: None,
            cache_enabled: true,
            suitability_threshold: 7,
            default_numeric_answer: "3".to_string(),
            apply_once_per_company: false,
            fail_open: true,
            resume: None,
            profile: PathBuf::from("profile.yaml"),
            model: "claude-sonnet".to_string(),
            llm_base_url: None,
            webdriver_url: "http://localhost:9515".to_string(),
            pacing: true,
        }
    }
}

impl Settings {
    pub fn applications_dir(&self) -> PathBuf {
        self.applications_dir
            .clone()
            .unwrap_or_else(|| self.output_dir.join("job_applications"))
    }

    pub fn answers_cache_path(&self) -> PathBuf {
        self.answers_cache
            .clone()
            .unwrap_or_else(|| self.output_dir.join("answers.json"))
    }

    pub fn generated_dir(&self) -> PathBuf {
        self.output_dir.join("generated_cv")
    }

    /// Applies `AUTOAPPLY_*` overrides from the given lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("AUTOAPPLY_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(dir);
        }
        if let Some(model) = lookup("AUTOAPPLY_MODEL") {
            self.model = model;
        }
        if let Some(url) = lookup("AUTOAPPLY_LLM_BASE_URL") {
            self.llm_base_url = Some(url);
        }
        if let Some(url) = lookup("AUTOAPPLY_WEBDRIVER_URL") {
            self.webdriver_url = url;
        }
        if let Some(resume) = lookup("AUTOAPPLY_RESUME") {
            self.resume = Some(PathBuf::from(resume));
        }
        if let Some(cache) = lookup("AUTOAPPLY_CACHE") {
            self.cache_enabled = parse_bool("AUTOAPPLY_CACHE", &cache)?;
        }
        if let Some(pacing) = lookup("AUTOAPPLY_PACING") {
            self.pacing = parse_bool("AUTOAPPLY_PACING", &pacing)?;
        }
        if let Some(threshold) = lookup("AUTOAPPLY_SUITABILITY_THRESHOLD") {
            self.suitability_threshold = threshold
                .trim()
                .parse()
                .context("AUTOAPPLY_SUITABILITY_THRESHOLD must be a non-negative integer")?;
        }
        Ok(())
    }
}

fn default_output_dir() -> PathBuf {
    if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "autoapply") {
        proj_dirs.data_dir().to_path_buf()
    } else {
        PathBuf::from("output")
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(anyhow!("{} must be a boolean, got '{}'", key, other)),
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub work_preferences: WorkPreferences,
    pub settings: Settings,
}

impl Config {
    /// Loads the YAML config, then layers `.env` and process environment on top.
    pub fn load(path: &Path) -> Result<Self> {
        dotenvy::dotenv().ok();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let mut config = Self::from_yaml(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        config.settings.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        for pattern in self
            .work_preferences
            .company_blacklist
            .iter()
            .chain(&self.work_preferences.title_blacklist)
            .chain(&self.work_preferences.location_blacklist)
        {
            if pattern.trim().is_empty() {
                return Err(anyhow!("Blacklist entries must not be empty"));
            }
        }
        if self.settings.default_numeric_answer.trim().parse::<i64>().is_err() {
            return Err(anyhow!(
                "default_numeric_answer must be a number, got '{}'",
                self.settings.default_numeric_answer
            ));
        }
        Ok(())
    }
}
