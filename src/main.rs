mod ai;
mod answerer;
mod artifacts;
mod cache;
mod classifier;
mod config;
mod engine;
mod error;
mod ledger;
mod models;
mod pacing;
mod portal;
mod profile;
mod prompts;
mod recorder;
mod render;
mod resolver;
mod runner;
mod security;
mod suitability;
#[cfg(test)]
mod testing;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use answerer::LlmAnswerer;
use artifacts::{ArtifactBuilder, LlmResumeGenerator};
use cache::AnswerCache;
use config::Config;
use engine::{EngineContext, FormTraversalEngine};
use ledger::{JobLedger, LedgerStatus};
use models::Job;
use pacing::Pacing;
use portal::Vendor;
use portal::webdriver::WebDriverPage;
use profile::Profile;
use recorder::ApplicationRecorder;
use render::LopdfRenderer;
use resolver::AnswerResolver;
use runner::{JobFilters, JobRunner};
use security::{ConsoleSecurityCheck, NoopSecurityCheck, SecurityCheck};
use suitability::SuitabilityGate;

#[derive(Parser)]
#[command(name = "autoapply")]
#[command(about = "Apply to Lever and Greenhouse job postings with LLM-generated answers")]
struct Cli {
    /// Path to the YAML config (work preferences + settings)
    #[arg(short, long, default_value = "config.yaml", global = true)]
    config: PathBuf,

    /// Default log filter when AUTOAPPLY_LOG is not set
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply to one job or a list of jobs
    Apply {
        /// JSON file containing a list of jobs
        #[arg(short, long, conflicts_with = "link")]
        jobs: Option<PathBuf>,

        /// Posting URL of a single job
        #[arg(short, long, requires_all = ["company", "title"])]
        link: Option<String>,

        #[arg(long)]
        company: Option<String>,

        #[arg(long)]
        title: Option<String>,

        /// ATS vendor (greenhouse, lever); guessed from the link when omitted
        #[arg(long)]
        portal: Option<String>,

        /// Model override (see `ai::resolve_model`)
        #[arg(short, long)]
        model: Option<String>,

        /// Disable randomized delays between page operations
        #[arg(long)]
        no_pacing: bool,

        /// Do not pause on security checks
        #[arg(long)]
        no_security_pause: bool,
    },

    /// Inspect the answer cache
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },

    /// Inspect the per-status job ledgers
    Ledger {
        #[command(subcommand)]
        command: LedgerCommands,
    },
}

#[derive(Subcommand)]
enum CacheCommands {
    /// List all cached answers
    List,

    /// Look up a cached answer
    Lookup {
        question: String,

        /// Question type (text, numeric, radio, dropdown)
        #[arg(short = 't', long = "type", default_value = "text")]
        kind: String,
    },
}

#[derive(Subcommand)]
enum LedgerCommands {
    /// Show entries for one status (success, failed, skipped)
    Show { status: String },
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_env("AUTOAPPLY_LOG").unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        format!("{}...", s.chars().take(max.saturating_sub(3)).collect::<String>())
    }
}

fn load_jobs(path: &Path) -> Result<Vec<Job>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read jobs file: {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid jobs file: {}", path.display()))
}

fn single_job(link: &str, company: &str, title: &str, portal: Option<&str>) -> Result<Job> {
    let vendor = match portal {
        Some(name) => Vendor::from_name(name).ok_or_else(|| anyhow!("Unsupported portal: {}", name))?,
        None => Vendor::from_link(link)
            .ok_or_else(|| anyhow!("Cannot tell the portal from {}, pass --portal", link))?,
    };
    let id = vendor
        .job_id_from_link(link)
        .or_else(|| link.trim_end_matches('/').rsplit('/').next().map(str::to_string))
        .unwrap_or_default();
    Ok(Job::new(&vendor.to_string(), &id, title, company, link))
}

struct ApplyArgs {
    jobs: Vec<Job>,
    model: Option<String>,
    no_pacing: bool,
    no_security_pause: bool,
}

fn cmd_apply(mut config: Config, mut args: ApplyArgs) -> Result<()> {
    if let Some(model) = args.model {
        config.settings.model = model;
    }
    let settings = &config.settings;

    let profile = Profile::load(&settings.profile)?;
    let model_spec = ai::resolve_model(&settings.model)?;
    let answerer = LlmAnswerer::new(ai::create_provider(&model_spec, settings.llm_base_url.as_deref())?);
    let generator = LlmResumeGenerator::new(ai::create_provider(&model_spec, settings.llm_base_url.as_deref())?);
    let renderer = LopdfRenderer::default();
    let cache = AnswerCache::open(&settings.answers_cache_path())?;
    let recorder = ApplicationRecorder::new(&settings.applications_dir());
    let ledger = JobLedger::new(&settings.output_dir);
    let filters = JobFilters::from_preferences(&config.work_preferences)
        .context("Invalid blacklist entry")?;
    let pacing = Pacing::new(settings.pacing && !args.no_pacing);
    let security: Box<dyn SecurityCheck> = if args.no_security_pause {
        Box::new(NoopSecurityCheck)
    } else {
        Box::new(ConsoleSecurityCheck)
    };

    println!("Using model: {} ({} jobs)", model_spec.short_name, args.jobs.len());
    let mut page = WebDriverPage::connect(&settings.webdriver_url, pacing)
        .with_context(|| format!("Failed to start browser session at {}", settings.webdriver_url))?;

    let result = {
        let ctx = EngineContext {
            page: &mut page,
            answerer: &answerer,
            resolver: AnswerResolver::new(
                cache,
                &answerer,
                &profile,
                settings.cache_enabled,
                &settings.default_numeric_answer,
            ),
            gate: SuitabilityGate::new(
                &answerer,
                &profile,
                settings.suitability_threshold,
                settings.fail_open,
            ),
            artifacts: ArtifactBuilder::new(
                &generator,
                &renderer,
                &answerer,
                &profile,
                &settings.generated_dir(),
                settings.resume.clone(),
            ),
            recorder: &recorder,
            security: security.as_ref(),
            preferences: &config.work_preferences,
            pacing,
        };
        let mut engine = FormTraversalEngine::new(ctx);
        let mut runner = JobRunner::new(&ledger, filters, settings.apply_once_per_company);
        runner.run(&mut engine, &mut args.jobs)
    };

    if let Err(e) = page.quit() {
        warn!(error = %e, "Failed to close browser session");
    }

    let summary = result.context("Run aborted")?;
    println!(
        "Applied: {}  Skipped: {}  Failed: {}",
        summary.applied, summary.skipped, summary.failed
    );
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);
    let config = Config::load(&cli.config)?;

    match cli.command {
        Commands::Apply {
            jobs,
            link,
            company,
            title,
            portal,
            model,
            no_pacing,
            no_security_pause,
        } => {
            let jobs = match (jobs, link) {
                (Some(path), _) => load_jobs(&path)?,
                (None, Some(link)) => vec![single_job(
                    &link,
                    company.as_deref().unwrap_or_default(),
                    title.as_deref().unwrap_or_default(),
                    portal.as_deref(),
                )?],
                (None, None) => return Err(anyhow!("Pass either --jobs <file> or --link <url>")),
            };
            cmd_apply(
                config,
                ApplyArgs {
                    jobs,
                    model,
                    no_pacing,
                    no_security_pause,
                },
            )?;
        }

        Commands::Cache { command } => {
            let cache = AnswerCache::open(&config.settings.answers_cache_path())?;
            match command {
                CacheCommands::List => {
                    if cache.entries().is_empty() {
                        println!("Answer cache is empty ({})", cache.path().display());
                    } else {
                        println!("{:<10} {:<50} {}", "TYPE", "QUESTION", "ANSWER");
                        println!("{}", "-".repeat(90));
                        for entry in cache.entries() {
                            println!(
                                "{:<10} {:<50} {}",
                                entry.kind,
                                truncate(&entry.question, 48),
                                truncate(&entry.answer, 40)
                            );
                        }
                    }
                }
                CacheCommands::Lookup { question, kind } => match cache.lookup(&question, &kind) {
                    Some(entry) => println!("{}", entry.answer),
                    None => println!("No cached answer for '{}' ({})", question, kind),
                },
            }
        }

        Commands::Ledger { command } => match command {
            LedgerCommands::Show { status } => {
                let status: LedgerStatus = status.parse().map_err(|e: String| anyhow!(e))?;
                let ledger = JobLedger::new(&config.settings.output_dir);
                let entries = ledger.entries(status)?;
                if entries.is_empty() {
                    println!("No {} jobs.", status);
                } else {
                    println!("{:<20} {:<20} {:<30} {}", "TIMESTAMP", "COMPANY", "TITLE", "REASON");
                    println!("{}", "-".repeat(100));
                    for entry in entries {
                        println!(
                            "{:<20} {:<20} {:<30} {}",
                            entry.timestamp,
                            truncate(&entry.company, 18),
                            truncate(&entry.job_title, 28),
                            entry.reason
                        );
                    }
                }
            }
        },
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_job_from_lever_link() {
        let job = single_job(
            "https://jobs.lever.co/acme/0a1b2c3d-1111-2222-3333-444455556666",
            "Acme",
            "Engineer",
            None,
        )
        .unwrap();
        assert_eq!(job.portal, "lever");
        assert_eq!(job.id, "0a1b2c3d-1111-2222-3333-444455556666");
    }

    #[test]
    fn test_single_job_requires_known_portal() {
        assert!(single_job("https://example.com/jobs/1", "Acme", "Engineer", None).is_err());
        let job = single_job("https://example.com/jobs/1", "Acme", "Engineer", Some("greenhouse")).unwrap();
        assert_eq!(job.id, "1");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a very long question", 10), "a very ...");
    }
}
