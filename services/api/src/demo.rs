use crate::infra::{MemoryRegistry, Services};
use clap::Args;
use hiretrack::config::BotMimicConfig;
use hiretrack::error::AppError;
use hiretrack::workflows::applications::{
    Actor, ActorRole, ApplicationRecord, ApplicationStatus, ApplicationSubmission, Job, JobDraft,
    JobType, RegistryError, ScreeningAnswer, StatusChangeRequest,
};
use hiretrack::workflows::bot_mimic::BatchReport;
use std::time::Duration;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Number of Bot Mimic passes to run over the seeded applications
    #[arg(long, default_value_t = 3)]
    pub(crate) ticks: u32,
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let services = Services::in_memory(&BotMimicConfig {
        persistence_timeout: Duration::from_secs(5),
        default_interval_minutes: 5,
        auto_process_on_start: false,
    });

    println!("Bot Mimic demo");
    let seeded = match seed(&services.registry).await {
        Ok(seeded) => seeded,
        Err(err) => {
            println!("  Seeding failed: {err}");
            return Ok(());
        }
    };
    for record in &seeded {
        println!(
            "- Seeded application {} on {} -> {}",
            record.id,
            record.job_id,
            record.status()
        );
    }

    let processor = services.processor();
    for tick in 1..=args.ticks {
        match processor.process_eligible().await {
            Ok(report) => render_pass(tick, &report),
            Err(err) => println!("\nPass {tick}: unavailable ({err})"),
        }
    }

    println!("\nStatus histories");
    for record in &seeded {
        let current = match services.registry.get(&record.id).await {
            Ok(current) => current,
            Err(err) => {
                println!("  {}: lookup failed ({err})", record.id);
                continue;
            }
        };
        println!("  {} ({})", current.id, current.status());
        for entry in current.status_history() {
            println!(
                "    - {} by {} [{}]{}",
                entry.status,
                entry.changed_by.name,
                entry.changed_by.role.label(),
                entry
                    .comment
                    .as_deref()
                    .map(|comment| format!(": {comment}"))
                    .unwrap_or_default()
            );
        }
    }

    match processor.stats().await {
        Ok(stats) => {
            println!(
                "\nStats: {} applications | {} technical | {} still eligible | {} automated",
                stats.total_applications,
                stats.technical_applications,
                stats.eligible_applications,
                stats.automated_transitions
            );
            match serde_json::to_string_pretty(&stats.by_status) {
                Ok(json) => println!("  By status:\n{json}"),
                Err(err) => println!("  By status unavailable: {err}"),
            }
        }
        Err(err) => println!("\nStats unavailable: {err}"),
    }

    Ok(())
}

fn render_pass(tick: u32, report: &BatchReport) {
    println!(
        "\nPass {tick}: {} processed | {} advanced | {} failed",
        report.total, report.succeeded, report.failed
    );
    for item in &report.results {
        match (item.previous_status, item.new_status) {
            (Some(from), Some(to)) => println!("  - {}: {from} -> {to}", item.application_id),
            _ => println!(
                "  - {}: {}",
                item.application_id,
                item.error.as_deref().unwrap_or("failed")
            ),
        }
    }
}

/// Seed technical and non-technical applications; the last one is withdrawn before any pass runs.
async fn seed(registry: &MemoryRegistry) -> Result<Vec<ApplicationRecord>, RegistryError> {
    let admin = Actor::new("admin", "Administrator", ActorRole::Admin);
    let backend = registry
        .create_job(&admin, draft("Backend Engineer", JobType::Technical))
        .await?;
    let recruiter = registry
        .create_job(&admin, draft("Technical Recruiter", JobType::NonTechnical))
        .await?;

    let mut seeded = Vec::new();
    for (id, name, job) in [
        ("user-ada", "Ada", &backend),
        ("user-linus", "Linus", &backend),
        ("user-grace", "Grace", &recruiter),
        ("user-alan", "Alan", &backend),
    ] {
        let applicant = Actor::new(id, name, ActorRole::Applicant);
        let record = registry.submit(&applicant, submission(job)).await?;
        seeded.push((applicant, record));
    }

    if let Some((applicant, record)) = seeded.last() {
        registry
            .change_status(
                applicant,
                &record.id,
                StatusChangeRequest {
                    status: ApplicationStatus::Withdrawn,
                    comment: Some("Accepted another offer".to_string()),
                },
            )
            .await?;
    }

    Ok(seeded.into_iter().map(|(_, record)| record).collect())
}

fn draft(title: &str, job_type: JobType) -> JobDraft {
    JobDraft {
        title: title.to_string(),
        company: "Hiretrack Demo Co".to_string(),
        job_type,
    }
}

fn submission(job: &Job) -> ApplicationSubmission {
    ApplicationSubmission {
        job_id: job.id.clone(),
        answers: vec![ScreeningAnswer {
            question: "Why are you interested in this role?".to_string(),
            answer: format!("I would like to work on {}.", job.title.to_lowercase()),
        }],
        resume: None,
        expected_salary: None,
    }
}
