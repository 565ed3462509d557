use chrono::Local;
use clap::{Args, ValueEnum};
use match_insights::analytics::{
    Comparison, OutcomeClassifier, ResultAggregator, ResultInsights, ResultSnapshot,
    ResultSummary, SnapshotImporter, StudentId, StudentOutcome,
};
use match_insights::config::AppConfig;
use match_insights::error::AppError;
use match_insights::telemetry::{self, LogSink};
use serde::Serialize;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct ReportArgs {
    /// JSON result snapshot produced by the simulation
    #[arg(long)]
    pub(crate) snapshot: PathBuf,
    /// CSV table replacing the snapshot's student records
    #[arg(long)]
    pub(crate) students_csv: Option<PathBuf>,
    /// CSV table replacing the snapshot's school records
    #[arg(long)]
    pub(crate) schools_csv: Option<PathBuf>,
    /// Student id to drill into
    #[arg(long)]
    pub(crate) student: Option<String>,
    /// Output format
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    pub(crate) format: ReportFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum ReportFormat {
    Text,
    Json,
}

#[derive(Debug, Serialize)]
pub(crate) struct ReportDocument {
    pub(crate) summary: ResultSummary,
    pub(crate) insights: ResultInsights,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) student: Option<StudentReport>,
}

#[derive(Debug, Serialize)]
pub(crate) struct StudentReport {
    pub(crate) outcome: StudentOutcome,
    pub(crate) narrative: Vec<String>,
}

/// Aggregates a snapshot and, when asked, one student's outcome.
pub(crate) fn assemble(
    snapshot: ResultSnapshot,
    student: Option<&str>,
) -> Result<ReportDocument, AppError> {
    let school_count = snapshot.schools.len();
    let aggregator = ResultAggregator::new(Arc::new(snapshot))?;
    let summary = aggregator.summary();
    let insights = summary.insights(school_count);

    let student = student
        .map(|id| {
            OutcomeClassifier::student_outcome(&aggregator, &StudentId(id.to_string())).map(
                |outcome| StudentReport {
                    narrative: outcome.narrative(),
                    outcome,
                },
            )
        })
        .transpose()?;

    Ok(ReportDocument {
        summary,
        insights,
        student,
    })
}

pub(crate) fn load_snapshot(args: &ReportArgs) -> Result<ResultSnapshot, AppError> {
    let mut snapshot = SnapshotImporter::from_path(&args.snapshot)?;
    if let Some(path) = &args.students_csv {
        let reader = BufReader::new(File::open(path)?);
        snapshot = SnapshotImporter::with_student_table(snapshot, reader)?;
    }
    if let Some(path) = &args.schools_csv {
        let reader = BufReader::new(File::open(path)?);
        snapshot = SnapshotImporter::with_school_table(snapshot, reader)?;
    }
    Ok(snapshot)
}

pub(crate) fn run_report(args: ReportArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry, LogSink::Stderr)?;

    let snapshot = load_snapshot(&args)?;
    let document = assemble(snapshot, args.student.as_deref())?;

    match args.format {
        ReportFormat::Json => {
            let rendered = serde_json::to_string_pretty(&document)
                .map_err(|err| AppError::Io(err.into()))?;
            println!("{rendered}");
        }
        ReportFormat::Text => render_text(&document),
    }

    Ok(())
}

fn render_text(document: &ReportDocument) {
    let summary = &document.summary;
    println!("Match results ({} students)", summary.total_students);
    println!("Generated {}", Local::now().format("%Y-%m-%d %H:%M"));

    println!("\nHeadlines");
    for line in &document.insights.headlines {
        println!("- {line}");
    }

    println!("\nRank bins");
    for entry in summary.bins.iter().filter(|entry| entry.count > 0) {
        let median = entry
            .median
            .as_ref()
            .map(|lottery| lottery.prefix(8).to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "- {}: {} students ({:.1}%), median lottery {}",
            entry.label, entry.count, entry.percentage, median
        );
    }

    if !document.insights.bin_observations.is_empty() {
        println!("\nLottery patterns");
        for line in &document.insights.bin_observations {
            println!("- {line}");
        }
    }

    println!("\nStrategies");
    for entry in &summary.strategies {
        println!(
            "- {} selection, {} ranking: {} students",
            entry.selection_label, entry.ranking_label, entry.students
        );
    }

    println!("\nAdmission policies");
    for entry in &summary.admission_policies {
        println!("- {}: {} schools", entry.policy_label, entry.schools);
    }

    if document.insights.capacity_observations.is_empty() {
        println!("\nCapacity: no schools reported");
    } else {
        println!("\nCapacity");
        for line in &document.insights.capacity_observations {
            println!("- {line}");
        }
    }

    if let Some(student) = &document.student {
        println!("\nStudent {}", student.outcome.student_id);
        println!(
            "Lottery {} | GPA {:.2}",
            student.outcome.lottery, student.outcome.gpa
        );
        if let Comparison::Computed(same) = &student.outcome.same_school {
            println!(
                "Same-school cohort: {} students at {}",
                same.cohort_size, same.school
            );
        }
        for line in &student.narrative {
            println!("- {line}");
        }
    }
}
