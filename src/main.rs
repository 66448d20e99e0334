use std::path::PathBuf;

use anyhow::bail;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;

mod metrics;
mod models;
mod report;
mod store;

#[derive(Parser)]
#[command(name = "engagement-metrics")]
#[command(about = "Applies synthetic engagement metrics to DocCloud demo fixtures", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute thread views and AI endorsements, then rewrite the fixtures
    Apply {
        /// Directory holding the JSON fixture files
        #[arg(long, default_value = "mocks")]
        mocks: PathBuf,
        /// RNG seed; reruns with the same seed reproduce the same metrics
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// Reference time for age-sensitive formulas (RFC 3339)
        #[arg(long, default_value = metrics::DEMO_NOW)]
        now: DateTime<Utc>,
        /// Compute and print metrics without touching the files
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate cross-references between fixture files
    Check {
        #[arg(long, default_value = "mocks")]
        mocks: PathBuf,
    },
    /// Generate a markdown engagement summary
    Report {
        #[arg(long, default_value = "mocks")]
        mocks: PathBuf,
        #[arg(long, default_value = "engagement-report.md")]
        out: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Apply {
            mocks,
            seed,
            now,
            dry_run,
        } => {
            let mut dataset = store::load(&mocks)?;
            let mut rng = StdRng::seed_from_u64(seed);
            metrics::apply(&mut dataset, now, &mut rng)?;

            if dry_run {
                println!("\nDry run, fixture files left untouched.");
            } else {
                println!("\nSaving updated files...");
                store::write_back(&mocks, &dataset)?;
                println!("\nEngagement metrics applied successfully!");
            }

            let summary = report::summarize(&dataset);
            println!(
                "\nView distribution: {}-{} views",
                summary.min_views, summary.max_views
            );
            println!("Average views: {:.0}", summary.avg_views);
            println!(
                "Endorsed posts: {}/{}",
                summary.endorsed_posts, summary.post_count
            );
            println!(
                "AI answers with instructor endorsement: {}/{}",
                summary.instructor_endorsed_answers, summary.answer_count
            );
        }
        Commands::Check { mocks } => {
            let dataset = store::load(&mocks)?;
            let problems = store::dangling_references(&dataset);
            if problems.is_empty() {
                println!("All references resolve.");
            } else {
                for problem in &problems {
                    println!("- {problem}");
                }
                bail!("{} dangling references found", problems.len());
            }
        }
        Commands::Report { mocks, out } => {
            let dataset = store::load(&mocks)?;
            let summary = report::summarize(&dataset);
            let report = report::build_report(&summary);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
