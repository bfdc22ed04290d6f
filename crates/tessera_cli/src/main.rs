use anyhow::{bail, Context, Result};
use chrono::{Duration, Local, NaiveDate, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tessera_analysis::{stats, AnalysisCoordinator, AnalysisReport};
use tessera_core::TesseraConfig;
use tessera_extraction::{GeminiClient, GenerativeClient, MockClient};
use tessera_store::SqliteStore;
use tracing::info;
use uuid::Uuid;

mod export;

#[derive(Parser, Debug)]
#[command(author, version, about = "Journal analysis and behavior-pattern tracking", long_about = None)]
struct Args {
    /// Path to the config file
    #[arg(short, long, default_value = "tessera.toml")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Add a journal entry
    Add {
        #[arg(long)]
        content: String,
        #[arg(long)]
        title: Option<String>,
        /// Mood 0-5
        #[arg(long, default_value_t = 3)]
        mood: u8,
    },
    /// List recent entries and their analysis state
    List {
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
    /// Analyze one entry, or everything still pending
    Analyze {
        entry_id: Option<Uuid>,
        #[arg(long)]
        pending: bool,
    },
    /// Wipe and re-run the analysis of an already-analyzed entry
    Reanalyze { entry_id: Uuid },
    /// Show the daily narrative summary; --generate calls the model
    Summary {
        /// Defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        generate: bool,
    },
    /// Aggregate statistics over recent days
    Stats {
        #[arg(long, default_value_t = 30)]
        days: i64,
    },
    /// Export extracted patterns
    Export {
        #[arg(long, value_enum, default_value = "json")]
        format: ExportFormat,
        #[arg(long, default_value_t = 30)]
        days: i64,
        /// Write to a file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Delete an entry and everything derived from it
    Delete { entry_id: Uuid },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ExportFormat {
    Json,
    Csv,
}

/// Canned response for the mock provider, so the pipeline can be
/// exercised offline.
const MOCK_RESPONSE: &str = r#"{"patterns": [{"type": "Sensory Overload", "category": "Sensory", "intensity": 6, "triggers": ["noise"]}], "cascades": [], "confidence": 0.5, "summary": "Mock analysis.", "overallIntensity": 5}"#;

fn build_client(config: &TesseraConfig) -> Result<Arc<dyn GenerativeClient>> {
    match config.llm.provider.as_str() {
        "gemini" => {
            let client = GeminiClient::new(&config.llm, config.analysis.retry.clone())
                .context("Failed to initialize Gemini client")?;
            Ok(Arc::new(client))
        }
        "mock" => Ok(Arc::new(MockClient::returning(MOCK_RESPONSE))),
        other => bail!("Unknown provider {:?} (expected \"gemini\" or \"mock\")", other),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = TesseraConfig::load_or_default(&args.config);

    let store = SqliteStore::open(&config.store.db_path)
        .await
        .with_context(|| format!("Failed to open database at {}", config.store.db_path))?;
    let client = build_client(&config)?;
    let coordinator = AnalysisCoordinator::new(store.clone(), client, &config);

    match args.command {
        Command::Add {
            content,
            title,
            mood,
        } => {
            let entry = tessera_core::JournalEntry::new(content, title, mood);
            store.insert_entry(&entry).await?;
            println!("Added entry {}", entry.id);
        }

        Command::List { limit } => {
            let entries = store.list_entries(limit).await?;
            if entries.is_empty() {
                println!("No entries yet.");
            }
            for e in entries {
                let state = if e.is_analyzed { "analyzed" } else { "pending" };
                let title = e.title.as_deref().unwrap_or("(untitled)");
                println!(
                    "{}  {}  [{}] mood {}  {}",
                    e.id,
                    e.timestamp.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
                    state,
                    e.mood,
                    title
                );
            }
        }

        Command::Analyze { entry_id, pending } => match (entry_id, pending) {
            (Some(id), _) => report_analysis(coordinator.analyze(id).await?),
            (None, true) => {
                let results = coordinator.analyze_pending().await?;
                info!("Processed {} pending entries", results.len());
                for (id, result) in results {
                    match result {
                        Ok(report) => {
                            print!("{}: ", id);
                            report_analysis(report);
                        }
                        Err(e) => println!("{}: failed ({}); entry left unanalyzed", id, e),
                    }
                }
            }
            (None, false) => bail!("Pass an entry id or --pending"),
        },

        Command::Reanalyze { entry_id } => report_analysis(coordinator.reanalyze(entry_id).await?),

        Command::Summary { date, generate } => {
            let today = Local::now().date_naive();
            let day = date.unwrap_or(today);
            let summary = if generate {
                coordinator.generate_summary(day).await?
            } else {
                coordinator.cached_summary(day, today).await?
            };
            match summary {
                Some(s) => {
                    println!("{}", s.text);
                    if !s.dominant.is_empty() {
                        println!("Dominant patterns: {}", s.dominant.join(", "));
                    }
                }
                None => println!(
                    "No summary available for {} (run with --generate to create one).",
                    day
                ),
            }
        }

        Command::Stats { days } => {
            let end = Utc::now();
            let start = end - Duration::days(days);
            let patterns = store.patterns_between(start, end).await?;
            let entries = store.list_entries(1000).await?;

            let entry_days: Vec<NaiveDate> = entries
                .iter()
                .map(|e| e.timestamp.with_timezone(&Local).date_naive())
                .collect();
            let today = Local::now().date_naive();
            println!("Journal streak: {} days", stats::day_streak(&entry_days, today));
            println!("Patterns in the last {} days: {}", days, patterns.len());

            for stat in stats::category_breakdown(&patterns) {
                println!(
                    "  {:<24} {:>3}  (mean intensity {:.1})",
                    stat.category.label(),
                    stat.count,
                    stat.mean_intensity
                );
            }

            let triggers = stats::top_triggers(&patterns, 5);
            if !triggers.is_empty() {
                println!("Top triggers:");
                for (trigger, count) in triggers {
                    println!("  {} ({}x)", trigger, count);
                }
            }
            let coping = stats::top_coping(&patterns, 5);
            if !coping.is_empty() {
                println!("Coping that helped:");
                for (strategy, count) in coping {
                    println!("  {} ({}x)", strategy, count);
                }
            }
        }

        Command::Export { format, days, out } => {
            let end = Utc::now();
            let start = end - Duration::days(days);
            let patterns = store.patterns_between(start, end).await?;
            let rendered = match format {
                ExportFormat::Json => export::to_json(&patterns)?,
                ExportFormat::Csv => export::to_csv(&patterns),
            };
            match out {
                Some(path) => {
                    std::fs::write(&path, rendered)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!("Exported {} patterns to {}", patterns.len(), path.display());
                }
                None => print!("{}", rendered),
            }
        }

        Command::Delete { entry_id } => {
            if store.delete_entry(entry_id).await? {
                println!("Deleted entry {}", entry_id);
            } else {
                println!("No entry {}", entry_id);
            }
        }
    }

    Ok(())
}

fn report_analysis(report: AnalysisReport) {
    match report {
        AnalysisReport::Completed {
            pattern_count,
            cascade_count,
            dropped_cascades,
        } => {
            print!("analyzed: {} patterns, {} cascades", pattern_count, cascade_count);
            if dropped_cascades > 0 {
                print!(" ({} cascade references dropped)", dropped_cascades);
            }
            println!();
        }
        AnalysisReport::Skipped => {
            println!("skipped: an analysis for this entry just ran or is still in flight");
        }
    }
}
