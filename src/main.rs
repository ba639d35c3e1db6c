use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

mod error;
mod forecast;
mod loader;
mod models;
mod productivity;
mod report;
mod segmentation;
mod session;
mod stats;
mod territory;
mod trends;

use loader::{SourceConfig, DEFAULT_SHEET, DEFAULT_SOURCE};
use report::fmt_ratio;
use session::{TerritorySelection, VisitSession};

#[derive(Parser)]
#[command(name = "visit-insights")]
#[command(about = "Field visit analytics for pharmacy sales teams", long_about = None)]
struct Cli {
    /// Visit table (.xlsx, .xls, .ods or .csv)
    #[arg(long, env = "VISITS_SOURCE", default_value = DEFAULT_SOURCE, global = true)]
    source: PathBuf,
    /// Sheet holding the visits, for workbook sources
    #[arg(long, env = "VISITS_SHEET", default_value = DEFAULT_SHEET, global = true)]
    sheet: String,
    /// Print views as JSON
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Scope {
    /// Territory code to include; repeat for several. Defaults to all.
    #[arg(long = "territory", value_name = "CODE")]
    territories: Vec<String>,
}

impl Scope {
    fn selection(&self) -> TerritorySelection {
        TerritorySelection::from_codes(&self.territories)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List territory codes present in the source
    ListTerritories,
    /// Visits per rep by territory, heaviest first
    Territories {
        #[command(flatten)]
        scope: Scope,
    },
    /// Territories under or above the mean visit count
    Coverage {
        #[command(flatten)]
        scope: Scope,
    },
    /// Pharmacy engagement scores and tiers
    Segments {
        #[command(flatten)]
        scope: Scope,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Most engaged and priority pharmacies
    Engagement {
        #[command(flatten)]
        scope: Scope,
        #[arg(long, default_value_t = report::TOP_PHARMACIES)]
        top: usize,
    },
    /// Pharmacies likely to order in the latest quarter
    Forecast {
        #[command(flatten)]
        scope: Scope,
    },
    /// Rep workload status
    Reps {
        #[command(flatten)]
        scope: Scope,
    },
    /// Monthly visits by activity type, rep and pharmacy
    Trends {
        #[command(flatten)]
        scope: Scope,
    },
    /// Pharmacies in the zones suggested for new reps
    Deployment {
        #[command(flatten)]
        scope: Scope,
        #[arg(long = "zone", value_name = "CODE")]
        zones: Vec<String>,
    },
    /// Generate a markdown report
    Report {
        #[command(flatten)]
        scope: Scope,
        #[arg(long = "zone", value_name = "CODE")]
        zones: Vec<String>,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("visit_insights=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn deployment_zones(zones: Vec<String>) -> Vec<String> {
    if zones.is_empty() {
        territory::DEFAULT_DEPLOYMENT_ZONES
            .iter()
            .map(|z| z.to_string())
            .collect()
    } else {
        zones
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = SourceConfig {
        path: cli.source.clone(),
        sheet: cli.sheet.clone(),
    };
    let session = VisitSession::open(&config)
        .with_context(|| format!("failed to load visits from {}", config.path.display()))?;
    tracing::debug!(records = session.records().len(), "session ready");

    match cli.command {
        Commands::ListTerritories => {
            let territories = session.territories();
            if cli.json {
                print_json(&territories)?;
            } else {
                for code in territories {
                    println!("{code}");
                }
            }
        }
        Commands::Territories { scope } => {
            let visits = session.filter(&scope.selection());
            let load = territory::sorted_by_load(territory::territory_load(&visits));

            if cli.json {
                print_json(&load)?;
            } else if load.is_empty() {
                println!("No visits found for this selection.");
            } else {
                println!("Territory load, visits per rep:");
                for row in &load {
                    println!(
                        "- {}: {} visits by {} reps ({} per rep)",
                        row.territory,
                        row.total_visits,
                        row.unique_reps,
                        fmt_ratio(row.visits_per_rep)
                    );
                }
            }
        }
        Commands::Coverage { scope } => {
            let visits = session.filter(&scope.selection());
            let coverage = territory::territory_coverage(&visits);

            if cli.json {
                print_json(&coverage)?;
            } else if coverage.is_empty() {
                println!("No visits found for this selection.");
            } else {
                println!("Pharmacy visit density by territory:");
                for row in &coverage {
                    println!("- {}: {} visits ({})", row.territory, row.visit_count, row.status);
                }
            }
        }
        Commands::Segments { scope, limit } => {
            let visits = session.filter(&scope.selection());
            let mut segments =
                segmentation::sorted_by_score(segmentation::account_segmentation(&visits));
            if let Some(limit) = limit {
                segments.truncate(limit);
            }

            if cli.json {
                print_json(&segments)?;
            } else if segments.is_empty() {
                println!("No pharmacy visits found for this selection.");
            } else {
                println!("Pharmacies by engagement score:");
                for segment in &segments {
                    println!(
                        "- {} score {:.1} [{}] {} visits, {} activity types, {} to {}",
                        segment.pharmacy,
                        segment.score,
                        segment
                            .tier
                            .map(|t| t.to_string())
                            .unwrap_or_else(|| "untiered".to_string()),
                        segment.total_visits,
                        segment.unique_activity_types,
                        segment.first_visit,
                        segment.last_visit
                    );
                }
            }
        }
        Commands::Engagement { scope, top } => {
            let visits = session.filter(&scope.selection());
            let most_engaged = segmentation::top_engaged(&visits, top);
            let priority = segmentation::priority_pharmacies(&visits);

            if cli.json {
                print_json(&serde_json::json!({
                    "top": most_engaged,
                    "priority": priority,
                }))?;
            } else if most_engaged.is_empty() {
                println!("No pharmacy visits found for this selection.");
            } else {
                println!("Top {} engaged pharmacies:", most_engaged.len());
                for row in &most_engaged {
                    println!("- {} ({}): {} visits", row.pharmacy, row.territory, row.visit_count);
                }
                println!("Priority pharmacies in high-density territories:");
                if priority.is_empty() {
                    println!("- none");
                }
                for row in &priority {
                    println!("- {} ({}): {} visits", row.pharmacy, row.territory, row.visit_count);
                }
            }
        }
        Commands::Forecast { scope } => {
            let visits = session.filter(&scope.selection());
            let forecast = forecast::sales_forecast(&visits);
            let likely = forecast::likely_to_order_count(&forecast);

            if cli.json {
                print_json(&serde_json::json!({
                    "likely_to_order": likely,
                    "pharmacies": forecast,
                }))?;
            } else if let Some(first) = forecast.first() {
                println!("Pharmacies likely to order in {}: {likely}", first.quarter);
                for row in &forecast {
                    println!(
                        "- {} rate {:.2}, historical {} -> {}",
                        row.pharmacy,
                        row.order_rate,
                        fmt_ratio(row.avg_order_rate),
                        row.predicted_order
                    );
                }
            } else {
                println!("No pharmacy visits found for this selection.");
            }
        }
        Commands::Reps { scope } => {
            let visits = session.filter(&scope.selection());
            let reps = productivity::rep_status(&visits);

            if cli.json {
                print_json(&reps)?;
            } else if reps.is_empty() {
                println!("No reps found for this selection.");
            } else {
                println!("Rep performance and efficiency:");
                for row in &reps {
                    println!(
                        "- {} {}: {} visits, {} pharmacies, {} territories, {} per pharmacy",
                        row.rep,
                        row.status,
                        row.total_visits,
                        row.unique_pharmacies,
                        row.unique_territories,
                        fmt_ratio(row.visits_per_pharmacy)
                    );
                }
            }
        }
        Commands::Trends { scope } => {
            let visits = session.filter(&scope.selection());
            let by_activity = trends::monthly_by_activity(&visits);
            let by_rep = trends::monthly_by_rep(&visits);
            let by_pharmacy = trends::monthly_by_pharmacy(&visits);

            if cli.json {
                print_json(&serde_json::json!({
                    "activity": by_activity,
                    "reps": by_rep,
                    "pharmacies": by_pharmacy,
                }))?;
            } else if visits.is_empty() {
                println!("No visits found for this selection.");
            } else {
                println!("Monthly visits by activity type:");
                for row in &by_activity {
                    println!("- {} {}: {}", row.month, row.activity_type, row.visits);
                }
                println!("Rep productivity:");
                for row in &by_rep {
                    println!(
                        "- {} {}: {} visits, {} with orders",
                        row.month, row.rep, row.visits, row.order_visits
                    );
                }
                println!("Pharmacy engagement trend:");
                for row in &by_pharmacy {
                    println!(
                        "- {} {}: {} visits, {} activity types",
                        row.month, row.pharmacy, row.visits, row.unique_activity_types
                    );
                }
            }
        }
        Commands::Deployment { scope, zones } => {
            let visits = session.filter(&scope.selection());
            let zones = deployment_zones(zones);
            let suggested = territory::deployment_zones(&visits, &zones);

            if cli.json {
                print_json(&suggested)?;
            } else {
                println!("Suggested zones for new reps: {}", zones.join(", "));
                if suggested.is_empty() {
                    println!("None of the suggested zones appear in this selection.");
                }
                for zone in &suggested {
                    println!("- {}: {} pharmacies", zone.territory, zone.pharmacy_count);
                }
            }
        }
        Commands::Report { scope, zones, out } => {
            let selection = scope.selection();
            let visits = session.filter(&selection);
            let zones = deployment_zones(zones);
            let report = report::build_report(&selection.label(), &visits, &zones);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
