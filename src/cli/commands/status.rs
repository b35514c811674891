//! `qms status` command - Sync status dashboard

use chrono::{DateTime, Utc};
use console::style;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::{load_config, open_workspace};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::entity::Entity;
use crate::core::remote::RemoteStore;
use crate::core::store::EntityStore;
use crate::entities::ReportStatus;

#[derive(clap::Args, Debug)]
pub struct StatusArgs {
    /// Include a breakdown of reports by status
    #[arg(long)]
    pub detailed: bool,
}

#[derive(Serialize)]
struct CollectionStatus {
    collection: &'static str,
    state: String,
    items: usize,
    cache_written: Option<DateTime<Utc>>,
    snapshot_at: Option<DateTime<Utc>>,
}

fn collect<E: Entity, R: RemoteStore>(store: &EntityStore<E, R>) -> CollectionStatus {
    CollectionStatus {
        collection: E::COLLECTION,
        state: store.state().to_string(),
        items: store.len(),
        cache_written: store.cache().last_updated(E::COLLECTION),
        snapshot_at: store.last_snapshot_at(),
    }
}

fn format_time(time: Option<DateTime<Utc>>) -> String {
    time.map(|t| {
        t.with_timezone(&chrono::Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
    })
    .unwrap_or_else(|| "-".to_string())
}

pub fn run(args: StatusArgs, global: &GlobalOpts) -> Result<()> {
    let config = load_config(global);
    let ws = open_workspace(global)?;

    let collections = [
        collect(&ws.reports),
        collect(&ws.products),
        collect(&ws.customers),
    ];

    let by_status: Vec<(ReportStatus, usize)> = [
        ReportStatus::New,
        ReportStatus::Processing,
        ReportStatus::AwaitingExchange,
        ReportStatus::Completed,
    ]
    .into_iter()
    .map(|s| (s, ws.reports.items().iter().filter(|r| r.status == s).count()))
    .collect();

    match global.format {
        OutputFormat::Json | OutputFormat::Yaml => {
            let status = serde_json::json!({
                "data_dir": config.data_dir(),
                "remote_dir": config.remote_dir,
                "online": ws.is_online(),
                "collections": collections,
                "reports_by_status": by_status
                    .iter()
                    .map(|(status, count)| serde_json::json!({"status": status, "count": count}))
                    .collect::<Vec<_>>(),
            });
            if global.format == OutputFormat::Json {
                println!("{}", serde_json::to_string_pretty(&status).into_diagnostic()?);
            } else {
                print!("{}", serde_yml::to_string(&status).into_diagnostic()?);
            }
        }
        _ => {
            println!("{}", style("QMS Sync Status").bold().underlined());
            println!(
                "{}: {}",
                style("Cache").dim(),
                config.data_dir().display()
            );
            match config.remote_dir {
                Some(ref dir) => println!("{}: {}", style("Remote").dim(), dir.display()),
                None => println!("{}: {}", style("Remote").dim(), style("none").yellow()),
            }
            println!();

            let mut table = Builder::default();
            table.push_record(["Collection", "State", "Items", "Cache written", "Last snapshot"]);
            for c in &collections {
                table.push_record([
                    c.collection.to_string(),
                    c.state.clone(),
                    c.items.to_string(),
                    format_time(c.cache_written),
                    format_time(c.snapshot_at),
                ]);
            }
            println!("{}", table.build().with(Style::markdown()));

            if args.detailed {
                println!();
                let mut breakdown = Builder::default();
                breakdown.push_record(["Report status", "Count"]);
                for (status, count) in &by_status {
                    breakdown.push_record([status.to_string(), count.to_string()]);
                }
                println!("{}", breakdown.build().with(Style::markdown()));
            }

            println!();
            let health = if ws.is_online() {
                style("online").green().bold()
            } else {
                style("offline").yellow().bold()
            };
            println!("Sync: {}", health);
        }
    }

    Ok(())
}
