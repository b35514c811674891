//! `qms report` command - Defect report management

use chrono::{Datelike, NaiveDate};
use clap::{Subcommand, ValueEnum};
use console::style;
use miette::Result;

use crate::cli::helpers::{
    list_format, matches_search, open_workspace, pad, print_structured, require_confirmation,
    truncate_str,
};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::actor::ActivityKind;
use crate::entities::{Report, ReportPatch, ReportStatus};

#[derive(Subcommand, Debug)]
pub enum ReportCommands {
    /// List reports with filtering
    List(ListArgs),

    /// Create a new report
    New(NewArgs),

    /// Show a report and its activity log
    Show(ShowArgs),

    /// Update handling fields of a report
    Update(UpdateArgs),

    /// Add a comment to a report's activity log
    Comment(CommentArgs),

    /// Delete a report
    Delete(DeleteArgs),

    /// Delete every report
    Clear(ClearArgs),
}

/// Status filter
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StatusFilter {
    New,
    Processing,
    AwaitingExchange,
    Completed,
    /// Anything not completed
    Open,
    /// All statuses
    All,
}

impl StatusFilter {
    fn accepts(self, status: ReportStatus) -> bool {
        match self {
            StatusFilter::New => status == ReportStatus::New,
            StatusFilter::Processing => status == ReportStatus::Processing,
            StatusFilter::AwaitingExchange => status == ReportStatus::AwaitingExchange,
            StatusFilter::Completed => status == ReportStatus::Completed,
            StatusFilter::Open => status != ReportStatus::Completed,
            StatusFilter::All => true,
        }
    }
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Filter by status
    #[arg(long, short = 's', default_value = "all")]
    pub status: StatusFilter,

    /// Only reports dated in this year
    #[arg(long, short = 'y')]
    pub year: Option<i32>,

    /// Filter by customer code
    #[arg(long, short = 'c')]
    pub customer: Option<String>,

    /// Search in customer, product and description
    #[arg(long)]
    pub search: Option<String>,

    /// Limit number of results
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,

    /// Show only count
    #[arg(long)]
    pub count: bool,
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Business date of the report (default: today)
    #[arg(long, short = 'd')]
    pub date: Option<NaiveDate>,

    /// Explicit report id (default: next free `<year>-NNN`)
    #[arg(long)]
    pub id: Option<String>,

    /// Customer code
    #[arg(long, short = 'c')]
    pub customer: Option<String>,

    /// Customer name (default: looked up from the customer code)
    #[arg(long)]
    pub customer_name: Option<String>,

    /// Product code
    #[arg(long, short = 'p')]
    pub product: Option<String>,

    /// Product name (default: looked up from the product code)
    #[arg(long)]
    pub product_name: Option<String>,

    /// Lot number
    #[arg(long)]
    pub lot: Option<String>,

    /// Quantity reported defective
    #[arg(long, default_value_t = 0)]
    pub quantity: u32,

    /// What the customer reported
    #[arg(long)]
    pub description: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Report id (e.g. 2024-001)
    pub id: String,
}

#[derive(clap::Args, Debug)]
pub struct UpdateArgs {
    /// Report id
    pub id: String,

    /// New status
    #[arg(long, short = 's')]
    pub status: Option<ReportStatus>,

    /// Root cause analysis
    #[arg(long)]
    pub cause: Option<String>,

    /// Remediation taken
    #[arg(long)]
    pub remediation: Option<String>,

    /// Quantity exchanged
    #[arg(long)]
    pub exchanged: Option<u32>,

    /// Completion date
    #[arg(long)]
    pub completed: Option<NaiveDate>,

    /// Corrected defective quantity
    #[arg(long)]
    pub quantity: Option<u32>,

    /// Corrected description
    #[arg(long)]
    pub description: Option<String>,

    /// Activity log text (default: derived from the change)
    #[arg(long, short = 'm')]
    pub message: Option<String>,
}

impl UpdateArgs {
    fn patch(&self) -> ReportPatch {
        ReportPatch {
            status: self.status,
            description: self.description.clone(),
            quantity: self.quantity,
            cause_analysis: self.cause.clone(),
            remediation: self.remediation.clone(),
            exchanged_quantity: self.exchanged,
            completion_date: self.completed,
        }
    }
}

#[derive(clap::Args, Debug)]
pub struct CommentArgs {
    /// Report id
    pub id: String,

    /// Comment text
    pub text: String,
}

#[derive(clap::Args, Debug)]
pub struct DeleteArgs {
    /// Report id
    pub id: String,
}

#[derive(clap::Args, Debug)]
pub struct ClearArgs {
    /// Confirm deleting every report
    #[arg(long)]
    pub yes: bool,
}

/// Run a report subcommand
pub fn run(cmd: ReportCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        ReportCommands::List(args) => run_list(args, global),
        ReportCommands::New(args) => run_new(args, global),
        ReportCommands::Show(args) => run_show(args, global),
        ReportCommands::Update(args) => run_update(args, global),
        ReportCommands::Comment(args) => run_comment(args, global),
        ReportCommands::Delete(args) => run_delete(args, global),
        ReportCommands::Clear(args) => run_clear(args, global),
    }
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let ws = open_workspace(global)?;

    let mut reports: Vec<&Report> = ws
        .reports
        .items()
        .iter()
        .filter(|r| args.status.accepts(r.status))
        .filter(|r| args.year.map_or(true, |y| r.date.year() == y))
        .filter(|r| {
            args.customer
                .as_ref()
                .map_or(true, |c| r.customer_code.eq_ignore_ascii_case(c))
        })
        .filter(|r| {
            matches_search(
                args.search.as_deref(),
                &[
                    &r.customer_code,
                    &r.customer_name,
                    &r.product_code,
                    &r.product_name,
                    &r.description,
                ],
            )
        })
        .collect();

    // Newest first
    reports.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| b.id.cmp(&a.id)));

    if let Some(limit) = args.limit {
        reports.truncate(limit);
    }

    if args.count {
        println!("{}", reports.len());
        return Ok(());
    }

    let format = list_format(global);
    if print_structured(&reports, format)? {
        return Ok(());
    }

    if reports.is_empty() {
        println!("No reports found.");
        return Ok(());
    }

    match format {
        OutputFormat::Id => {
            for r in &reports {
                println!("{}", r.id);
            }
        }
        _ => {
            println!(
                "{} {} {} {} {} {}",
                style(pad("ID", 10)).bold(),
                style(pad("DATE", 11)).bold(),
                style(pad("CUSTOMER", 22)).bold(),
                style(pad("PRODUCT", 22)).bold(),
                style(pad("QTY", 5)).bold(),
                style("STATUS").bold()
            );
            println!("{}", "-".repeat(90));

            for r in &reports {
                let customer = if r.customer_name.is_empty() {
                    &r.customer_code
                } else {
                    &r.customer_name
                };
                let product = if r.product_name.is_empty() {
                    &r.product_code
                } else {
                    &r.product_name
                };
                println!(
                    "{} {} {} {} {} {}",
                    style(pad(&r.id, 10)).cyan(),
                    pad(&r.date.format("%Y-%m-%d").to_string(), 11),
                    pad(&truncate_str(customer, 20), 22),
                    pad(&truncate_str(product, 20), 22),
                    pad(&r.quantity.to_string(), 5),
                    r.status
                );
            }

            println!();
            println!("{} report(s) found.", style(reports.len()).cyan());
        }
    }

    Ok(())
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = open_workspace(global)?;
    let actor = ws.actor().clone();

    let date = args
        .date
        .unwrap_or_else(|| chrono::Local::now().date_naive());
    let mut report = Report::new(date);

    if let Some(id) = args.id {
        if ws.reports.get(&id).is_some() {
            return Err(miette::miette!("Report {} already exists", id));
        }
        report.id = id;
    }

    if let Some(code) = args.customer {
        report.customer_name = args.customer_name.unwrap_or_else(|| {
            ws.customers
                .get(&code)
                .map(|c| c.company_name.clone())
                .unwrap_or_default()
        });
        report.customer_code = code;
    } else if let Some(name) = args.customer_name {
        report.customer_name = name;
    }

    if let Some(code) = args.product {
        report.product_name = args.product_name.unwrap_or_else(|| {
            ws.products
                .get(&code)
                .map(|p| p.trade_name.clone())
                .unwrap_or_default()
        });
        report.product_code = code;
    } else if let Some(name) = args.product_name {
        report.product_name = name;
    }

    report.lot_number = args.lot;
    report.quantity = args.quantity;
    report.description = args.description.unwrap_or_default();

    let id = ws.reports.create_report(report, Some(&actor));

    match global.format {
        OutputFormat::Id => println!("{}", id),
        _ => println!(
            "{} Created report {}",
            style("✓").green(),
            style(&id).cyan()
        ),
    }

    Ok(())
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let ws = open_workspace(global)?;
    let report = ws
        .reports
        .get(&args.id)
        .ok_or_else(|| miette::miette!("No report found matching '{}'", args.id))?;

    if print_structured(report, global.format)? {
        return Ok(());
    }
    if global.format == OutputFormat::Id {
        println!("{}", report.id);
        return Ok(());
    }

    println!("{}", style("─".repeat(60)).dim());
    println!("{}: {}", style("ID").bold(), style(&report.id).cyan());
    println!("{}: {}", style("Date").bold(), report.date);
    println!("{}: {}", style("Status").bold(), style(report.status).yellow());
    println!("{}", style("─".repeat(60)).dim());

    println!(
        "{}: {} {}",
        style("Customer").bold(),
        report.customer_code,
        style(&report.customer_name).dim()
    );
    println!(
        "{}: {} {}",
        style("Product").bold(),
        report.product_code,
        style(&report.product_name).dim()
    );
    if let Some(ref lot) = report.lot_number {
        println!("{}: {}", style("Lot").bold(), lot);
    }
    println!("{}: {}", style("Quantity").bold(), report.quantity);

    if !report.description.is_empty() {
        println!();
        println!("{}", style("Description:").bold());
        println!("{}", report.description);
    }
    if let Some(ref cause) = report.cause_analysis {
        println!();
        println!("{}", style("Cause analysis:").bold());
        println!("{}", cause);
    }
    if let Some(ref remediation) = report.remediation {
        println!();
        println!("{}", style("Remediation:").bold());
        println!("{}", remediation);
    }
    if let Some(exchanged) = report.exchanged_quantity {
        println!("{}: {}", style("Exchanged").bold(), exchanged);
    }
    if let Some(done) = report.completion_date {
        println!("{}: {}", style("Completed").bold(), done);
    }

    if !report.activity_log.is_empty() {
        println!();
        println!(
            "{} ({}):",
            style("Activity").bold(),
            report.activity_log.len()
        );
        for entry in &report.activity_log {
            let marker = match entry.kind {
                ActivityKind::Log => style("•").dim(),
                ActivityKind::Comment => style("»").cyan(),
            };
            println!(
                "  {} {} {} ({}): {}",
                marker,
                style(entry.timestamp.format("%Y-%m-%d %H:%M")).dim(),
                entry.author,
                entry.role,
                entry.text
            );
        }
    }

    println!("{}", style("─".repeat(60)).dim());
    println!(
        "{}: {} | {}: {}",
        style("Author").dim(),
        report.created_by.as_deref().unwrap_or("-"),
        style("Created").dim(),
        report.created_at.format("%Y-%m-%d %H:%M")
    );

    Ok(())
}

fn run_update(args: UpdateArgs, global: &GlobalOpts) -> Result<()> {
    let patch = args.patch();
    if patch == ReportPatch::default() && args.message.is_none() {
        return Err(miette::miette!(
            help = "pass at least one of --status, --cause, --remediation, --exchanged, --completed, --quantity, --description, --message",
            "Nothing to update"
        ));
    }

    let mut ws = open_workspace(global)?;
    let actor = ws.actor().clone();
    if !ws
        .reports
        .update(&args.id, patch, Some(&actor), args.message.as_deref())
    {
        return Err(miette::miette!("No report found matching '{}'", args.id));
    }
    Ok(())
}

fn run_comment(args: CommentArgs, global: &GlobalOpts) -> Result<()> {
    if args.text.trim().is_empty() {
        return Err(miette::miette!("Comment text is empty"));
    }

    let mut ws = open_workspace(global)?;
    let actor = ws.actor().clone();
    if !ws.reports.add_comment(&args.id, args.text.trim(), &actor) {
        return Err(miette::miette!("No report found matching '{}'", args.id));
    }
    Ok(())
}

fn run_delete(args: DeleteArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = open_workspace(global)?;
    if !ws.reports.delete(&args.id) {
        return Err(miette::miette!("No report found matching '{}'", args.id));
    }
    Ok(())
}

fn run_clear(args: ClearArgs, global: &GlobalOpts) -> Result<()> {
    require_confirmation(args.yes, "report")?;
    let mut ws = open_workspace(global)?;
    ws.reports.delete_all();
    Ok(())
}
