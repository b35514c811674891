//! `qms customer` command - Customer management

use clap::Subcommand;
use console::style;
use miette::Result;

use crate::cli::commands::import::{read_customers, ImportArgs};
use crate::cli::helpers::{
    list_format, matches_search, open_workspace, pad, print_structured, require_confirmation,
    truncate_str,
};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::entity::Entity;
use crate::entities::{Customer, CustomerPatch};

#[derive(Subcommand, Debug)]
pub enum CustomerCommands {
    /// List customers
    List(ListArgs),

    /// Add a customer, or replace the one with the same code
    Add(AddArgs),

    /// Change some fields of a customer
    Update(UpdateArgs),

    /// Change a customer's code
    Rename(RenameArgs),

    /// Delete a customer
    Delete(DeleteArgs),

    /// Import customers from a CSV file
    Import(ImportArgs),

    /// Delete every customer
    Clear(ClearArgs),
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Filter by region (substring match)
    #[arg(long, short = 'r')]
    pub region: Option<String>,

    /// Search in code, company name and contact
    #[arg(long)]
    pub search: Option<String>,

    /// Limit number of results
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,

    /// Show only count
    #[arg(long)]
    pub count: bool,
}

/// Descriptive fields shared by `add` and `update`
#[derive(clap::Args, Debug)]
pub struct CustomerFields {
    /// Company name
    #[arg(long)]
    pub company: Option<String>,

    /// Region
    #[arg(long)]
    pub region: Option<String>,

    /// Address
    #[arg(long)]
    pub address: Option<String>,

    /// Contact person and/or phone
    #[arg(long)]
    pub contact: Option<String>,
}

impl CustomerFields {
    fn patch(self) -> CustomerPatch {
        CustomerPatch {
            company_name: self.company,
            region: self.region,
            address: self.address,
            contact: self.contact,
        }
    }
}

#[derive(clap::Args, Debug)]
pub struct AddArgs {
    /// Customer code
    pub code: String,

    #[command(flatten)]
    pub fields: CustomerFields,
}

#[derive(clap::Args, Debug)]
pub struct UpdateArgs {
    /// Customer code
    pub code: String,

    #[command(flatten)]
    pub fields: CustomerFields,
}

#[derive(clap::Args, Debug)]
pub struct RenameArgs {
    /// Current customer code
    pub old: String,

    /// New customer code
    pub new: String,
}

#[derive(clap::Args, Debug)]
pub struct DeleteArgs {
    /// Customer code
    pub code: String,
}

#[derive(clap::Args, Debug)]
pub struct ClearArgs {
    /// Confirm deleting every customer
    #[arg(long)]
    pub yes: bool,
}

/// Run a customer subcommand
pub fn run(cmd: CustomerCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        CustomerCommands::List(args) => run_list(args, global),
        CustomerCommands::Add(args) => run_add(args, global),
        CustomerCommands::Update(args) => run_update(args, global),
        CustomerCommands::Rename(args) => run_rename(args, global),
        CustomerCommands::Delete(args) => run_delete(args, global),
        CustomerCommands::Import(args) => run_import(args, global),
        CustomerCommands::Clear(args) => run_clear(args, global),
    }
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let ws = open_workspace(global)?;

    let mut customers: Vec<&Customer> = ws
        .customers
        .items()
        .iter()
        .filter(|c| {
            args.region.as_ref().map_or(true, |region| {
                c.region.to_lowercase().contains(&region.to_lowercase())
            })
        })
        .filter(|c| {
            matches_search(
                args.search.as_deref(),
                &[&c.code, &c.company_name, &c.contact],
            )
        })
        .collect();
    customers.sort_by(|a, b| a.code.cmp(&b.code));

    if let Some(limit) = args.limit {
        customers.truncate(limit);
    }

    if args.count {
        println!("{}", customers.len());
        return Ok(());
    }

    let format = list_format(global);
    if print_structured(&customers, format)? {
        return Ok(());
    }

    if customers.is_empty() {
        println!("No customers found.");
        return Ok(());
    }

    match format {
        OutputFormat::Id => {
            for c in &customers {
                println!("{}", c.code);
            }
        }
        _ => {
            println!(
                "{} {} {} {}",
                style(pad("CODE", 12)).bold(),
                style(pad("COMPANY", 32)).bold(),
                style(pad("REGION", 14)).bold(),
                style("CONTACT").bold()
            );
            println!("{}", "-".repeat(80));
            for c in &customers {
                println!(
                    "{} {} {} {}",
                    style(pad(&c.code, 12)).cyan(),
                    pad(&truncate_str(&c.company_name, 30), 32),
                    pad(&truncate_str(&c.region, 12), 14),
                    c.contact
                );
            }
            println!();
            println!("{} customer(s) found.", style(customers.len()).cyan());
        }
    }

    Ok(())
}

fn run_add(args: AddArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = open_workspace(global)?;
    let mut customer = Customer::new(args.code);
    customer.apply_patch(&args.fields.patch());
    ws.customers.create(customer);
    Ok(())
}

fn run_update(args: UpdateArgs, global: &GlobalOpts) -> Result<()> {
    let patch = args.fields.patch();
    if patch == CustomerPatch::default() {
        return Err(miette::miette!("Nothing to update"));
    }

    let mut ws = open_workspace(global)?;
    let actor = ws.actor().clone();
    if !ws.customers.update(&args.code, patch, Some(&actor), None) {
        return Err(miette::miette!("No customer found matching '{}'", args.code));
    }
    Ok(())
}

fn run_rename(args: RenameArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = open_workspace(global)?;
    let renamed = ws
        .customers
        .get(&args.old)
        .map(|c| c.with_code(&args.new))
        .ok_or_else(|| miette::miette!("No customer found matching '{}'", args.old))?;

    ws.customers
        .rename(&args.old, renamed)
        .map_err(|e| miette::miette!("Cannot rename {}: {}", args.old, e))
}

fn run_delete(args: DeleteArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = open_workspace(global)?;
    if !ws.customers.delete(&args.code) {
        return Err(miette::miette!("No customer found matching '{}'", args.code));
    }
    Ok(())
}

fn run_import(args: ImportArgs, global: &GlobalOpts) -> Result<()> {
    let (customers, stats) = read_customers(&args)?;
    if !global.quiet || args.dry_run {
        stats.print_summary("customer(s)");
    }
    if args.dry_run {
        return Ok(());
    }

    let mut ws = open_workspace(global)?;
    if !ws.customers.bulk_import(customers) {
        println!("No customers to import.");
    }
    Ok(())
}

fn run_clear(args: ClearArgs, global: &GlobalOpts) -> Result<()> {
    require_confirmation(args.yes, "customer")?;
    let mut ws = open_workspace(global)?;
    ws.customers.delete_all();
    Ok(())
}
