//! `qms product` command - Product catalog management

use clap::Subcommand;
use console::style;
use miette::Result;

use crate::cli::commands::import::{read_products, ImportArgs};
use crate::cli::helpers::{
    list_format, matches_search, open_workspace, pad, print_structured, require_confirmation,
    truncate_str,
};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::entity::Entity;
use crate::entities::{Product, ProductPatch};

#[derive(Subcommand, Debug)]
pub enum ProductCommands {
    /// List products
    List(ListArgs),

    /// Add a product, or replace the one with the same code
    Add(AddArgs),

    /// Change some fields of a product
    Update(UpdateArgs),

    /// Delete a product
    Delete(DeleteArgs),

    /// Import products from a CSV file
    Import(ImportArgs),

    /// Delete every product
    Clear(ClearArgs),
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Search in code, names and brand
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
#[derive(clap::Args, Debug, Default)]
pub struct ProductFields {
    /// Trade name
    #[arg(long)]
    pub trade_name: Option<String>,

    /// Device name
    #[arg(long)]
    pub device_name: Option<String>,

    /// Product line
    #[arg(long)]
    pub product_line: Option<String>,

    /// Brand
    #[arg(long)]
    pub brand: Option<String>,

    /// Registration number
    #[arg(long)]
    pub registration: Option<String>,
}

impl ProductFields {
    fn patch(self) -> ProductPatch {
        ProductPatch {
            trade_name: self.trade_name,
            device_name: self.device_name,
            product_line: self.product_line,
            brand: self.brand,
            registration_number: self.registration,
        }
    }
}

#[derive(clap::Args, Debug)]
pub struct AddArgs {
    /// Product code
    pub code: String,

    #[command(flatten)]
    pub fields: ProductFields,
}

#[derive(clap::Args, Debug)]
pub struct UpdateArgs {
    /// Product code
    pub code: String,

    #[command(flatten)]
    pub fields: ProductFields,
}

#[derive(clap::Args, Debug)]
pub struct DeleteArgs {
    /// Product code
    pub code: String,
}

#[derive(clap::Args, Debug)]
pub struct ClearArgs {
    /// Confirm deleting every product
    #[arg(long)]
    pub yes: bool,
}

/// Run a product subcommand
pub fn run(cmd: ProductCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        ProductCommands::List(args) => run_list(args, global),
        ProductCommands::Add(args) => run_add(args, global),
        ProductCommands::Update(args) => run_update(args, global),
        ProductCommands::Delete(args) => run_delete(args, global),
        ProductCommands::Import(args) => run_import(args, global),
        ProductCommands::Clear(args) => run_clear(args, global),
    }
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let ws = open_workspace(global)?;

    let mut products: Vec<&Product> = ws
        .products
        .items()
        .iter()
        .filter(|p| {
            matches_search(
                args.search.as_deref(),
                &[&p.code, &p.trade_name, &p.device_name, &p.brand],
            )
        })
        .collect();
    products.sort_by(|a, b| a.code.cmp(&b.code));

    if let Some(limit) = args.limit {
        products.truncate(limit);
    }

    if args.count {
        println!("{}", products.len());
        return Ok(());
    }

    let format = list_format(global);
    if print_structured(&products, format)? {
        return Ok(());
    }

    if products.is_empty() {
        println!("No products found.");
        return Ok(());
    }

    match format {
        OutputFormat::Id => {
            for p in &products {
                println!("{}", p.code);
            }
        }
        _ => {
            println!(
                "{} {} {} {}",
                style(pad("CODE", 14)).bold(),
                style(pad("TRADE NAME", 30)).bold(),
                style(pad("BRAND", 16)).bold(),
                style("REGISTRATION").bold()
            );
            println!("{}", "-".repeat(80));
            for p in &products {
                println!(
                    "{} {} {} {}",
                    style(pad(&p.code, 14)).cyan(),
                    pad(&truncate_str(&p.trade_name, 28), 30),
                    pad(&truncate_str(&p.brand, 14), 16),
                    p.registration_number
                );
            }
            println!();
            println!("{} product(s) found.", style(products.len()).cyan());
        }
    }

    Ok(())
}

fn run_add(args: AddArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = open_workspace(global)?;
    let mut product = Product::new(args.code);
    product.apply_patch(&args.fields.patch());
    ws.products.create(product);
    Ok(())
}

fn run_update(args: UpdateArgs, global: &GlobalOpts) -> Result<()> {
    let patch = args.fields.patch();
    if patch == ProductPatch::default() {
        return Err(miette::miette!("Nothing to update"));
    }

    let mut ws = open_workspace(global)?;
    let actor = ws.actor().clone();
    if !ws.products.update(&args.code, patch, Some(&actor), None) {
        return Err(miette::miette!("No product found matching '{}'", args.code));
    }
    Ok(())
}

fn run_delete(args: DeleteArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = open_workspace(global)?;
    if !ws.products.delete(&args.code) {
        return Err(miette::miette!("No product found matching '{}'", args.code));
    }
    Ok(())
}

fn run_import(args: ImportArgs, global: &GlobalOpts) -> Result<()> {
    let (products, stats) = read_products(&args)?;
    if !global.quiet || args.dry_run {
        stats.print_summary("product(s)");
    }
    if args.dry_run {
        return Ok(());
    }

    let mut ws = open_workspace(global)?;
    if !ws.products.bulk_import(products) {
        println!("No products to import.");
    }
    Ok(())
}

fn run_clear(args: ClearArgs, global: &GlobalOpts) -> Result<()> {
    require_confirmation(args.yes, "product")?;
    let mut ws = open_workspace(global)?;
    ws.products.delete_all();
    Ok(())
}
