//! Common utilities for CSV import
//!
//! Headers are matched case-insensitively. Each column accepts a few
//! spellings so spreadsheets exported by hand usually load as-is.

use console::style;
use csv::{ReaderBuilder, StringRecord};
use miette::{IntoDiagnostic, Result};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use crate::entities::{Customer, Product};

/// Options shared by every `import` subcommand
#[derive(clap::Args, Debug)]
pub struct ImportArgs {
    /// CSV file to import
    pub file: PathBuf,

    /// Parse the file and report what would be imported
    #[arg(long)]
    pub dry_run: bool,

    /// Continue importing after errors (default: stop on first error)
    #[arg(long)]
    pub skip_errors: bool,
}

/// Import statistics
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ImportStats {
    pub rows_processed: usize,
    pub imported: usize,
    pub errors: usize,
}

impl ImportStats {
    pub fn print_summary(&self, label: &str) {
        eprintln!(
            "{} rows, {} {} ready, {} error(s)",
            style(self.rows_processed).cyan(),
            style(self.imported).green(),
            label,
            style(self.errors).red()
        );
    }
}

/// Build a map from header name to column index
pub fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.to_lowercase().trim().replace(|c: char| c == ' ' || c == '-', "_"), i))
        .collect()
}

/// Get a field value from a CSV record, trying each alias in turn
pub fn get_field(
    record: &StringRecord,
    header_map: &HashMap<String, usize>,
    aliases: &[&str],
) -> Option<String> {
    aliases
        .iter()
        .filter_map(|name| header_map.get(*name))
        .filter_map(|&idx| record.get(idx))
        .map(|s| s.trim().to_string())
        .find(|s| !s.is_empty())
}

/// Read every row of a CSV source into records via `build`
///
/// `build` returns `None` when the row lacks its key; such rows count as
/// errors. With `skip_errors` false the first error aborts the import.
fn read_rows<R: Read, T>(
    reader: R,
    skip_errors: bool,
    build: impl Fn(&StringRecord, &HashMap<String, usize>) -> Option<T>,
) -> Result<(Vec<T>, ImportStats)> {
    let mut stats = ImportStats::default();
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers().into_diagnostic()?.clone();
    let header_map = build_header_map(&headers);
    let mut items = Vec::new();

    for (row_idx, result) in rdr.records().enumerate() {
        let row_num = row_idx + 2;
        stats.rows_processed += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                eprintln!(
                    "{} Row {}: CSV parse error: {}",
                    style("✗").red(),
                    row_num,
                    e
                );
                stats.errors += 1;
                if !skip_errors {
                    return Err(miette::miette!("CSV parse error at row {}: {}", row_num, e));
                }
                continue;
            }
        };

        match build(&record, &header_map) {
            Some(item) => {
                items.push(item);
                stats.imported += 1;
            }
            None => {
                eprintln!(
                    "{} Row {}: Missing required field 'code'",
                    style("✗").red(),
                    row_num
                );
                stats.errors += 1;
                if !skip_errors {
                    return Err(miette::miette!("Missing required field at row {}", row_num));
                }
            }
        }
    }

    Ok((items, stats))
}

fn open(path: &Path) -> Result<BufReader<File>> {
    let file = File::open(path)
        .map_err(|e| miette::miette!("Cannot open {}: {}", path.display(), e))?;
    Ok(BufReader::new(file))
}

fn product_row(record: &StringRecord, map: &HashMap<String, usize>) -> Option<Product> {
    let field = |aliases: &[&str]| get_field(record, map, aliases).unwrap_or_default();
    let code = get_field(record, map, &["code", "product_code", "ma", "mã"])?;
    Some(Product {
        trade_name: field(&["trade_name", "name", "ten_thuong_mai"]),
        device_name: field(&["device_name", "ten_thiet_bi"]),
        product_line: field(&["product_line", "line", "dong_san_pham"]),
        brand: field(&["brand", "nhan_hieu"]),
        registration_number: field(&["registration_number", "registration", "so_dang_ky"]),
        ..Product::new(code)
    })
}

fn customer_row(record: &StringRecord, map: &HashMap<String, usize>) -> Option<Customer> {
    let field = |aliases: &[&str]| get_field(record, map, aliases).unwrap_or_default();
    let code = get_field(record, map, &["code", "customer_code", "ma", "mã"])?;
    Some(Customer {
        company_name: field(&["company_name", "company", "name", "ten_cong_ty"]),
        region: field(&["region", "khu_vuc"]),
        address: field(&["address", "dia_chi"]),
        contact: field(&["contact", "phone", "lien_he"]),
        ..Customer::new(code)
    })
}

pub fn read_products(args: &ImportArgs) -> Result<(Vec<Product>, ImportStats)> {
    read_rows(open(&args.file)?, args.skip_errors, product_row)
}

pub fn read_customers(args: &ImportArgs) -> Result<(Vec<Customer>, ImportStats)> {
    read_rows(open(&args.file)?, args.skip_errors, customer_row)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRODUCTS: &str = "Code,Trade Name,Brand\nSP-01,Kim tiêm,Acme\nSP-02,Bơm tiêm,\n";

    #[test]
    fn test_header_map_normalizes() {
        let headers = StringRecord::from(vec!["Code", " Trade Name ", "device-name"]);
        let map = build_header_map(&headers);
        assert_eq!(map.get("code"), Some(&0));
        assert_eq!(map.get("trade_name"), Some(&1));
        assert_eq!(map.get("device_name"), Some(&2));
    }

    #[test]
    fn test_get_field_tries_aliases() {
        let headers = StringRecord::from(vec!["name", "company"]);
        let map = build_header_map(&headers);
        let record = StringRecord::from(vec!["", "Acme"]);
        assert_eq!(
            get_field(&record, &map, &["name", "company"]).as_deref(),
            Some("Acme")
        );
        assert!(get_field(&record, &map, &["missing"]).is_none());
    }

    #[test]
    fn test_read_products() {
        let (items, stats) = read_rows(PRODUCTS.as_bytes(), false, product_row).unwrap();
        assert_eq!(stats.rows_processed, 2);
        assert_eq!(stats.imported, 2);
        assert_eq!(items[0].trade_name, "Kim tiêm");
        assert_eq!(items[0].brand, "Acme");
        assert_eq!(items[1].brand, "");
    }

    #[test]
    fn test_missing_code_stops_or_skips() {
        let csv = "code,company\n,No code\nKH-01,Acme\n";
        assert!(read_rows(csv.as_bytes(), false, customer_row).is_err());

        let (items, stats) = read_rows(csv.as_bytes(), true, customer_row).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].company_name, "Acme");
        assert_eq!(stats.errors, 1);
    }

    #[test]
    fn test_duplicate_codes_are_kept_for_store() {
        let csv = "code,name\nA,x\nA,y\n";
        let (items, _) = read_rows(csv.as_bytes(), false, product_row).unwrap();
        assert_eq!(items.len(), 2);
    }
}
