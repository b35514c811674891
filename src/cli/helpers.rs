//! Shared helper functions for CLI commands
//!
//! This module contains utility functions that are used across multiple
//! command modules to avoid code duplication.

use std::sync::Arc;

use console::style;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;

use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::notify::{NoticeKind, NotificationSink};
use crate::core::{Config, Workspace};

/// Notification sink that prints to stderr
///
/// Success notices are hidden with `--quiet`; offline and error notices
/// always show.
#[derive(Debug, Clone, Copy)]
pub struct ConsoleSink {
    quiet: bool,
}

impl ConsoleSink {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }
}

impl NotificationSink for ConsoleSink {
    fn notify(&self, message: &str, kind: NoticeKind) {
        match kind {
            NoticeKind::Success => {
                if !self.quiet {
                    eprintln!("{} {}", style("✓").green(), message);
                }
            }
            NoticeKind::Info => eprintln!("{} {}", style("⚠").yellow(), message),
            NoticeKind::Error => eprintln!("{} {}", style("✗").red(), message),
        }
    }
}

/// Load config, apply command-line overrides
pub fn load_config(global: &GlobalOpts) -> Config {
    let mut config = Config::load();
    config.merge(Config {
        data_dir: global.data_dir.clone(),
        remote_dir: global.remote.clone(),
        ..Default::default()
    });
    config
}

/// Open and connect the workspace for one command
pub fn open_workspace(global: &GlobalOpts) -> Result<Workspace> {
    let config = load_config(global);
    let mut workspace = Workspace::open(&config, Arc::new(ConsoleSink::new(global.quiet)))
        .map_err(|e| miette::miette!("Cannot open local cache: {}", e))?;
    workspace.connect();
    Ok(workspace)
}

/// Resolve `Auto` to the format a list command should use
pub fn list_format(global: &GlobalOpts) -> OutputFormat {
    match global.format {
        OutputFormat::Auto => OutputFormat::Tsv,
        f => f,
    }
}

/// Print records as JSON or YAML; false if the format is neither
pub fn print_structured<T: Serialize + ?Sized>(items: &T, format: OutputFormat) -> Result<bool> {
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(items).into_diagnostic()?;
            println!("{}", json);
            Ok(true)
        }
        OutputFormat::Yaml => {
            let yaml = serde_yml::to_string(items).into_diagnostic()?;
            print!("{}", yaml);
            Ok(true)
        }
        _ => Ok(false),
    }
}

/// Truncate a string to max_len characters, adding "..." if truncated
///
/// Counts characters, not bytes, so Vietnamese text never splits a code point.
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Pad to a display width measured in characters
pub fn pad(s: &str, width: usize) -> String {
    let len = s.chars().count();
    if len >= width {
        s.to_string()
    } else {
        format!("{}{}", s, " ".repeat(width - len))
    }
}

/// Case-insensitive substring match over several fields
pub fn matches_search(search: Option<&str>, fields: &[&str]) -> bool {
    match search {
        None => true,
        Some(needle) => {
            let needle = needle.to_lowercase();
            fields.iter().any(|f| f.to_lowercase().contains(&needle))
        }
    }
}

/// Fail unless a destructive command was confirmed
pub fn require_confirmation(yes: bool, what: &str) -> Result<()> {
    if yes {
        Ok(())
    } else {
        Err(miette::miette!(
            help = "re-run with --yes to confirm",
            "Refusing to delete every {} without confirmation",
            what
        ))
    }
}
