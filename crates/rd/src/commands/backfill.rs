use chrono::{DateTime, Utc};
use clap::Args;
use owo_colors::{OwoColorize, Stream};
use rd_core::backfill::BackfillOptions;
use rd_core::Admin;
use rd_db::DbStore;
use std::io::Write;

use crate::error::Result;
use crate::output;

#[derive(Args, Debug, Clone, Default)]
pub struct BackfillArgs {
    /// Write the corrections (default is dry-run)
    #[arg(long)]
    pub apply: bool,
    /// Comma-separated stored addresses to restrict the scan to
    #[arg(long)]
    pub only_ips: Option<String>,
    /// Rows scanned, oldest first; 0 scans everything
    #[arg(long)]
    pub limit: Option<u32>,
    /// Skip the database copy taken before applying
    #[arg(long)]
    pub no_backup: bool,
}

impl BackfillArgs {
    fn options(&self) -> BackfillOptions {
        BackfillOptions {
            only_ips: self
                .only_ips
                .as_deref()
                .map(BackfillOptions::only_ips_from_list),
            limit: self.limit,
        }
    }
}

/// `<db>.bak.<YYYYmmdd-HHMMSS>`
pub fn backup_path(db_path: &str, now: DateTime<Utc>) -> String {
    format!("{db_path}.bak.{}", now.format("%Y%m%d-%H%M%S"))
}

pub fn run(
    admin: &Admin<DbStore>,
    db_path: &str,
    args: &BackfillArgs,
    out: &mut impl Write,
) -> Result<()> {
    let corrections = admin.backfill().plan(&args.options())?;
    output::write_corrections(out, &corrections)?;

    if !args.apply {
        writeln!(
            out,
            "{}",
            "Dry run only. Re-run with --apply to write changes."
                .if_supports_color(Stream::Stdout, |t| t.yellow())
        )?;
        return Ok(());
    }
    if corrections.is_empty() {
        writeln!(out, "Nothing to update.")?;
        return Ok(());
    }

    if !args.no_backup {
        let dest = backup_path(db_path, Utc::now());
        admin.store().backup_to(&dest)?;
        writeln!(out, "Backup created: {dest}")?;
    }

    let updated = admin.backfill().apply(&corrections)?;
    writeln!(
        out,
        "{}",
        format!("Updated {updated} rows.").if_supports_color(Stream::Stdout, |t| t.green())
    )?;
    Ok(())
}
