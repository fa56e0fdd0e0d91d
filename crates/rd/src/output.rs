//! Rendering of command results. Every writer takes `impl Write` so the
//! formats can be checked without a terminal.

use owo_colors::{OwoColorize, Stream};
use rd_core::backfill::IpCorrection;
use rd_core::types::{Event, EventSummary, StatsRow, format_timestamp};
use rd_core::{ShowItem, Shown};
use serde::Serialize;
use std::io::Write;

use crate::error::Result;

/// Proposals printed before the dry-run/apply footer.
pub const PREVIEW_ROWS: usize = 25;

const CSV_HEADER: [&str; 8] = [
    "id", "ts", "method", "path", "query", "headers", "body", "client_ip",
];

/// `(id, ts, method, path, query, client_ip)` on one line.
pub fn event_line(event: &Event) -> String {
    format!(
        "{:?}",
        (
            event.id,
            format_timestamp(&event.timestamp),
            &event.method,
            &event.path,
            &event.query,
            &event.client_ip,
        )
    )
}

pub fn write_lines(out: &mut impl Write, events: &[Event]) -> Result<()> {
    for event in events {
        writeln!(out, "{}", event_line(event))?;
    }
    Ok(())
}

pub fn write_summaries(out: &mut impl Write, events: &[Event]) -> Result<()> {
    let summaries: Vec<EventSummary> = events.iter().map(EventSummary::from).collect();
    write_json(out, &summaries)
}

pub fn write_shown(out: &mut impl Write, shown: &Shown) -> Result<()> {
    match shown {
        Shown::Latest(event) => write_json(out, event),
        Shown::Items(items) => write_json::<[ShowItem]>(out, items),
    }
}

pub fn write_deleted(out: &mut impl Write, deleted: &[Event]) -> Result<()> {
    #[derive(Serialize)]
    struct Deleted<'a> {
        deleted: &'a [Event],
    }
    write_json(out, &Deleted { deleted })
}

pub fn write_json<T: Serialize + ?Sized>(out: &mut impl Write, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

/// Full rows with the header blob exactly as stored. Returns the row count.
pub fn write_csv(out: impl Write, events: &[Event]) -> Result<usize> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(CSV_HEADER)?;
    for event in events {
        let id = event.id.to_string();
        let ts = format_timestamp(&event.timestamp);
        writer.write_record([
            id.as_str(),
            ts.as_str(),
            event.method.as_str(),
            event.path.as_str(),
            event.query.as_str(),
            event.headers.as_str(),
            event.body.as_str(),
            event.client_ip.as_str(),
        ])?;
    }
    writer.flush()?;
    Ok(events.len())
}

pub fn write_stats(out: &mut impl Write, rows: &[StatsRow]) -> Result<()> {
    for row in rows {
        writeln!(out, "{:6}  {}", row.count, row.key)?;
    }
    Ok(())
}

pub fn write_corrections(out: &mut impl Write, corrections: &[IpCorrection]) -> Result<()> {
    writeln!(
        out,
        "{} {}",
        "Candidates:".if_supports_color(Stream::Stdout, |t| t.bold()),
        corrections.len()
    )?;
    for correction in corrections.iter().take(PREVIEW_ROWS) {
        writeln!(
            out,
            "  ID {:>5}: {:>15} -> {:<15}  ({})",
            correction.id,
            correction.old_ip,
            correction
                .new_ip
                .if_supports_color(Stream::Stdout, |t| t.green()),
            correction.reason,
        )?;
    }
    if corrections.len() > PREVIEW_ROWS {
        writeln!(out, "  ... and {} more", corrections.len() - PREVIEW_ROWS)?;
    }
    Ok(())
}
